//! Token type registry
//!
//! An arena of token types indexed by dense id, plus the creator index.

use super::kind::{NewTokenType, TokenPolicy, TokenType};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Identity, TokenTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRegistry {
    types: Vec<TokenType>,
    creator_index: BTreeMap<Identity, Vec<TokenTypeId>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next registered type will receive
    pub fn next_id(&self) -> TokenTypeId {
        TokenTypeId::from_slot(self.types.len())
    }

    /// Check the creation-time fields of a draft
    pub fn validate(draft: &NewTokenType, config: &LedgerConfig) -> LedgerResult<()> {
        let narrative = draft.narrative.trim();
        if narrative.is_empty() || draft.narrative.len() > config.max_narrative_len {
            return Err(LedgerError::InvalidNarrative {
                max_len: config.max_narrative_len,
            });
        }
        if draft.visual_symbol.len() > config.max_symbol_len {
            return Err(LedgerError::InvalidSymbol {
                max_len: config.max_symbol_len,
            });
        }
        if draft.supply_ceiling == 0 {
            return Err(LedgerError::InvalidSupplyCeiling);
        }
        Ok(())
    }

    pub fn get(&self, id: TokenTypeId) -> Option<&TokenType> {
        id.slot().and_then(|slot| self.types.get(slot))
    }

    pub(crate) fn get_mut(&mut self, id: TokenTypeId) -> Option<&mut TokenType> {
        id.slot().and_then(move |slot| self.types.get_mut(slot))
    }

    /// Look up a type for a mutating call
    pub fn require(&self, id: TokenTypeId) -> LedgerResult<&TokenType> {
        self.get(id).ok_or(LedgerError::UnknownTokenType(id))
    }

    /// Append a fully built type. Its id must be `next_id()`.
    pub(crate) fn insert(&mut self, token: TokenType) {
        debug_assert_eq!(token.id(), self.next_id());
        self.creator_index
            .entry(token.creator().clone())
            .or_default()
            .push(token.id());
        self.types.push(token);
    }

    /// Look up a type whose policy `caller` wants to change; only the creator may
    pub(crate) fn check_policy_update(
        &self,
        id: TokenTypeId,
        caller: &Identity,
    ) -> LedgerResult<&TokenType> {
        let token = self.require(id)?;
        if token.creator() != caller {
            return Err(LedgerError::Unauthorized(format!(
                "only the creator of {} may change its policy",
                id
            )));
        }
        Ok(token)
    }

    pub(crate) fn set_policy(&mut self, id: TokenTypeId, policy: TokenPolicy) {
        if let Some(token) = self.get_mut(id) {
            token.set_policy(policy);
        }
    }

    /// Types created by an identity, in creation order
    pub fn created_by(&self, creator: &Identity) -> &[TokenTypeId] {
        self.creator_index
            .get(creator)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn register(reg: &mut TokenRegistry, creator: &str, narrative: &str) -> TokenTypeId {
        let id = reg.next_id();
        let draft = NewTokenType::new(narrative, 10);
        reg.insert(TokenType::new(id, Identity::new(creator), &draft, Utc::now()));
        id
    }

    #[test]
    fn test_ids_are_dense_and_monotonic() {
        let mut reg = TokenRegistry::new();
        let a = register(&mut reg, "alice", "first");
        let b = register(&mut reg, "bob", "second");
        let c = register(&mut reg, "alice", "third");
        assert_eq!(a, TokenTypeId::new(1));
        assert_eq!(b, TokenTypeId::new(2));
        assert_eq!(c, TokenTypeId::new(3));
        assert_eq!(reg.get(b).unwrap().narrative(), "second");
        assert!(reg.get(TokenTypeId::new(0)).is_none());
        assert!(reg.get(TokenTypeId::new(4)).is_none());
    }

    #[test]
    fn test_creator_index() {
        let mut reg = TokenRegistry::new();
        let a = register(&mut reg, "alice", "first");
        register(&mut reg, "bob", "second");
        let c = register(&mut reg, "alice", "third");
        assert_eq!(reg.created_by(&Identity::new("alice")), &[a, c]);
        assert!(reg.created_by(&Identity::new("carol")).is_empty());
    }

    #[test]
    fn test_validate_draft() {
        let config = LedgerConfig::default();
        assert!(TokenRegistry::validate(&NewTokenType::new("thanks", 1), &config).is_ok());
        assert_eq!(
            TokenRegistry::validate(&NewTokenType::new("   ", 1), &config),
            Err(LedgerError::InvalidNarrative { max_len: 4096 })
        );
        assert_eq!(
            TokenRegistry::validate(&NewTokenType::new("thanks", 0), &config),
            Err(LedgerError::InvalidSupplyCeiling)
        );
        let long_symbol = NewTokenType::new("thanks", 1).with_symbol("x".repeat(65));
        assert!(matches!(
            TokenRegistry::validate(&long_symbol, &config),
            Err(LedgerError::InvalidSymbol { .. })
        ));
    }

    #[test]
    fn test_policy_update_requires_creator() {
        let mut reg = TokenRegistry::new();
        let id = register(&mut reg, "alice", "first");
        assert!(reg.check_policy_update(id, &Identity::new("alice")).is_ok());
        assert!(matches!(
            reg.check_policy_update(id, &Identity::new("bob")),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(
            reg.check_policy_update(TokenTypeId::new(9), &Identity::new("alice")).unwrap_err(),
            LedgerError::UnknownTokenType(TokenTypeId::new(9))
        );

        reg.set_policy(id, TokenPolicy::sealed());
        assert_eq!(reg.get(id).unwrap().policy(), TokenPolicy::sealed());
    }
}
