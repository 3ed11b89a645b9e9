//! Transfer gate: default-deny relinquishment
//!
//! Acknowledgments are not assets: handing one's own units to someone else
//! is refused unless the creator opted the type in. When it is allowed the
//! move is conservative and circulating supply does not change.

use crate::error::{LedgerError, LedgerResult};
use crate::holdings::Holdings;
use crate::identity::{Identity, TokenTypeId};
use crate::propagation::{Generation, PropagationEngine};
use crate::token::TokenType;

/// A validated relinquishment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinquishPlan {
    pub token_type: TokenTypeId,
    pub from: Identity,
    pub to: Identity,
    pub amount: u64,
    /// Generation offered to the recipient
    pub to_generation: Generation,
}

/// Check a relinquish call.
///
/// # Enforcement
///
/// - **Policy**: the type must allow relinquishment, checked before anything else
/// - **Authority**: only `from` may give away its own units
/// - **Amount**: must be non-zero and covered by `from`'s balance
pub fn check_relinquish(
    token: &TokenType,
    holdings: &Holdings,
    engine: &PropagationEngine,
    from: &Identity,
    to: &Identity,
    amount: u64,
    caller: &Identity,
) -> LedgerResult<RelinquishPlan> {
    if !token.policy().allow_relinquish {
        return Err(LedgerError::RelinquishDisabled(token.id()));
    }
    if caller != from {
        return Err(LedgerError::Unauthorized(format!(
            "{} may not relinquish units held by {}",
            caller, from
        )));
    }
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }

    let have = holdings.holding_of(token.id(), from);
    if have < amount {
        return Err(LedgerError::InsufficientBalance { have, need: amount });
    }

    let to_generation = engine
        .handoff_generation(token.id(), from)
        .ok_or(LedgerError::Overflow)?;

    Ok(RelinquishPlan {
        token_type: token.id(),
        from: from.clone(),
        to: to.clone(),
        amount,
        to_generation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{NewTokenType, TokenPolicy};
    use chrono::Utc;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    fn setup(policy: TokenPolicy) -> (TokenType, Holdings, PropagationEngine) {
        let draft = NewTokenType::new("kept the lights on", 10).with_policy(policy);
        let mut token = TokenType::new(TokenTypeId::FIRST, id("alice"), &draft, Utc::now());
        let mut holdings = Holdings::new();
        let mut engine = PropagationEngine::new();
        token.add_circulating(1);
        holdings.issue(token.id(), &id("alice"), 1);
        engine.seed_origin(token.id(), &id("alice"));
        (token, holdings, engine)
    }

    #[test]
    fn test_default_deny() {
        let (token, holdings, engine) = setup(TokenPolicy::propagating());
        let result = check_relinquish(&token, &holdings, &engine, &id("alice"), &id("bob"), 1, &id("alice"));
        assert_eq!(result, Err(LedgerError::RelinquishDisabled(token.id())));

        // denied even when every other check would also fail
        let result = check_relinquish(&token, &holdings, &engine, &id("bob"), &id("carol"), 0, &id("mallory"));
        assert_eq!(result, Err(LedgerError::RelinquishDisabled(token.id())));
    }

    #[test]
    fn test_opted_in_checks() {
        let policy = TokenPolicy { allow_propagation: true, allow_relinquish: true };
        let (token, holdings, engine) = setup(policy);

        assert!(matches!(
            check_relinquish(&token, &holdings, &engine, &id("alice"), &id("bob"), 1, &id("bob")),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(
            check_relinquish(&token, &holdings, &engine, &id("alice"), &id("bob"), 0, &id("alice")),
            Err(LedgerError::ZeroAmount)
        );
        assert_eq!(
            check_relinquish(&token, &holdings, &engine, &id("alice"), &id("bob"), 2, &id("alice")),
            Err(LedgerError::InsufficientBalance { have: 1, need: 2 })
        );

        let plan = check_relinquish(&token, &holdings, &engine, &id("alice"), &id("bob"), 1, &id("alice")).unwrap();
        assert_eq!(plan.amount, 1);
        assert_eq!(plan.to_generation, Generation::new(1));
    }
}
