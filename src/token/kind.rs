//! TokenType: one class of acknowledgment unit
//!
//! Identity fields (narrative, creator, ceiling, symbol, creation time) are
//! fixed at creation. Policy is changed only through the registry on behalf
//! of the creator; circulating supply only moves through propagation.

use crate::identity::{Identity, TokenTypeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-type policy flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Holders may mint new units to others
    pub allow_propagation: bool,
    /// Holders may hand existing units over (conservative transfer)
    pub allow_relinquish: bool,
}

impl TokenPolicy {
    /// Propagating, non-relinquishable: the usual acknowledgment token
    pub fn propagating() -> Self {
        Self {
            allow_propagation: true,
            allow_relinquish: false,
        }
    }

    /// Neither propagation nor relinquishment
    pub fn sealed() -> Self {
        Self {
            allow_propagation: false,
            allow_relinquish: false,
        }
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::propagating()
    }
}

/// Parameters for creating a token type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTokenType {
    pub narrative: String,
    pub supply_ceiling: u64,
    pub initial_recipients: Vec<Identity>,
    pub visual_symbol: String,
    pub policy: TokenPolicy,
}

impl NewTokenType {
    pub fn new(narrative: impl Into<String>, supply_ceiling: u64) -> Self {
        Self {
            narrative: narrative.into(),
            supply_ceiling,
            initial_recipients: Vec::new(),
            visual_symbol: String::new(),
            policy: TokenPolicy::default(),
        }
    }

    pub fn with_recipients(mut self, recipients: impl IntoIterator<Item = Identity>) -> Self {
        self.initial_recipients = recipients.into_iter().collect();
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.visual_symbol = symbol.into();
        self
    }

    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A registered token type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenType {
    id: TokenTypeId,
    narrative: String,
    creator: Identity,
    supply_ceiling: u64,
    circulating_supply: u64,
    created_at: DateTime<Utc>,
    policy: TokenPolicy,
    visual_symbol: String,
}

impl TokenType {
    pub(crate) fn new(
        id: TokenTypeId,
        creator: Identity,
        draft: &NewTokenType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            narrative: draft.narrative.clone(),
            creator,
            supply_ceiling: draft.supply_ceiling,
            circulating_supply: 0,
            created_at,
            policy: draft.policy,
            visual_symbol: draft.visual_symbol.clone(),
        }
    }

    pub fn id(&self) -> TokenTypeId {
        self.id
    }

    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn creator(&self) -> &Identity {
        &self.creator
    }

    pub fn supply_ceiling(&self) -> u64 {
        self.supply_ceiling
    }

    pub fn circulating_supply(&self) -> u64 {
        self.circulating_supply
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    pub fn visual_symbol(&self) -> &str {
        &self.visual_symbol
    }

    /// Units that can still be minted before the ceiling is reached
    pub fn remaining_supply(&self) -> u64 {
        self.supply_ceiling.saturating_sub(self.circulating_supply)
    }

    /// Whether `count` more units fit under the ceiling
    pub fn has_room_for(&self, count: u64) -> bool {
        count <= self.remaining_supply()
    }

    pub(crate) fn set_policy(&mut self, policy: TokenPolicy) {
        self.policy = policy;
    }

    /// Record newly minted units. Callers check `has_room_for` first.
    pub(crate) fn add_circulating(&mut self, count: u64) {
        debug_assert!(self.has_room_for(count));
        self.circulating_supply += count;
    }

    pub fn summary(&self) -> String {
        format!(
            "TokenType {} '{}' by {} | supply {}/{} | propagate={} relinquish={} | {}",
            self.id,
            self.visual_symbol,
            self.creator,
            self.circulating_supply,
            self.supply_ceiling,
            self.policy.allow_propagation,
            self.policy.allow_relinquish,
            self.narrative,
        )
    }
}
