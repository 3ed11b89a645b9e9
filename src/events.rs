//! Ledger notifications
//!
//! One record per committed state change, consumed by external indexers.
//! Records are staged while an operation runs and only reach the outbox
//! when the operation commits.

use crate::identity::{Identity, TokenTypeId};
use crate::propagation::Generation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A token type was registered and its creator received the first unit
    TypeCreated {
        token_type: TokenTypeId,
        creator: Identity,
        supply_ceiling: u64,
        initial_recipients: Vec<Identity>,
    },
    /// A new unit was minted to `to` on behalf of `from`
    UnitPropagated {
        token_type: TokenTypeId,
        from: Identity,
        to: Identity,
        generation: Generation,
    },
    /// Existing units moved from one holder to another
    UnitRelinquished {
        token_type: TokenTypeId,
        from: Identity,
        to: Identity,
        amount: u64,
    },
    /// The creator changed the policy flags
    PolicyUpdated {
        token_type: TokenTypeId,
        allow_propagation: bool,
        allow_relinquish: bool,
    },
}

impl LedgerEvent {
    pub fn token_type(&self) -> TokenTypeId {
        match self {
            LedgerEvent::TypeCreated { token_type, .. }
            | LedgerEvent::UnitPropagated { token_type, .. }
            | LedgerEvent::UnitRelinquished { token_type, .. }
            | LedgerEvent::PolicyUpdated { token_type, .. } => *token_type,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::TypeCreated { .. } => "type-created",
            LedgerEvent::UnitPropagated { .. } => "unit-propagated",
            LedgerEvent::UnitRelinquished { .. } => "unit-relinquished",
            LedgerEvent::PolicyUpdated { .. } => "policy-updated",
        }
    }
}

/// A committed event with its envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Ledger-wide position, strictly increasing
    pub sequence: u64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: LedgerEvent,
}

impl EventRecord {
    pub fn new(sequence: u64, event: LedgerEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence,
            id: Uuid::new_v4(),
            timestamp,
            event,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
