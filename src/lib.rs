//! Waves: a propagation ledger for acknowledgment tokens
//!
//! Creators mint token types carrying a narrative. Any holder can pass the
//! token on: each recipient gets a freshly minted unit up to the type's
//! supply ceiling, and the ledger keeps who got it from whom and how many
//! hops each holder is from the creator.

pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod holdings;
pub mod hooks;
pub mod identity;
pub mod ledger;
pub mod propagation;
pub mod query;
pub mod storage;
pub mod token;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use events::{EventRecord, LedgerEvent};
pub use hooks::{ReceiptKind, ReceiptNotice, ReceiveHook};
pub use identity::{Identity, TokenTypeId};
pub use ledger::{InvariantViolation, Ledger, SharedLedger};
pub use propagation::{Generation, ProvenanceEdge};
pub use query::{LedgerStats, PropagationGraph, TokenMetadata};
pub use storage::{BackupManager, LedgerStore, StoreError};
pub use token::{NewTokenType, TokenPolicy, TokenType};
