//! Ledger errors
//!
//! Every error is a precondition failure detected before anything is
//! written, so a failed call leaves the ledger exactly as it was.

use crate::identity::{Identity, TokenTypeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Narrative must be non-empty and at most {max_len} bytes")]
    InvalidNarrative { max_len: usize },

    #[error("Visual symbol must be at most {max_len} bytes")]
    InvalidSymbol { max_len: usize },

    #[error("Supply ceiling must be greater than zero")]
    InvalidSupplyCeiling,

    #[error("Supply exceeded: ceiling {ceiling}, circulating {circulating}, requested {requested}")]
    SupplyExceeded {
        ceiling: u64,
        circulating: u64,
        requested: u64,
    },

    #[error("Propagation is disabled for token type {0}")]
    PropagationDisabled(TokenTypeId),

    #[error("Relinquishment is disabled for token type {0}")]
    RelinquishDisabled(TokenTypeId),

    #[error("{holder} holds no units of token type {token_type}")]
    NotAHolder {
        token_type: TokenTypeId,
        holder: Identity,
    },

    #[error("{0} cannot propagate to itself")]
    SelfPropagation(Identity),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token type not found: {0}")]
    UnknownTokenType(TokenTypeId),

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Batch of {len} recipients exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Receiver {0} rejected the unit")]
    ReceiverRejected(Identity),

    #[error("Reentrant call rejected: another ledger operation is in progress on this thread")]
    Reentrant,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
