//! Receive hooks: recipients that want a say before accepting a unit
//!
//! A hook runs after a call has passed validation and before anything is
//! written. It sees the ledger as it was before the call. Refusing aborts
//! the whole call.

use crate::identity::{Identity, TokenTypeId};
use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};

/// How a unit is reaching its recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// The creator's own first unit
    Creation,
    /// A freshly minted unit from a distributor
    Propagation,
    /// Existing units handed over by their holder
    Relinquishment,
}

/// What a hook is asked to accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptNotice {
    pub token_type: TokenTypeId,
    pub kind: ReceiptKind,
    /// `None` for the creator's own unit
    pub from: Option<Identity>,
    pub to: Identity,
    pub amount: u64,
}

pub trait ReceiveHook: Send + Sync {
    /// Return `false` to refuse the unit
    fn on_receive(&self, ledger: &Ledger, notice: &ReceiptNotice) -> bool;
}

impl<F> ReceiveHook for F
where
    F: Fn(&Ledger, &ReceiptNotice) -> bool + Send + Sync,
{
    fn on_receive(&self, ledger: &Ledger, notice: &ReceiptNotice) -> bool {
        self(ledger, notice)
    }
}
