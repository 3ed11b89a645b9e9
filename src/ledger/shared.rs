//! SharedLedger: a ledger handle with a reentrancy guard
//!
//! Calls from different threads queue on the mutex and run one at a time.
//! A call made from the thread that is already inside an operation, such
//! as a receive hook calling back into the ledger, fails with `Reentrant`
//! instead of deadlocking or observing a half-finished call.

use super::Ledger;
use crate::error::{LedgerError, LedgerResult};
use crate::events::EventRecord;
use crate::identity::{Identity, TokenTypeId};
use crate::propagation::Generation;
use crate::token::{NewTokenType, TokenPolicy};
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
    /// Thread currently running an operation, if any
    in_progress: Arc<Mutex<Option<ThreadId>>>,
}

/// Clears the in-progress marker when an operation ends, panics included
struct InProgress<'a> {
    marker: &'a Mutex<Option<ThreadId>>,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        *lock(self.marker) = None;
    }
}

// Writes either complete or never start (see `Ledger`), so a poisoned lock
// still guards a consistent ledger.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            in_progress: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `f` with exclusive access to the ledger
    pub fn with<R>(&self, f: impl FnOnce(&mut Ledger) -> LedgerResult<R>) -> LedgerResult<R> {
        let me = thread::current().id();
        if *lock(&self.in_progress) == Some(me) {
            warn!("rejected reentrant ledger call");
            return Err(LedgerError::Reentrant);
        }

        let mut ledger = lock(&self.inner);
        *lock(&self.in_progress) = Some(me);
        // dropped before `ledger`, so the marker is cleared while the lock is still held
        let _in_progress = InProgress {
            marker: &self.in_progress,
        };
        f(&mut ledger)
    }

    /// Run a read-only projection
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> LedgerResult<R> {
        self.with(|ledger| Ok(f(ledger)))
    }

    pub fn create(&self, caller: &Identity, draft: NewTokenType) -> LedgerResult<TokenTypeId> {
        self.with(|ledger| ledger.create(caller, draft))
    }

    pub fn propagate(
        &self,
        token_type: TokenTypeId,
        distributor: &Identity,
        recipients: &[Identity],
    ) -> LedgerResult<Generation> {
        self.with(|ledger| ledger.propagate(token_type, distributor, recipients))
    }

    pub fn relinquish(
        &self,
        token_type: TokenTypeId,
        from: &Identity,
        to: &Identity,
        amount: u64,
        caller: &Identity,
    ) -> LedgerResult<()> {
        self.with(|ledger| ledger.relinquish(token_type, from, to, amount, caller))
    }

    pub fn update_policy(
        &self,
        token_type: TokenTypeId,
        policy: TokenPolicy,
        caller: &Identity,
    ) -> LedgerResult<()> {
        self.with(|ledger| ledger.update_policy(token_type, policy, caller))
    }

    pub fn drain_events(&self) -> LedgerResult<Vec<EventRecord>> {
        self.with(|ledger| Ok(ledger.drain_events()))
    }
}
