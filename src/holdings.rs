//! Ownership ledger: balances per (token type, holder)
//!
//! Minting is additive and only reachable from inside the crate. The one
//! balance-reducing path is `transfer`, which the transfer gate guards.

use crate::identity::{Identity, TokenTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Holdings {
    balances: BTreeMap<TokenTypeId, BTreeMap<Identity, u64>>,
    /// Types each identity has ever held; append-once, never pruned
    holder_index: BTreeMap<Identity, Vec<TokenTypeId>>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_of(&self, token_type: TokenTypeId, holder: &Identity) -> u64 {
        self.balances
            .get(&token_type)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `holder` currently has at least one unit
    pub fn is_holder(&self, token_type: TokenTypeId, holder: &Identity) -> bool {
        self.holding_of(token_type, holder) > 0
    }

    /// Mint `amount` new units to `holder`.
    ///
    /// The caller has already accounted for the units in the type's
    /// circulating supply, so no balance can exceed the ceiling here.
    pub(crate) fn issue(&mut self, token_type: TokenTypeId, holder: &Identity, amount: u64) {
        self.credit(token_type, holder, amount);
    }

    /// Move `amount` units from `from` to `to`. The gate has checked the balance.
    pub(crate) fn transfer(
        &mut self,
        token_type: TokenTypeId,
        from: &Identity,
        to: &Identity,
        amount: u64,
    ) {
        if let Some(balance) = self
            .balances
            .get_mut(&token_type)
            .and_then(|holders| holders.get_mut(from))
        {
            debug_assert!(*balance >= amount);
            *balance -= amount;
        }
        self.credit(token_type, to, amount);
    }

    fn credit(&mut self, token_type: TokenTypeId, holder: &Identity, amount: u64) {
        let holders = self.balances.entry(token_type).or_default();
        let first_receipt = !holders.contains_key(holder);
        *holders.entry(holder.clone()).or_insert(0) += amount;
        if first_receipt {
            self.holder_index
                .entry(holder.clone())
                .or_default()
                .push(token_type);
        }
    }

    /// Sum of all balances of a type, widened so it cannot overflow
    pub fn total_of(&self, token_type: TokenTypeId) -> u128 {
        self.balances
            .get(&token_type)
            .map(|holders| holders.values().map(|b| *b as u128).sum())
            .unwrap_or(0)
    }

    /// Current non-zero holders of a type, ordered by identity
    pub fn holders_of(&self, token_type: TokenTypeId) -> Vec<(Identity, u64)> {
        self.balances
            .get(&token_type)
            .map(|holders| {
                holders
                    .iter()
                    .filter(|(_, balance)| **balance > 0)
                    .map(|(id, balance)| (id.clone(), *balance))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Types an identity has ever held, in order of first receipt
    pub fn types_held_by(&self, holder: &Identity) -> &[TokenTypeId] {
        self.holder_index
            .get(holder)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Number of identities that have ever held anything
    pub fn distinct_holders(&self) -> usize {
        self.holder_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: TokenTypeId = TokenTypeId::FIRST;

    #[test]
    fn test_issue_is_additive() {
        let mut h = Holdings::new();
        let alice = Identity::new("alice");
        h.issue(T1, &alice, 1);
        h.issue(T1, &alice, 2);
        assert_eq!(h.holding_of(T1, &alice), 3);
        assert_eq!(h.total_of(T1), 3);
        assert_eq!(h.types_held_by(&alice), &[T1]);
    }

    #[test]
    fn test_transfer_is_conservative() {
        let mut h = Holdings::new();
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        h.issue(T1, &alice, 3);
        h.transfer(T1, &alice, &bob, 2);
        assert_eq!(h.holding_of(T1, &alice), 1);
        assert_eq!(h.holding_of(T1, &bob), 2);
        assert_eq!(h.total_of(T1), 3);
    }

    #[test]
    fn test_holder_index_survives_zero_balance() {
        let mut h = Holdings::new();
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        h.issue(T1, &alice, 1);
        h.transfer(T1, &alice, &bob, 1);
        assert!(!h.is_holder(T1, &alice));
        assert_eq!(h.types_held_by(&alice), &[T1]);
        assert_eq!(h.holders_of(T1), vec![(bob.clone(), 1)]);

        // receiving again does not duplicate the index entry
        h.transfer(T1, &bob, &alice, 1);
        assert_eq!(h.types_held_by(&alice), &[T1]);
        assert_eq!(h.distinct_holders(), 2);
    }

    #[test]
    fn test_unknown_lookups_are_zero() {
        let h = Holdings::new();
        let nobody = Identity::new("nobody");
        assert_eq!(h.holding_of(T1, &nobody), 0);
        assert_eq!(h.total_of(T1), 0);
        assert!(h.holders_of(T1).is_empty());
        assert!(h.types_held_by(&nobody).is_empty());
    }
}
