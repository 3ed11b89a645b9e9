//! Generations: shortest known hop-count from a type's creator
//!
//! An absent record means "never reached", which is distinct from the
//! creator's generation 0. Records only ever go down.

use crate::identity::{Identity, TokenTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u32);

impl Generation {
    /// The creator's generation
    pub const ORIGIN: Generation = Generation(0);

    pub fn new(hops: u32) -> Self {
        Self(hops)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Generation one hop further out, `None` on overflow
    pub fn next(self) -> Option<Generation> {
        self.0.checked_add(1).map(Generation)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Outcome of offering a generation for a holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationUpdate {
    /// Holder had no record
    First,
    /// Holder had a longer path; record lowered
    Lowered { previous: Generation },
    /// Holder already had an equal or shorter path
    Kept { current: Generation },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationTable {
    records: BTreeMap<TokenTypeId, BTreeMap<Identity, Generation>>,
}

impl GenerationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token_type: TokenTypeId, holder: &Identity) -> Option<Generation> {
        self.records
            .get(&token_type)
            .and_then(|holders| holders.get(holder))
            .copied()
    }

    /// Minimum-wins write: first offer sets the record, later offers may only lower it
    pub(crate) fn offer(
        &mut self,
        token_type: TokenTypeId,
        holder: &Identity,
        generation: Generation,
    ) -> GenerationUpdate {
        let holders = self.records.entry(token_type).or_default();
        match holders.get_mut(holder) {
            None => {
                holders.insert(holder.clone(), generation);
                GenerationUpdate::First
            }
            Some(current) if generation < *current => {
                let previous = *current;
                *current = generation;
                GenerationUpdate::Lowered { previous }
            }
            Some(current) => GenerationUpdate::Kept { current: *current },
        }
    }

    /// All recorded generations of a type, ordered by holder
    pub fn of_type(&self, token_type: TokenTypeId) -> impl Iterator<Item = (&Identity, Generation)> {
        self.records
            .get(&token_type)
            .into_iter()
            .flat_map(|holders| holders.iter().map(|(id, g)| (id, *g)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: TokenTypeId = TokenTypeId::FIRST;

    #[test]
    fn test_unset_is_not_origin() {
        let table = GenerationTable::new();
        assert_eq!(table.get(T1, &Identity::new("alice")), None);
        assert_ne!(table.get(T1, &Identity::new("alice")), Some(Generation::ORIGIN));
    }

    #[test]
    fn test_minimum_wins() {
        let mut table = GenerationTable::new();
        let carol = Identity::new("carol");

        assert_eq!(table.offer(T1, &carol, Generation::new(3)), GenerationUpdate::First);
        assert_eq!(
            table.offer(T1, &carol, Generation::new(5)),
            GenerationUpdate::Kept { current: Generation::new(3) }
        );
        assert_eq!(table.get(T1, &carol), Some(Generation::new(3)));

        assert_eq!(
            table.offer(T1, &carol, Generation::new(1)),
            GenerationUpdate::Lowered { previous: Generation::new(3) }
        );
        assert_eq!(table.get(T1, &carol), Some(Generation::new(1)));
    }

    #[test]
    fn test_origin_is_never_raised() {
        let mut table = GenerationTable::new();
        let alice = Identity::new("alice");
        table.offer(T1, &alice, Generation::ORIGIN);
        table.offer(T1, &alice, Generation::new(2));
        assert_eq!(table.get(T1, &alice), Some(Generation::ORIGIN));
    }

    #[test]
    fn test_next_overflow() {
        assert_eq!(Generation::new(u32::MAX).next(), None);
        assert_eq!(Generation::ORIGIN.next(), Some(Generation::new(1)));
    }
}
