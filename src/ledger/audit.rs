//! Invariant audit
//!
//! Recomputes what the ledger promises from its raw tables. A healthy
//! ledger yields no violations.

use super::Ledger;
use crate::identity::{Identity, TokenTypeId};
use crate::propagation::Generation;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{token_type}: circulating supply {circulating} != sum of holdings {held}")]
    SupplyMismatch {
        token_type: TokenTypeId,
        circulating: u64,
        held: u128,
    },

    #[error("{token_type}: circulating supply {circulating} above ceiling {ceiling}")]
    CeilingBreached {
        token_type: TokenTypeId,
        circulating: u64,
        ceiling: u64,
    },

    #[error("{token_type}: creator {creator} is not at the origin generation")]
    CreatorNotAtOrigin {
        token_type: TokenTypeId,
        creator: Identity,
    },

    #[error("{token_type}: holder {holder} has no generation record")]
    MissingGeneration {
        token_type: TokenTypeId,
        holder: Identity,
    },

    #[error("{token_type}: {holder} recorded at {recorded} but reachable at {shortest}")]
    GenerationAboveShortestPath {
        token_type: TokenTypeId,
        holder: Identity,
        recorded: Generation,
        shortest: Generation,
    },

    #[error("{token_type}: provenance edge {index} is a self-loop")]
    SelfLoopEdge { token_type: TokenTypeId, index: usize },

    #[error("{token_type}: provenance hash chain is broken")]
    BrokenChain { token_type: TokenTypeId },
}

impl Ledger {
    /// Check every token type against the ledger invariants
    pub fn verify_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let generations = self.engine.generations();
        let provenance = self.engine.provenance();

        for token in self.registry.iter() {
            let t = token.id();

            let held = self.holdings.total_of(t);
            if held != token.circulating_supply() as u128 {
                violations.push(InvariantViolation::SupplyMismatch {
                    token_type: t,
                    circulating: token.circulating_supply(),
                    held,
                });
            }
            if token.circulating_supply() > token.supply_ceiling() {
                violations.push(InvariantViolation::CeilingBreached {
                    token_type: t,
                    circulating: token.circulating_supply(),
                    ceiling: token.supply_ceiling(),
                });
            }
            if generations.get(t, token.creator()) != Some(Generation::ORIGIN) {
                violations.push(InvariantViolation::CreatorNotAtOrigin {
                    token_type: t,
                    creator: token.creator().clone(),
                });
            }

            for (holder, _) in self.holdings.holders_of(t) {
                if generations.get(t, &holder).is_none() {
                    violations.push(InvariantViolation::MissingGeneration { token_type: t, holder });
                }
            }

            let mut shortest: BTreeMap<&Identity, Generation> = BTreeMap::new();
            for (index, edge) in provenance.edges_of(t).iter().enumerate() {
                if edge.from == edge.to {
                    violations.push(InvariantViolation::SelfLoopEdge { token_type: t, index });
                }
                shortest
                    .entry(&edge.to)
                    .and_modify(|g| *g = (*g).min(edge.generation))
                    .or_insert(edge.generation);
            }
            for (holder, shortest) in shortest {
                match generations.get(t, holder) {
                    None => violations.push(InvariantViolation::MissingGeneration {
                        token_type: t,
                        holder: holder.clone(),
                    }),
                    Some(recorded) if recorded > shortest => {
                        violations.push(InvariantViolation::GenerationAboveShortestPath {
                            token_type: t,
                            holder: holder.clone(),
                            recorded,
                            shortest,
                        })
                    }
                    Some(_) => {}
                }
            }

            if !provenance.verify_chain(t) {
                violations.push(InvariantViolation::BrokenChain { token_type: t });
            }
        }
        violations
    }
}
