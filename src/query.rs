//! Query surface: read-only projections over the ledger
//!
//! Nothing here fails: unknown types or holders read as zero, empty or `None`.

use crate::identity::{Identity, TokenTypeId};
use crate::ledger::Ledger;
use crate::propagation::{Generation, ProvenanceEdge};
use crate::token::TokenType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a token type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub id: TokenTypeId,
    pub narrative: String,
    pub creator: Identity,
    pub supply_ceiling: u64,
    pub circulating_supply: u64,
    pub created_at: DateTime<Utc>,
    pub visual_symbol: String,
    pub allow_propagation: bool,
    pub allow_relinquish: bool,
}

impl From<&TokenType> for TokenMetadata {
    fn from(token: &TokenType) -> Self {
        Self {
            id: token.id(),
            narrative: token.narrative().to_string(),
            creator: token.creator().clone(),
            supply_ceiling: token.supply_ceiling(),
            circulating_supply: token.circulating_supply(),
            created_at: token.created_at(),
            visual_symbol: token.visual_symbol().to_string(),
            allow_propagation: token.policy().allow_propagation,
            allow_relinquish: token.policy().allow_relinquish,
        }
    }
}

/// A holder in the propagation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub holder: Identity,
    pub generation: Generation,
    pub balance: u64,
}

/// A directed edge in the propagation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: Identity,
    pub to: Identity,
    pub generation: Generation,
}

/// Nodes and edges of one type, for external renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationGraph {
    pub token_type: TokenTypeId,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Statistics about the ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub token_types: usize,
    pub total_units: u64,
    pub total_edges: usize,
    pub distinct_holders: usize,
    pub deepest_generation: Generation,
}

impl Ledger {
    /// Units in circulation for a type
    pub fn reach(&self, token_type: TokenTypeId) -> u64 {
        self.registry()
            .get(token_type)
            .map(|t| t.circulating_supply())
            .unwrap_or(0)
    }

    /// Deepest generation recorded on any provenance edge of a type
    pub fn max_depth(&self, token_type: TokenTypeId) -> Generation {
        self.engine().provenance().max_depth(token_type)
    }

    /// Shortest known hop-count from the creator; `None` if never reached
    pub fn generation_of(&self, token_type: TokenTypeId, holder: &Identity) -> Option<Generation> {
        self.engine().generations().get(token_type, holder)
    }

    /// Provenance edges of a type in the order they were recorded
    pub fn provenance_of(&self, token_type: TokenTypeId) -> &[ProvenanceEdge] {
        self.engine().provenance().edges_of(token_type)
    }

    pub fn types_created_by(&self, creator: &Identity) -> &[TokenTypeId] {
        self.registry().created_by(creator)
    }

    /// Types an identity has ever held, even if its balance is now zero
    pub fn types_held_by(&self, holder: &Identity) -> &[TokenTypeId] {
        self.holdings().types_held_by(holder)
    }

    pub fn metadata_of(&self, token_type: TokenTypeId) -> Option<TokenMetadata> {
        self.registry().get(token_type).map(TokenMetadata::from)
    }

    pub fn holding_of(&self, token_type: TokenTypeId, holder: &Identity) -> u64 {
        self.holdings().holding_of(token_type, holder)
    }

    pub fn holders_of(&self, token_type: TokenTypeId) -> Vec<(Identity, u64)> {
        self.holdings().holders_of(token_type)
    }

    pub fn remaining_supply(&self, token_type: TokenTypeId) -> u64 {
        self.registry()
            .get(token_type)
            .map(|t| t.remaining_supply())
            .unwrap_or(0)
    }

    pub fn token_count(&self) -> usize {
        self.registry().len()
    }

    pub fn graph_of(&self, token_type: TokenTypeId) -> PropagationGraph {
        let nodes = self
            .engine()
            .generations()
            .of_type(token_type)
            .map(|(holder, generation)| GraphNode {
                holder: holder.clone(),
                generation,
                balance: self.holding_of(token_type, holder),
            })
            .collect();
        let edges = self
            .provenance_of(token_type)
            .iter()
            .map(|e| GraphEdge {
                from: e.from.clone(),
                to: e.to.clone(),
                generation: e.generation,
            })
            .collect();
        PropagationGraph {
            token_type,
            nodes,
            edges,
        }
    }

    pub fn stats(&self) -> LedgerStats {
        let registry = self.registry();
        LedgerStats {
            token_types: registry.len(),
            total_units: registry.iter().map(|t| t.circulating_supply()).sum(),
            total_edges: self.engine().provenance().total_edges(),
            distinct_holders: self.holdings().distinct_holders(),
            deepest_generation: registry
                .iter()
                .map(|t| self.max_depth(t.id()))
                .max()
                .unwrap_or(Generation::ORIGIN),
        }
    }
}
