//! Propagation: mint-on-distribute, generations and provenance
//!
//! Propagation is how an acknowledgment spreads: every hop mints a new unit
//! and records who passed it on and how far from the creator it has come.

mod engine;
mod generation;
mod provenance;

pub use engine::{PropagationEngine, PropagationPlan};
pub use generation::{Generation, GenerationTable, GenerationUpdate};
pub use provenance::{ProvenanceEdge, ProvenanceLog};
