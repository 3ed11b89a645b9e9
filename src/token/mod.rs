//! Token types: what an acknowledgment is, who made it, how far it may spread

mod kind;
mod registry;

pub use kind::{NewTokenType, TokenPolicy, TokenType};
pub use registry::TokenRegistry;
