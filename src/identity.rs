//! Identities and token type ids
//!
//! Authentication happens outside the ledger; by the time a call arrives
//! the caller is just an opaque identity string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a creator, holder or caller
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Dense, monotonically assigned token type id (first id is 1, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenTypeId(u64);

impl TokenTypeId {
    pub const FIRST: TokenTypeId = TokenTypeId(1);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Position of this id in the registry arena
    pub(crate) fn slot(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }

    /// Id stored at a given arena position
    pub(crate) fn from_slot(slot: usize) -> Self {
        Self(slot as u64 + 1)
    }
}

impl fmt::Display for TokenTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_mapping() {
        assert_eq!(TokenTypeId::FIRST.slot(), Some(0));
        assert_eq!(TokenTypeId::new(0).slot(), None);
        assert_eq!(TokenTypeId::from_slot(4), TokenTypeId::new(5));
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let id = Identity::new("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");
        assert_eq!(id.to_string(), "alice");
    }
}
