//! Ledger configuration
//!
//! Limits that bound the work a single call may do. Loaded from a JSON file
//! when one exists, otherwise the defaults apply.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a ledger instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum recipients in one propagate or create call
    pub max_batch_size: usize,
    /// Maximum narrative length in bytes
    pub max_narrative_len: usize,
    /// Maximum visual symbol length in bytes
    pub max_symbol_len: usize,
    /// Propagation policy used by the CLI when no flag is given
    pub default_allow_propagation: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 256,
            max_narrative_len: 4096,
            max_symbol_len: 64,
            default_allow_propagation: true,
        }
    }
}

impl LedgerConfig {
    /// Load a config file, falling back to defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str::<LedgerConfig>(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => {
                info!("Loaded ledger config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
