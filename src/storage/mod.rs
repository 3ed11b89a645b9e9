//! Local storage for the ledger
//!
//! A single JSON document holding the ledger and a metadata block. The
//! metadata carries a SHA-256 checksum of the ledger so that a hand-edited
//! or truncated file is refused instead of loaded.

pub mod backup;

pub use backup::{BackupManager, BackupManifest, SnapshotMeta};

use crate::config::LedgerConfig;
use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Snapshot v{0} not found")]
    SnapshotNotFound(u64),

    #[error("No snapshots available")]
    NoSnapshots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub created_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
    pub saves: u64,
    /// SHA-256 of the canonical JSON form of the ledger
    pub checksum: String,
}

impl StoreMetadata {
    fn fresh() -> Self {
        Self {
            created_at: Utc::now(),
            saved_at: None,
            saves: 0,
            checksum: String::new(),
        }
    }
}

/// On-disk layout
#[derive(Serialize, Deserialize)]
struct StoreDocument {
    ledger: serde_json::Value,
    metadata: StoreMetadata,
}

pub struct LedgerStore {
    pub ledger: Ledger,
    pub path: PathBuf,
    pub metadata: StoreMetadata,
}

impl LedgerStore {
    /// Open the store at `path`, or start an empty ledger if the file does not exist.
    ///
    /// `config` replaces whatever limits were saved with the ledger.
    pub fn open(path: impl AsRef<Path>, config: LedgerConfig) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("No store at {}, starting fresh", path.display());
            return Ok(Self {
                ledger: Ledger::new(config),
                path,
                metadata: StoreMetadata::fresh(),
            });
        }

        let data = std::fs::read_to_string(&path)?;
        let doc: StoreDocument = serde_json::from_str(&data)?;
        let actual = checksum_of(&doc.ledger);
        if actual != doc.metadata.checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: doc.metadata.checksum,
                actual,
            });
        }

        let mut ledger: Ledger = serde_json::from_value(doc.ledger)?;
        ledger.set_config(config);
        info!(
            "Loaded {} token types from {}",
            ledger.token_count(),
            path.display()
        );
        Ok(Self {
            ledger,
            path,
            metadata: doc.metadata,
        })
    }

    pub fn save(&mut self) -> Result<(), StoreError> {
        let value = serde_json::to_value(&self.ledger)?;
        self.metadata.checksum = checksum_of(&value);
        self.metadata.saved_at = Some(Utc::now());
        self.metadata.saves += 1;

        let doc = StoreDocument {
            ledger: value,
            metadata: self.metadata.clone(),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&doc)?)?;
        debug!("Saved ledger to {}", self.path.display());
        Ok(())
    }

    pub fn summary(&self) -> String {
        let stats = self.ledger.stats();
        format!(
            "LedgerStore '{}' | {} types | {} units | {} holders | deepest {}",
            self.path.display(),
            stats.token_types,
            stats.total_units,
            stats.distinct_holders,
            stats.deepest_generation
        )
    }
}

// serde_json objects are sorted maps, so the compact form is canonical
fn checksum_of(value: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(value.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::token::NewTokenType;

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("waves-store-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn populate(ledger: &mut Ledger) -> crate::identity::TokenTypeId {
        let t = ledger
            .create(
                &Identity::new("alice"),
                NewTokenType::new("tea for two", 10).with_recipients([Identity::new("bob")]),
            )
            .unwrap();
        ledger
            .propagate(t, &Identity::new("bob"), &[Identity::new("carol")])
            .unwrap();
        t
    }

    #[test]
    fn test_open_missing_file_is_fresh() {
        let dir = test_dir();
        let store = LedgerStore::open(dir.join("ledger.json"), LedgerConfig::default()).unwrap();
        assert_eq!(store.ledger.token_count(), 0);
        assert_eq!(store.metadata.saves, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = test_dir();
        let path = dir.join("ledger.json");

        let mut store = LedgerStore::open(&path, LedgerConfig::default()).unwrap();
        let t = populate(&mut store.ledger);
        store.save().unwrap();

        let reopened = LedgerStore::open(&path, LedgerConfig::default()).unwrap();
        assert_eq!(reopened.metadata.saves, 1);
        assert_eq!(reopened.ledger.reach(t), 3);
        assert_eq!(reopened.ledger.provenance_of(t).len(), 2);
        assert_eq!(reopened.ledger.pending_events().len(), 3);
        assert!(reopened.ledger.verify_invariants().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_applies_given_config() {
        let dir = test_dir();
        let path = dir.join("ledger.json");
        let mut store = LedgerStore::open(&path, LedgerConfig::default()).unwrap();
        populate(&mut store.ledger);
        store.save().unwrap();

        let config = LedgerConfig {
            max_batch_size: 3,
            ..LedgerConfig::default()
        };
        let reopened = LedgerStore::open(&path, config.clone()).unwrap();
        assert_eq!(reopened.ledger.config(), &config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tampered_file_is_refused() {
        let dir = test_dir();
        let path = dir.join("ledger.json");
        let mut store = LedgerStore::open(&path, LedgerConfig::default()).unwrap();
        populate(&mut store.ledger);
        store.save().unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, data.replace("tea for two", "tea for six")).unwrap();

        assert!(matches!(
            LedgerStore::open(&path, LedgerConfig::default()),
            Err(StoreError::ChecksumMismatch { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_garbage_file_is_a_json_error() {
        let dir = test_dir();
        let path = dir.join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LedgerStore::open(&path, LedgerConfig::default()),
            Err(StoreError::Json(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
