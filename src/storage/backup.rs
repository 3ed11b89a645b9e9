//! Versioned ledger snapshots
//!
//! Each snapshot is a standalone JSON file named `snapshot_vNNNN_<time>.json`;
//! `manifest.json` in the same directory lists them with their SHA-256
//! checksums. Restoring re-verifies the checksum before parsing.

use super::StoreError;
use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub checksum: String,
    pub size_bytes: u64,
    pub token_types: usize,
    pub description: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub snapshots: Vec<SnapshotMeta>,
    pub next_version: u64,
}

impl Default for BackupManifest {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
            next_version: 1,
        }
    }
}

impl BackupManifest {
    fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path)
            .map_err(StoreError::from)
            .and_then(|json| Ok(serde_json::from_str::<BackupManifest>(&json)?))
        {
            Ok(manifest) => {
                info!("Loaded backup manifest with {} snapshots", manifest.snapshots.len());
                manifest
            }
            Err(e) => {
                warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn save(&self, dir: &Path) -> Result<(), StoreError> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub struct BackupManager {
    dir: PathBuf,
    manifest: BackupManifest,
}

impl BackupManager {
    /// Open the backup directory, loading its manifest if there is one
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let manifest = BackupManifest::load_or_default(&dir);
        Self { dir, manifest }
    }

    pub fn create_snapshot(&mut self, ledger: &Ledger, description: &str) -> Result<SnapshotMeta, StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let data = serde_json::to_string_pretty(ledger)?;
        let version = self.manifest.next_version;
        let now = Utc::now();
        let filename = format!("snapshot_v{:04}_{}.json", version, now.format("%Y%m%d_%H%M%S"));
        std::fs::write(self.dir.join(&filename), &data)?;

        let meta = SnapshotMeta {
            version,
            timestamp: now,
            checksum: digest(&data),
            size_bytes: data.len() as u64,
            token_types: ledger.token_count(),
            description: description.to_string(),
            filename,
        };
        self.manifest.snapshots.push(meta.clone());
        self.manifest.next_version += 1;
        self.manifest.save(&self.dir)?;

        info!(
            "Created snapshot v{}: {} ({} token types, {} bytes)",
            version, description, meta.token_types, meta.size_bytes
        );
        Ok(meta)
    }

    /// Load the ledger saved in snapshot `version`
    pub fn restore(&self, version: u64) -> Result<Ledger, StoreError> {
        let meta = self
            .manifest
            .snapshots
            .iter()
            .find(|s| s.version == version)
            .ok_or(StoreError::SnapshotNotFound(version))?;

        let data = std::fs::read_to_string(self.dir.join(&meta.filename))?;
        let actual = digest(&data);
        if actual != meta.checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: meta.checksum.clone(),
                actual,
            });
        }

        let ledger: Ledger = serde_json::from_str(&data)?;
        info!("Restored snapshot v{}: {} token types, checksum OK", version, ledger.token_count());
        Ok(ledger)
    }

    pub fn restore_latest(&self) -> Result<Ledger, StoreError> {
        let latest = self.latest().ok_or(StoreError::NoSnapshots)?;
        self.restore(latest.version)
    }

    pub fn latest(&self) -> Option<&SnapshotMeta> {
        self.manifest.snapshots.last()
    }

    pub fn list(&self) -> &[SnapshotMeta] {
        &self.manifest.snapshots
    }

    /// Recheck every snapshot file against its manifest checksum
    pub fn verify_all(&self) -> Vec<(u64, bool)> {
        self.manifest
            .snapshots
            .iter()
            .map(|meta| {
                let ok = std::fs::read_to_string(self.dir.join(&meta.filename))
                    .map(|data| digest(&data) == meta.checksum)
                    .unwrap_or(false);
                (meta.version, ok)
            })
            .collect()
    }

    /// Delete all but the newest `keep` snapshots
    pub fn retain_latest(&mut self, keep: usize) -> Result<usize, StoreError> {
        let excess = self.manifest.snapshots.len().saturating_sub(keep);
        if excess == 0 {
            return Ok(0);
        }
        for meta in self.manifest.snapshots.drain(..excess) {
            if let Err(e) = std::fs::remove_file(self.dir.join(&meta.filename)) {
                warn!("Could not remove {}: {}", meta.filename, e);
            }
        }
        self.manifest.save(&self.dir)?;
        info!("Removed {} old snapshots, keeping latest {}", excess, keep);
        Ok(excess)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn total_size(&self) -> u64 {
        self.manifest.snapshots.iter().map(|s| s.size_bytes).sum()
    }
}

fn digest(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::identity::{Identity, TokenTypeId};
    use crate::token::NewTokenType;

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("waves-backup-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn ledger_with_types(n: usize) -> Ledger {
        let mut ledger = Ledger::new(LedgerConfig::default());
        for i in 0..n {
            ledger
                .create(&Identity::new("alice"), NewTokenType::new(format!("thanks #{}", i), 5))
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_create_and_restore_snapshot() {
        let dir = test_dir();
        let mut mgr = BackupManager::new(&dir);

        let meta = mgr.create_snapshot(&ledger_with_types(2), "two types").unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.token_types, 2);
        assert!(meta.filename.starts_with("snapshot_v0001_"));

        let restored = mgr.restore(1).unwrap();
        assert_eq!(restored.token_count(), 2);
        assert_eq!(restored.reach(TokenTypeId::new(2)), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_manifest_survives_reopen() {
        let dir = test_dir();
        {
            let mut mgr = BackupManager::new(&dir);
            mgr.create_snapshot(&ledger_with_types(1), "first").unwrap();
            mgr.create_snapshot(&ledger_with_types(3), "second").unwrap();
        }

        let mgr = BackupManager::new(&dir);
        assert_eq!(mgr.list().len(), 2);
        assert_eq!(mgr.latest().unwrap().description, "second");
        assert_eq!(mgr.restore_latest().unwrap().token_count(), 3);
        assert!(matches!(mgr.restore(9), Err(StoreError::SnapshotNotFound(9))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupted_snapshot_is_refused() {
        let dir = test_dir();
        let mut mgr = BackupManager::new(&dir);
        let meta = mgr.create_snapshot(&ledger_with_types(1), "victim").unwrap();

        let path = dir.join(&meta.filename);
        let data = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, data.replace("thanks #0", "thanks #9")).unwrap();

        assert!(matches!(mgr.restore(1), Err(StoreError::ChecksumMismatch { .. })));
        assert_eq!(mgr.verify_all(), vec![(1, false)]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_manager() {
        let dir = test_dir();
        let mgr = BackupManager::new(&dir);
        assert!(mgr.latest().is_none());
        assert!(matches!(mgr.restore_latest(), Err(StoreError::NoSnapshots)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_retain_latest() {
        let dir = test_dir();
        let mut mgr = BackupManager::new(&dir);
        for i in 0..5 {
            mgr.create_snapshot(&ledger_with_types(i), &format!("v{}", i)).unwrap();
        }

        assert_eq!(mgr.retain_latest(2).unwrap(), 3);
        assert_eq!(mgr.list().len(), 2);
        assert_eq!(mgr.restore_latest().unwrap().token_count(), 4);
        assert!(mgr.verify_all().iter().all(|(_, ok)| *ok));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
