//! Durable storage for the request ledger.
//!
//! The ledger is read once at startup and written once at shutdown, never
//! mid-operation. [`LedgerStore`] is the seam; [`JsonFileStore`] keeps the
//! snapshot as a versioned JSON document on local disk.
//!
//! # Loading
//!
//! A missing file is a fresh start and loads as an empty ledger. A file
//! that cannot be read, does not parse, has an unknown version, or
//! breaks the ledger invariant is logged and also treated as empty, so a
//! damaged file never keeps the service from starting.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::LedgerSnapshot;
use crate::{HuginnError, Result};

/// Maximum supported ledger file format version.
const MAX_SUPPORTED_VERSION: u32 = 1;

/// Persistence collaborator for ledger snapshots.
pub trait LedgerStore: Send + Sync {
    /// Read the last persisted snapshot.
    fn load(&self) -> Result<LedgerSnapshot>;

    /// Replace the persisted snapshot.
    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// Versioned on-disk payload.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(flatten)]
    ledger: LedgerSnapshot,
}

/// Stores the ledger as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data dir>/huginn/ledger.json`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local"))
            .join("huginn")
            .join("ledger.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_payload(json: &str) -> Result<LedgerSnapshot> {
    let file: LedgerFile = serde_json::from_str(json)?;
    if file.version > MAX_SUPPORTED_VERSION {
        return Err(HuginnError::Storage(format!(
            "unsupported ledger version {} (max supported: {MAX_SUPPORTED_VERSION})",
            file.version
        )));
    }
    if !file.ledger.is_consistent() {
        return Err(HuginnError::Storage(
            "per-key timestamps missing from the global sequence".into(),
        ));
    }
    Ok(file.ledger)
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<LedgerSnapshot> {
        let path = &self.path;
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerSnapshot::default());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ledger, starting empty");
                return Ok(LedgerSnapshot::default());
            }
        };
        match parse_payload(&content) {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    requests = snapshot.total(),
                    keys = snapshot.keys.len(),
                    "loaded request ledger"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt ledger, starting empty");
                Ok(LedgerSnapshot::default())
            }
        }
    }

    /// Atomic write via tmp file + rename.
    fn persist(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let path = &self.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HuginnError::Storage(format!(
                    "failed to create ledger dir {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        let file = LedgerFile {
            version: MAX_SUPPORTED_VERSION,
            ledger: snapshot.clone(),
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(&tmp_path, json).map_err(|e| {
            HuginnError::Storage(format!(
                "failed to write ledger file {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            HuginnError::Storage(format!(
                "failed to rename ledger file {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;

        info!(path = %path.display(), requests = snapshot.total(), "persisted request ledger");
        Ok(())
    }
}
