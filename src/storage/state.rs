//! Durable watermark state.
//!
//! The only thing persisted across runs is the mapping of subaccount id to
//! the last successfully reported watermark. It is loaded once at startup
//! and written back exactly once, after the whole loop, via a temp file
//! plus fsync plus rename so a crash mid-run leaves the previous state file
//! fully intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::SubaccountId;

/// Errors raised by the state store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing the state file failed.
    #[error("state file i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file exists but is not a JSON object of watermarks.
    #[error("state file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The watermark mapping: subaccount id to last-reported Unix timestamp,
/// exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    watermarks: BTreeMap<SubaccountId, i64>,
}

impl SyncState {
    /// The watermark for a subaccount, or `default` if none is recorded.
    pub fn watermark(&self, id: &SubaccountId, default: i64) -> i64 {
        self.watermarks.get(id).copied().unwrap_or(default)
    }

    /// Advances a watermark after a confirmed successful dispatch.
    ///
    /// Watermarks never move backwards; a smaller timestamp is ignored.
    pub fn advance(&mut self, id: SubaccountId, ts: i64) {
        let entry = self.watermarks.entry(id).or_insert(ts);
        if ts > *entry {
            *entry = ts;
        }
    }

    /// Number of recorded watermarks.
    pub fn len(&self) -> usize {
        self.watermarks.len()
    }

    /// Whether no watermark has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty()
    }
}

/// File-backed store for [`SyncState`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store over the given state file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted state.
    ///
    /// A missing file means a first run and yields an empty state. A file
    /// containing an explicit JSON `null` is treated the same way (with a
    /// log line) rather than as corruption. Anything else that fails to
    /// parse is an error: silently discarding real watermarks would make
    /// every subaccount re-report its default window.
    pub fn load(&self) -> Result<SyncState, StateError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "state file not found, starting fresh");
                return Ok(SyncState::default());
            }
            Err(err) => return Err(err.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&text)?;
        if value.is_null() {
            tracing::info!(path = %self.path.display(), "state file is empty, starting fresh");
            return Ok(SyncState::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Persists the state atomically.
    ///
    /// Writes the full mapping to a sibling temp file, fsyncs it, then
    /// renames it over the target.
    pub fn persist(&self, state: &SyncState) -> Result<(), StateError> {
        let tmp_path = tmp_sibling(&self.path);
        {
            let file = std::fs::File::create(&tmp_path)?;
            serde_json::to_writer(&file, state)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
