use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::types::EventRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Snapshot {path} is not a valid event list: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The previous run's event set; the only state kept between runs.
pub trait SnapshotStore: Send + Sync {
    /// Previously saved events. An absent snapshot is an empty list.
    fn load(&self) -> Result<Vec<EventRecord>, StoreError>;

    /// Replaces the snapshot with `events`.
    fn save(&self, events: &[EventRecord]) -> Result<(), StoreError>;
}

/// Pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Vec<EventRecord>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No snapshot at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut events: Vec<EventRecord> =
            serde_json::from_str(&content).map_err(|source| StoreError::Format {
                path: self.path.clone(),
                source,
            })?;
        events.iter_mut().for_each(EventRecord::ensure_id);
        Ok(events)
    }

    /// Writes a sibling temp file and renames it over the snapshot, so a
    /// crash mid-write leaves the old snapshot in place on most filesystems.
    fn save(&self, events: &[EventRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(events).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        log::info!("Saved {} events to {}", events.len(), self.path.display());
        Ok(())
    }
}
