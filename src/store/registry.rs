//! Registry store implementations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::RegistryStore;
use crate::backup::BackupRecord;
use crate::error::BackupError;

/// Registry kept as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileRegistry { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileRegistry {
    fn load(&self) -> Vec<BackupRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read backup registry");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "backup registry is malformed, treating as empty");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[BackupRecord]) -> Result<(), BackupError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BackupError::io("create registry directory", parent, e))?;
        }

        let json = serde_json::to_string_pretty(records)?;

        // write beside the target then rename, so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| BackupError::io("write registry", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            BackupError::io("replace registry", &self.path, e)
        })
    }
}

/// Registry held in memory.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: Mutex<Vec<BackupRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<BackupRecord>) -> Self {
        MemoryRegistry {
            records: Mutex::new(records),
        }
    }
}

impl RegistryStore for MemoryRegistry {
    fn load(&self) -> Vec<BackupRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn save(&self, records: &[BackupRecord]) -> Result<(), BackupError> {
        let mut guard = self.records.lock().map_err(|_| BackupError::ManagerPoisoned)?;
        *guard = records.to_vec();
        Ok(())
    }
}
