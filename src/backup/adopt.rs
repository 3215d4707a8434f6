use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::record::DATABASE_TYPE;
use super::{BackupFormat, BackupManager, BackupRecord, CURRENT_EXTENSION, LEGACY_EXTENSION, MAX_REGISTRY_ENTRIES};
use crate::error::BackupError;
use crate::events::Event;

impl BackupManager {
    /// Register backup files in the backups directory that have no record,
    /// e.g. copies restored from elsewhere or left by a lost registry.
    /// Returns how many were added.
    pub fn adopt_orphans(&self) -> Result<usize, BackupError> {
        let dir = &self.paths.backups_dir;
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut records = self.registry.load();
        let known_paths: HashSet<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
        let mut known_names: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();

        let mut adopted = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry in backups directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_backup = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == CURRENT_EXTENSION || e == LEGACY_EXTENSION);
            if !is_backup || known_paths.contains(path) {
                continue;
            }

            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if !known_names.insert(name.clone()) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| BackupError::io("read metadata of", path, e.into()))?;
            let created_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| self.now());

            adopted.push(BackupRecord {
                name,
                path: path.to_path_buf(),
                size_bytes: metadata.len(),
                created_at,
                version: String::new(),
                platform: String::new(),
                database_type: DATABASE_TYPE.to_string(),
                backup_format: Some(BackupFormat::from_path(path)),
            });
        }

        if adopted.is_empty() {
            return Ok(0);
        }

        let candidates: HashSet<PathBuf> = adopted.iter().map(|r| r.path.clone()).collect();
        records.extend(adopted);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(MAX_REGISTRY_ENTRIES);
        self.registry.save(&records)?;

        // files older than everything the cap keeps stay unregistered
        let mut count = 0;
        for record in records.iter().filter(|r| candidates.contains(&r.path)) {
            self.emit(Event::OrphanAdopted {
                name: record.name.clone(),
                path: record.path.clone(),
            });
            count += 1;
        }

        Ok(count)
    }
}
