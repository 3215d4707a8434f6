use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, DatabaseName, OpenFlags};

use super::record::DATABASE_TYPE;
use super::{reserved_paths, sibling, BackupFormat, BackupManager, BackupRecord, CURRENT_EXTENSION};
use crate::config::CopyMode;
use crate::error::BackupError;
use crate::events::Event;
use crate::platform;
use crate::util::backup_name;

impl BackupManager {
    /// Copy the live database to `custom`, or to a timestamped file in the
    /// backups directory, and register it. Returns the absolute backup path.
    pub fn create_backup(&self, custom: Option<&Path>) -> Result<PathBuf, BackupError> {
        let source = self.live_path();
        if !source.is_file() {
            return Err(BackupError::SourceMissing(source.to_path_buf()));
        }

        let created_at = self.now();
        let (name, destination) = match custom {
            Some(path) => {
                let destination = platform::absolute(path);
                let name = destination
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| backup_name(created_at));
                (name, destination)
            }
            None => {
                let name = backup_name(created_at);
                let file = format!("{name}.{CURRENT_EXTENSION}");
                (name, self.paths.backups_dir.join(file))
            }
        };

        self.check_destination(&destination)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BackupError::io("create backup directory", parent, e))?;
        }

        // the destination only ever holds a complete copy
        let replaced = destination.exists();
        let partial = sibling(&destination, PARTIAL_SUFFIX);
        if let Err(e) = copy_database(source, &partial, self.copy_mode) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &destination).map_err(|e| {
            let _ = fs::remove_file(&partial);
            BackupError::io("move backup into place at", &destination, e)
        })?;

        let size_bytes = fs::metadata(&destination)
            .map_err(|e| BackupError::io("read size of", &destination, e))?
            .len();

        let record = BackupRecord {
            name: name.clone(),
            path: destination.clone(),
            size_bytes,
            created_at,
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: self.platform.as_str().to_string(),
            database_type: DATABASE_TYPE.to_string(),
            backup_format: Some(BackupFormat::Current),
        };

        if let Err(e) = self.upsert(record) {
            if replaced {
                // the old file is already gone; this copy is all that is left
                tracing::warn!(path = %destination.display(), "backup written but not registered");
            } else if let Err(remove) = fs::remove_file(&destination) {
                tracing::warn!(
                    path = %destination.display(),
                    error = %remove,
                    "could not remove unregistered backup"
                );
            }
            return Err(e);
        }

        self.emit(Event::BackupCreated {
            name,
            path: destination.clone(),
            size_bytes,
        });

        Ok(destination)
    }

    /// Refuse destinations that are the live database or a restore file
    /// beside it, including through symlinks or `..` components.
    fn check_destination(&self, destination: &Path) -> Result<(), BackupError> {
        let Ok(live) = fs::canonicalize(self.live_path()) else {
            return Ok(());
        };
        let reserved = reserved_paths(&live);

        let mut resolved = Vec::with_capacity(2);
        if let Ok(existing) = fs::canonicalize(destination) {
            resolved.push(existing);
        }
        if let (Some(parent), Some(file)) = (destination.parent(), destination.file_name()) {
            if let Ok(parent) = fs::canonicalize(parent) {
                resolved.push(parent.join(file));
            }
        }

        if resolved.iter().any(|p| reserved.contains(p)) {
            return Err(BackupError::ReservedDestination(destination.to_path_buf()));
        }
        Ok(())
    }
}

const PARTIAL_SUFFIX: &str = "backup-partial";

fn copy_database(source: &Path, destination: &Path, mode: CopyMode) -> Result<(), BackupError> {
    match mode {
        CopyMode::Raw => {
            fs::copy(source, destination)
                .map_err(|e| BackupError::io("copy database to", destination, e))?;
        }
        CopyMode::Online => {
            // start from an empty file so no pages of a stale partial survive
            match fs::remove_file(destination) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BackupError::io("replace", destination, e)),
            }
            let conn = Connection::open_with_flags(
                source,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.backup(DatabaseName::Main, destination, None)?;
        }
    }
    Ok(())
}
