use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{
    legacy, sibling, BackupFormat, BackupManager, BackupRecord, CURRENT_EXTENSION,
    INCOMING_SUFFIX, LEGACY_EXTENSION, SAFETY_SUFFIX,
};
use crate::error::BackupError;
use crate::events::Event;

impl BackupManager {
    /// Replace the live database with a backup, given its registry name or path.
    ///
    /// The live file is copied aside first. If anything fails after that,
    /// the copy is put back and the error is returned as
    /// [`BackupError::RestoreRolledBack`]. Only a failed rollback yields
    /// [`BackupError::RollbackFailed`].
    ///
    /// The live database handle is closed before the swap and left closed.
    ///
    /// A pre-restore copy left behind by a failed rollback blocks further
    /// restores with [`BackupError::RecoveryPending`] until it is dealt with.
    pub fn restore_backup(&mut self, target: &str) -> Result<(), BackupError> {
        let (backup, format) = self.resolve(target)?;

        let live = self.live_path().to_path_buf();
        let safety = sibling(&live, SAFETY_SUFFIX);
        if fs::symlink_metadata(&safety).is_ok() {
            return Err(BackupError::RecoveryPending(safety));
        }

        self.emit(Event::RestoreStarted {
            target: target.to_string(),
            path: backup.clone(),
        });

        let snapshot = if live.is_file() {
            fs::copy(&live, &safety)
                .map_err(|e| BackupError::io("save pre-restore copy to", &safety, e))?;
            self.emit(Event::SafetySnapshotTaken { path: safety.clone() });
            Some(safety)
        } else {
            None
        };

        match self.swap(&backup, format, &live) {
            Ok(()) => {
                if let Some(safety) = &snapshot {
                    if let Err(e) = fs::remove_file(safety) {
                        tracing::warn!(path = %safety.display(), error = %e, "could not remove pre-restore copy");
                    }
                }
                self.emit(Event::RestoreCompleted { path: backup });
                Ok(())
            }
            Err(err) => self.roll_back(err, snapshot, &live),
        }
    }

    /// Registry name first, then the target as a path, then the same stem in
    /// the backups directory. Each candidate is also tried with the legacy
    /// extension. A registered file restores in its recorded format; anything
    /// else is judged by extension.
    fn resolve(&self, target: &str) -> Result<(PathBuf, BackupFormat), BackupError> {
        let records = self.registry.load();
        let mut candidates: Vec<PathBuf> = Vec::new();

        if let Some(record) = records.iter().find(|r| r.name == target) {
            candidates.push(record.path.clone());
        }
        candidates.push(PathBuf::from(target));
        candidates.push(
            self.paths
                .backups_dir
                .join(format!("{target}.{CURRENT_EXTENSION}")),
        );

        let legacy: Vec<PathBuf> = candidates
            .iter()
            .map(|p| p.with_extension(LEGACY_EXTENSION))
            .collect();
        candidates.extend(legacy);

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .map(|p| {
                let format = records
                    .iter()
                    .find(|r| r.path == p)
                    .map(BackupRecord::format)
                    .unwrap_or_else(|| BackupFormat::from_path(&p));
                (p, format)
            })
            .ok_or_else(|| BackupError::NotFound(target.to_string()))
    }

    fn swap(&mut self, backup: &Path, format: BackupFormat, live: &Path) -> Result<(), BackupError> {
        self.live.close()?;
        match format {
            BackupFormat::Current => replace_file(backup, live),
            BackupFormat::Legacy => legacy::restore_legacy(backup, live),
        }
    }

    fn roll_back(
        &self,
        err: BackupError,
        snapshot: Option<PathBuf>,
        live: &Path,
    ) -> Result<(), BackupError> {
        let result = match &snapshot {
            Some(safety) => fs::copy(safety, live).map(|_| ()),
            // there was no live database before; don't leave a partial one
            None => match fs::remove_file(live) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };

        match result {
            Ok(()) => {
                if let Some(safety) = &snapshot {
                    if let Err(e) = fs::remove_file(safety) {
                        tracing::warn!(path = %safety.display(), error = %e, "could not remove pre-restore copy");
                    }
                }
                self.emit(Event::RestoreRolledBack {
                    error: err.to_string(),
                });
                Err(BackupError::RestoreRolledBack {
                    source: Box::new(err),
                })
            }
            Err(rollback) => {
                self.emit(Event::RollbackFailed {
                    error: rollback.to_string(),
                    snapshot: snapshot.clone().unwrap_or_default(),
                });
                Err(BackupError::RollbackFailed {
                    restore: Box::new(err),
                    rollback,
                    snapshot,
                })
            }
        }
    }
}

/// Copy `source` next to `target` and rename it into place.
fn replace_file(source: &Path, target: &Path) -> Result<(), BackupError> {
    let incoming = sibling(target, INCOMING_SUFFIX);
    fs::copy(source, &incoming).map_err(|e| {
        let _ = fs::remove_file(&incoming);
        BackupError::io("stage backup at", &incoming, e)
    })?;
    fs::rename(&incoming, target).map_err(|e| {
        let _ = fs::remove_file(&incoming);
        BackupError::io("replace live database", target, e)
    })
}
