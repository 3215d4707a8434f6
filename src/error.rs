use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("source database missing: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("backup not found: {0}")]
    NotFound(String),

    #[error("backup destination {} is the live database or one of its restore files", .0.display())]
    ReservedDestination(PathBuf),

    /// A safety snapshot from a failed rollback is still on disk.
    #[error(
        "a pre-restore copy from an earlier failed restore is still at {}; \
         put it back or remove it before restoring again",
        .0.display()
    )]
    RecoveryPending(PathBuf),

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("registry serialization failed: {0}")]
    Registry(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed legacy backup: {0}")]
    LegacyFormat(String),

    #[error("restore failed, live database was rolled back and preserved: {source}")]
    RestoreRolledBack {
        #[source]
        source: Box<BackupError>,
    },

    /// The live database may be corrupt. When a safety snapshot was taken it
    /// is kept at `snapshot` so an operator can put it back by hand.
    #[error("restore failed ({restore}) and rollback failed ({rollback}){}", snapshot_hint(.snapshot))]
    RollbackFailed {
        restore: Box<BackupError>,
        rollback: io::Error,
        snapshot: Option<PathBuf>,
    },

    #[error("failed to start scheduler thread: {0}")]
    SchedulerSpawn(#[source] io::Error),

    #[error("could not determine data directory")]
    DataDir,

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("backup manager lock poisoned")]
    ManagerPoisoned,
}

fn snapshot_hint(snapshot: &Option<PathBuf>) -> String {
    snapshot
        .as_ref()
        .map(|p| format!("; pre-restore copy left at {}", p.display()))
        .unwrap_or_default()
}

impl BackupError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BackupError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// True only when the live database was left in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackupError::RollbackFailed { .. })
    }
}
