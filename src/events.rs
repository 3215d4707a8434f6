//! Backup lifecycle events.
//!
//! Operations report what they did through an [`EventSink`] instead of
//! printing. The binary uses [`TracingSink`]; tests use [`MemorySink`] and
//! assert on the recorded events.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BackupCreated { name: String, path: PathBuf, size_bytes: u64 },
    BackupDeleted { name: String },
    RegistryRepaired { removed: usize },
    OrphanAdopted { name: String, path: PathBuf },
    RestoreStarted { target: String, path: PathBuf },
    SafetySnapshotTaken { path: PathBuf },
    RestoreCompleted { path: PathBuf },
    RestoreRolledBack { error: String },
    RollbackFailed { error: String, snapshot: PathBuf },
    PruneFailed { name: String, error: String },
    PruneCompleted { deleted: usize, kept: usize },
    ScheduleStarted { interval: Duration },
    ScheduledRunFailed { error: String },
    ScheduleStopped,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BackupCreated { .. } => "backup_created",
            Event::BackupDeleted { .. } => "backup_deleted",
            Event::RegistryRepaired { .. } => "registry_repaired",
            Event::OrphanAdopted { .. } => "orphan_adopted",
            Event::RestoreStarted { .. } => "restore_started",
            Event::SafetySnapshotTaken { .. } => "safety_snapshot_taken",
            Event::RestoreCompleted { .. } => "restore_completed",
            Event::RestoreRolledBack { .. } => "restore_rolled_back",
            Event::RollbackFailed { .. } => "rollback_failed",
            Event::PruneFailed { .. } => "prune_failed",
            Event::PruneCompleted { .. } => "prune_completed",
            Event::ScheduleStarted { .. } => "schedule_started",
            Event::ScheduledRunFailed { .. } => "scheduled_run_failed",
            Event::ScheduleStopped => "schedule_stopped",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        let kind = event.name();
        match event {
            Event::BackupCreated { name, path, size_bytes } => {
                tracing::info!(event = kind, %name, path = %path.display(), size_bytes, "backup created");
            }
            Event::BackupDeleted { name } => {
                tracing::info!(event = kind, %name, "backup deleted");
            }
            Event::RegistryRepaired { removed } => {
                tracing::info!(event = kind, removed, "removed stale registry entries");
            }
            Event::OrphanAdopted { name, path } => {
                tracing::info!(event = kind, %name, path = %path.display(), "registered untracked backup");
            }
            Event::RestoreStarted { target, path } => {
                tracing::info!(event = kind, %target, path = %path.display(), "restoring backup");
            }
            Event::SafetySnapshotTaken { path } => {
                tracing::debug!(event = kind, path = %path.display(), "saved pre-restore copy");
            }
            Event::RestoreCompleted { path } => {
                tracing::info!(event = kind, path = %path.display(), "restore complete");
            }
            Event::RestoreRolledBack { error } => {
                tracing::warn!(event = kind, %error, "restore failed, live database rolled back");
            }
            Event::RollbackFailed { error, snapshot } => {
                tracing::error!(event = kind, %error, snapshot = %snapshot.display(), "rollback failed");
            }
            Event::PruneFailed { name, error } => {
                tracing::warn!(event = kind, %name, %error, "failed to delete old backup");
            }
            Event::PruneCompleted { deleted, kept } => {
                tracing::info!(event = kind, deleted, kept, "retention applied");
            }
            Event::ScheduleStarted { interval } => {
                tracing::info!(event = kind, interval = %humantime::format_duration(*interval), "automatic backups scheduled");
            }
            Event::ScheduledRunFailed { error } => {
                tracing::error!(event = kind, %error, "scheduled backup failed");
            }
            Event::ScheduleStopped => {
                tracing::info!(event = kind, "automatic backups stopped");
            }
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
