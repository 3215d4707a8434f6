use serde::Serialize;

use super::BackupManager;
use crate::error::BackupError;
use crate::events::Event;

#[derive(Debug, Default, Serialize)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub errors: Vec<String>,
    pub kept: usize,
}

impl BackupManager {
    /// Keep the `keep` newest backups by creation time and delete the rest.
    ///
    /// A backup that can't be deleted is reported and skipped; the others
    /// are still pruned.
    pub fn prune(&self, keep: usize) -> Result<PruneReport, BackupError> {
        let mut records = self.list_records()?;
        // stable, so equal timestamps keep registry order
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut report = PruneReport {
            kept: records.len().min(keep),
            ..PruneReport::default()
        };

        for record in records.iter().skip(keep) {
            match self.delete_backup(&record.name) {
                Ok(()) => report.deleted.push(record.name.clone()),
                Err(e) => {
                    self.emit(Event::PruneFailed {
                        name: record.name.clone(),
                        error: e.to_string(),
                    });
                    report.errors.push(format!("failed to delete {}: {e}", record.name));
                }
            }
        }

        self.emit(Event::PruneCompleted {
            deleted: report.deleted.len(),
            kept: report.kept,
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::fixture;
    use crate::events::Event;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    #[test]
    fn keeps_newest_by_creation_time() {
        let fx = fixture(b"db");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(Mutex::new(t0));
        let tick = Arc::clone(&clock);
        let manager = fx.manager.with_clock(move || *tick.lock().unwrap());

        for _ in 0..15 {
            manager.create_backup(None).unwrap();
            *clock.lock().unwrap() += Duration::minutes(1);
        }

        let report = manager.prune(10).unwrap();

        assert_eq!(report.deleted.len(), 5);
        assert_eq!(report.kept, 10);
        assert!(report.errors.is_empty());

        let remaining = manager.list_records().unwrap();
        assert_eq!(remaining.len(), 10);
        let oldest_kept = remaining.iter().map(|r| r.created_at).min().unwrap();
        assert_eq!(oldest_kept, t0 + Duration::minutes(5));
    }

    #[test]
    fn keep_larger_than_count_deletes_nothing() {
        let fx = fixture(b"db");
        fx.manager.create_backup(None).unwrap();

        let report = fx.manager.prune(10).unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.kept, 1);
    }

    #[cfg(unix)]
    #[test]
    fn undeletable_backup_does_not_stop_pruning() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture(b"db");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(Mutex::new(t0));
        let tick = Arc::clone(&clock);
        let manager = fx.manager.with_clock(move || *tick.lock().unwrap());

        let locked_dir = fx.dir.path().join("locked");
        let stuck = manager.create_backup(Some(&locked_dir.join("stuck.db"))).unwrap();
        *clock.lock().unwrap() += Duration::minutes(1);
        manager.create_backup(None).unwrap();
        *clock.lock().unwrap() += Duration::minutes(1);
        manager.create_backup(None).unwrap();

        // removing a file needs write permission on its directory
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();
        let probe = locked_dir.join("probe");
        let enforced = fs::write(&probe, b"").is_err();

        let report = manager.prune(1).unwrap();
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();

        if !enforced {
            // running as root, permissions are not enforced
            return;
        }
        assert_eq!(report.deleted.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert!(stuck.exists());
        assert!(fx.sink.events().iter().any(|e| matches!(e, Event::PruneFailed { name, .. } if name == "stuck")));
    }
}
