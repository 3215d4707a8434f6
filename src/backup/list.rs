use std::collections::HashSet;

use super::{BackupManager, BackupRecord, BackupView};
use crate::error::BackupError;
use crate::events::Event;

impl BackupManager {
    /// Registered backups whose files still exist, most recently added first.
    ///
    /// Drops records whose file is gone and repeated names (the first one
    /// wins), and writes the cleaned registry back when anything changed.
    pub fn list_records(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let loaded = self.registry.load();

        let mut seen = HashSet::new();
        let records: Vec<BackupRecord> = loaded
            .iter()
            .filter(|record| record.is_valid())
            .filter(|record| seen.insert(record.name.as_str()))
            .cloned()
            .collect();

        if records != loaded {
            self.registry.save(&records)?;
            self.emit(Event::RegistryRepaired {
                removed: loaded.len() - records.len(),
            });
        }

        Ok(records)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupView>, BackupError> {
        Ok(self
            .list_records()?
            .into_iter()
            .map(BackupView::from)
            .collect())
    }
}
