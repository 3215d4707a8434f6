use std::fs;
use std::io;

use super::BackupManager;
use crate::error::BackupError;
use crate::events::Event;

impl BackupManager {
    /// Remove a backup's file and its registry record.
    pub fn delete_backup(&self, name: &str) -> Result<(), BackupError> {
        let mut records = self.registry.load();
        let Some(position) = records.iter().position(|r| r.name == name) else {
            return Err(BackupError::NotFound(name.to_string()));
        };
        let record = records.remove(position);

        match fs::remove_file(&record.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BackupError::io("delete backup", &record.path, e)),
        }

        records.retain(|r| r.name != name);
        self.registry.save(&records)?;

        self.emit(Event::BackupDeleted {
            name: name.to_string(),
        });
        Ok(())
    }
}
