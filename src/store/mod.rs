//! Backup registry storage.
//!
//! The registry is the single record of which backups exist. Stores only
//! read and replace the whole list:
//! - `load` never fails; a missing or unreadable registry is empty
//! - `save` replaces everything that was there
//!
//! Deduplication, validity and retention rules belong to the backup
//! operations, not to the store.

mod registry;

pub use registry::{JsonFileRegistry, MemoryRegistry};

use crate::backup::BackupRecord;
use crate::error::BackupError;

pub trait RegistryStore: Send {
    fn load(&self) -> Vec<BackupRecord>;
    fn save(&self, records: &[BackupRecord]) -> Result<(), BackupError>;
}
