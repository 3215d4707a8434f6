//! Backup operations over the live database file.
//!
//! [`BackupManager`] owns everything an operation touches: the live database
//! path, the backups directory, the registry store, the event sink and the
//! application's handle on the live database.
//!
//! Operations are synchronous and must not overlap. Nothing here locks the
//! registry or the live file; callers serialize access, for example by
//! sharing the manager behind a `Mutex` as the scheduler does. A restore in
//! progress always runs to completion or rollback before returning.

mod adopt;
mod create;
mod delete;
mod legacy;
mod list;
mod prune;
mod record;
mod restore;

pub use prune::PruneReport;
pub use record::{BackupFormat, BackupRecord, BackupView, CURRENT_EXTENSION, LEGACY_EXTENSION};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{Config, CopyMode, Paths};
use crate::error::BackupError;
use crate::events::{Event, EventSink, TracingSink};
use crate::platform::{self, Platform};
use crate::store::{JsonFileRegistry, RegistryStore};

/// Registry cap; the oldest entries are dropped beyond this.
pub const MAX_REGISTRY_ENTRIES: usize = 50;

/// The application's open handle on the live database.
///
/// Restore calls `close` before overwriting the file. Reopening afterwards
/// is up to the caller.
pub trait LiveDatabase: Send {
    fn close(&mut self) -> Result<(), BackupError>;
}

/// Used when nothing in this process holds the live database open.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl LiveDatabase for Detached {
    fn close(&mut self) -> Result<(), BackupError> {
        Ok(())
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

pub struct BackupManager {
    paths: Paths,
    copy_mode: CopyMode,
    platform: Platform,
    registry: Box<dyn RegistryStore>,
    events: Arc<dyn EventSink>,
    live: Box<dyn LiveDatabase>,
    clock: Clock,
}

impl BackupManager {
    pub fn new(paths: Paths) -> Self {
        let registry = JsonFileRegistry::new(&paths.registry);
        BackupManager {
            paths,
            copy_mode: CopyMode::default(),
            platform: platform::detect(),
            registry: Box::new(registry),
            events: Arc::new(TracingSink),
            live: Box::new(Detached),
            clock: Box::new(Utc::now),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        BackupManager::new(config.paths.clone()).with_copy_mode(config.copy_mode)
    }

    pub fn with_registry(mut self, registry: impl RegistryStore + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_live_database(mut self, live: impl LiveDatabase + 'static) -> Self {
        self.live = Box::new(live);
        self
    }

    pub fn with_copy_mode(mut self, mode: CopyMode) -> Self {
        self.copy_mode = mode;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn events(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.events)
    }

    fn emit(&self, event: Event) {
        self.events.emit(&event);
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn live_path(&self) -> &Path {
        &self.paths.database
    }

    /// Insert at the head, replacing any record with the same name.
    fn upsert(&self, record: BackupRecord) -> Result<(), BackupError> {
        let mut records = self.registry.load();
        records.retain(|r| r.name != record.name);
        records.insert(0, record);
        records.truncate(MAX_REGISTRY_ENTRIES);
        self.registry.save(&records)
    }
}

/// Files restore writes next to the live database.
const SAFETY_SUFFIX: &str = "restore-safety";
const INCOMING_SUFFIX: &str = "restore-incoming";
const LEGACY_IMPORT_SUFFIX: &str = "legacy-import";

/// The live database and the restore files beside it; backups must never
/// be written to any of these.
fn reserved_paths(live: &Path) -> [PathBuf; 4] {
    [
        live.to_path_buf(),
        sibling(live, SAFETY_SUFFIX),
        sibling(live, INCOMING_SUFFIX),
        sibling(live, LEGACY_IMPORT_SUFFIX),
    ]
}

/// `clinic.db` + `restore-safety` -> `clinic.db.restore-safety`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::events::MemorySink;
    use crate::store::MemoryRegistry;
    use std::fs;
    use tempfile::TempDir;

    pub struct Fixture {
        pub dir: TempDir,
        pub sink: Arc<MemorySink>,
        pub manager: BackupManager,
    }

    /// Data dir with a live database holding `contents` and an in-memory registry.
    pub fn fixture(contents: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::under(dir.path());
        fs::write(&paths.database, contents).unwrap();

        let sink = Arc::new(MemorySink::new());
        let manager = BackupManager::new(paths)
            .with_registry(MemoryRegistry::new())
            .with_events(sink.clone());

        Fixture { dir, sink, manager }
    }
}
