pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod report;
pub mod schedule;
pub mod store;
pub mod util;

pub use backup::{BackupFormat, BackupManager, BackupRecord, BackupView, LiveDatabase};
pub use error::BackupError;
