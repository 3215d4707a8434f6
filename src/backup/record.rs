use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::format_bytes;

pub const CURRENT_EXTENSION: &str = "db";
pub const LEGACY_EXTENSION: &str = "json";
pub const DATABASE_TYPE: &str = "sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFormat {
    /// Direct copy of the live database file.
    Current,
    /// Multi-table JSON export written by older releases. Read only.
    Legacy,
}

impl BackupFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(LEGACY_EXTENSION) => BackupFormat::Legacy,
            _ => BackupFormat::Current,
        }
    }
}

/// One registry entry. Fields other than `name` and `path` default when
/// missing so registries written by older releases still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, alias = "size")]
    pub size_bytes: u64,
    #[serde(default, alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default = "default_database_type")]
    pub database_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_format: Option<BackupFormat>,
}

fn default_database_type() -> String {
    DATABASE_TYPE.to_string()
}

impl BackupRecord {
    pub fn format(&self) -> BackupFormat {
        self.backup_format
            .unwrap_or_else(|| BackupFormat::from_path(&self.path))
    }

    pub fn is_valid(&self) -> bool {
        self.path.is_file()
    }
}

/// A record as shown to the command layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupView {
    #[serde(flatten)]
    pub record: BackupRecord,
    pub formatted_size: String,
    pub is_current_format: bool,
    pub is_legacy_format: bool,
}

impl From<BackupRecord> for BackupView {
    fn from(record: BackupRecord) -> Self {
        let format = record.format();
        BackupView {
            formatted_size: format_bytes(record.size_bytes),
            is_current_format: format == BackupFormat::Current,
            is_legacy_format: format == BackupFormat::Legacy,
            record,
        }
    }
}
