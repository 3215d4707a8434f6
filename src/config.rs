//! Paths and settings, from `~/.config/clinic-backup/config.toml` (or the
//! platform equivalent) when present. Every key is optional:
//!
//! ```toml
//! data_dir = "/srv/clinic"       # default: platform data dir
//! database = "clinic.db"         # relative paths resolve against data_dir
//! backups_dir = "backups"
//! registry = "backups.json"
//! copy_mode = "online"           # "raw" (default) or "online"
//! schedule = "daily"             # hourly, daily, weekly or a duration like "6h"
//! keep = 10
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BackupError;
use crate::schedule::{Frequency, DEFAULT_KEEP_COUNT};

const APP_NAME: &str = "clinic-backup";

/// How the live database is copied when a backup is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Byte-for-byte file copy. A write in flight can produce a torn copy.
    #[default]
    Raw,
    /// SQLite online backup API; consistent while the application writes.
    Online,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub database: PathBuf,
    pub backups_dir: PathBuf,
    pub registry: PathBuf,
}

impl Paths {
    /// Default layout inside a data directory.
    pub fn under(data_dir: &Path) -> Self {
        Paths {
            database: data_dir.join("clinic.db"),
            backups_dir: data_dir.join("backups"),
            registry: data_dir.join("backups.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    pub copy_mode: CopyMode,
    pub schedule: Frequency,
    pub keep: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    database: Option<PathBuf>,
    backups_dir: Option<PathBuf>,
    registry: Option<PathBuf>,
    copy_mode: Option<CopyMode>,
    schedule: Option<String>,
    keep: Option<usize>,
}

/// Platform data directory (~/.local/share/clinic-backup on Linux).
pub fn default_data_dir() -> Result<PathBuf, BackupError> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(BackupError::DataDir)
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Defaults for a data directory, ignoring any config file.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Config {
            paths: Paths::under(data_dir),
            copy_mode: CopyMode::default(),
            schedule: Frequency::Daily,
            keep: DEFAULT_KEEP_COUNT,
        }
    }

    /// Load `explicit`, or the default config file if it exists.
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, BackupError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let text = match &path {
            Some(path) => match fs::read_to_string(path) {
                Ok(text) => Some(text),
                Err(e) if e.kind() == io::ErrorKind::NotFound && explicit.is_none() => None,
                Err(e) => return Err(BackupError::io("read config", path, e)),
            },
            None => None,
        };

        match (text, path) {
            (Some(text), Some(path)) => Config::from_toml(&text, &path),
            _ => Ok(Config::with_data_dir(&default_data_dir()?)),
        }
    }

    pub fn from_toml(text: &str, source: &Path) -> Result<Self, BackupError> {
        let file: FileConfig = toml::from_str(text).map_err(|e| BackupError::Config {
            path: source.to_path_buf(),
            message: e.message().to_string(),
        })?;

        let data_dir = match file.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let defaults = Paths::under(&data_dir);
        let resolve = |value: Option<PathBuf>, default: PathBuf| match value {
            Some(p) if p.is_relative() => data_dir.join(p),
            Some(p) => p,
            None => default,
        };

        let schedule = match file.schedule {
            Some(s) => s.parse().map_err(|message| BackupError::Config {
                path: source.to_path_buf(),
                message,
            })?,
            None => Frequency::Daily,
        };

        Ok(Config {
            paths: Paths {
                database: resolve(file.database, defaults.database),
                backups_dir: resolve(file.backups_dir, defaults.backups_dir),
                registry: resolve(file.registry, defaults.registry),
            },
            copy_mode: file.copy_mode.unwrap_or_default(),
            schedule,
            keep: file.keep.unwrap_or(DEFAULT_KEEP_COUNT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn relative_paths_resolve_against_data_dir() {
        let config = Config::from_toml(
            r#"
                data_dir = "/srv/clinic"
                database = "live/clinic.db"
                registry = "/etc/clinic/backups.json"
                copy_mode = "online"
                schedule = "6h"
                keep = 3
            "#,
            Path::new("config.toml"),
        )
        .unwrap();

        assert_eq!(config.paths.database, PathBuf::from("/srv/clinic/live/clinic.db"));
        assert_eq!(config.paths.backups_dir, PathBuf::from("/srv/clinic/backups"));
        assert_eq!(config.paths.registry, PathBuf::from("/etc/clinic/backups.json"));
        assert_eq!(config.copy_mode, CopyMode::Online);
        assert_eq!(config.schedule, Frequency::Every(Duration::from_secs(6 * 3600)));
        assert_eq!(config.keep, 3);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = Config::from_toml("data_dir = \"/srv/clinic\"", Path::new("c.toml")).unwrap();
        assert_eq!(config.paths, Paths::under(Path::new("/srv/clinic")));
        assert_eq!(config.copy_mode, CopyMode::Raw);
        assert_eq!(config.schedule, Frequency::Daily);
        assert_eq!(config.keep, DEFAULT_KEEP_COUNT);
    }

    #[test]
    fn unknown_keys_and_bad_schedule_are_rejected() {
        let err = Config::from_toml("data_dir = \"/x\"\nbogus = 1", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, BackupError::Config { .. }));

        let err = Config::from_toml("data_dir = \"/x\"\nschedule = \"sometimes\"", Path::new("c.toml")).unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, BackupError::Io { .. }));
    }
}
