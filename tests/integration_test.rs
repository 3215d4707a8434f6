use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use clinic_backup::backup::BackupManager;
use clinic_backup::config::{Config, Paths};
use clinic_backup::events::MemorySink;
use clinic_backup::store::{JsonFileRegistry, RegistryStore};
use clinic_backup::BackupError;
use tempfile::TempDir;

fn setup(contents: &[u8]) -> (TempDir, BackupManager) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_data_dir(dir.path());
    fs::write(&config.paths.database, contents).unwrap();
    let manager = BackupManager::from_config(&config).with_events(Arc::new(MemorySink::new()));
    (dir, manager)
}

fn with_minute_clock(manager: BackupManager, start: DateTime<Utc>) -> (BackupManager, Arc<Mutex<DateTime<Utc>>>) {
    let clock = Arc::new(Mutex::new(start));
    let tick = Arc::clone(&clock);
    (manager.with_clock(move || *tick.lock().unwrap()), clock)
}

#[test]
fn backup_then_restore_is_byte_identical() {
    let content: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    let (_dir, mut manager) = setup(&content);
    let live = manager.paths().database.clone();

    let backup = manager.create_backup(None).unwrap();
    fs::write(&live, b"overwritten by later edits").unwrap();
    manager.restore_backup(backup.to_str().unwrap()).unwrap();

    assert_eq!(fs::read(&live).unwrap(), content);
}

#[test]
fn registry_file_is_json_array_most_recent_first() {
    let (_dir, manager) = setup(b"db");
    let (manager, clock) = with_minute_clock(manager, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

    manager.create_backup(None).unwrap();
    *clock.lock().unwrap() += Duration::minutes(1);
    manager.create_backup(None).unwrap();

    let raw = fs::read_to_string(&manager.paths().registry).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "backup_2026-01-01T00-01-00-000Z");
    assert_eq!(entries[1]["name"], "backup_2026-01-01T00-00-00-000Z");
    assert_eq!(entries[0]["databaseType"], "sqlite");
}

#[test]
fn creating_same_name_twice_lists_once() {
    let (dir, manager) = setup(b"db");
    let target = dir.path().join("exports").join("before-upgrade.db");

    manager.create_backup(Some(&target)).unwrap();
    manager.create_backup(Some(&target)).unwrap();

    let views = manager.list_backups().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].record.name, "before-upgrade");
}

#[test]
fn stale_entries_are_removed_on_list() {
    let (_dir, manager) = setup(b"db");
    let (manager, clock) = with_minute_clock(manager, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let first = manager.create_backup(None).unwrap();
    *clock.lock().unwrap() += Duration::minutes(1);
    manager.create_backup(None).unwrap();

    fs::remove_file(&first).unwrap();

    let views = manager.list_backups().unwrap();
    assert_eq!(views.len(), 1);
    assert!(views.iter().all(|v| v.record.path != first));

    let persisted = JsonFileRegistry::new(&manager.paths().registry).load();
    assert_eq!(persisted.len(), 1);
}

#[test]
fn prune_fifteen_to_ten_deletes_five_oldest() {
    let (_dir, manager) = setup(b"db");
    let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
    let (manager, clock) = with_minute_clock(manager, t0);

    let mut paths = Vec::new();
    for _ in 0..15 {
        paths.push(manager.create_backup(None).unwrap());
        *clock.lock().unwrap() += Duration::minutes(1);
    }

    let report = manager.prune(10).unwrap();

    assert_eq!(report.deleted.len(), 5);
    for old in &paths[..5] {
        assert!(!old.exists());
    }
    for kept in &paths[5..] {
        assert!(kept.exists());
    }
    assert_eq!(manager.list_backups().unwrap().len(), 10);
}

#[test]
fn prune_keeps_last_three_of_five_newest_first() {
    let (_dir, manager) = setup(b"db");
    let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
    let (manager, clock) = with_minute_clock(manager, t0);

    for _ in 0..5 {
        manager.create_backup(None).unwrap();
        *clock.lock().unwrap() += Duration::minutes(1);
    }

    manager.prune(3).unwrap();

    let created: Vec<_> = manager
        .list_backups()
        .unwrap()
        .into_iter()
        .map(|v| v.record.created_at)
        .collect();
    assert_eq!(
        created,
        vec![t0 + Duration::minutes(4), t0 + Duration::minutes(3), t0 + Duration::minutes(2)]
    );
}

#[test]
fn custom_destination_creates_missing_directories() {
    let (dir, manager) = setup(b"db");
    let target = dir.path().join("no").join("such").join("dir").join("x");

    let path = manager.create_backup(Some(&target)).unwrap();

    assert_eq!(path, target);
    assert!(dir.path().join("no/such/dir").is_dir());
    assert_eq!(fs::read(&target).unwrap(), b"db");
}

#[test]
fn restoring_unknown_backup_leaves_live_database_alone() {
    let (_dir, mut manager) = setup(b"untouched");
    let live = manager.paths().database.clone();
    let before = fs::metadata(&live).unwrap();

    let err = manager.restore_backup("nonexistent").unwrap_err();

    assert!(matches!(err, BackupError::NotFound(_)));
    let after = fs::metadata(&live).unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(after.modified().unwrap(), before.modified().unwrap());
    assert_eq!(fs::read(&live).unwrap(), b"untouched");
}

#[test]
fn registry_written_by_older_release_still_lists() {
    let (_dir, manager) = setup(b"db");
    let backups = &manager.paths().backups_dir;
    fs::create_dir_all(backups).unwrap();
    let old = backups.join("backup_2019-06-01T10-00-00-000Z.json");
    fs::write(&old, r#"{"patients": []}"#).unwrap();
    let registry = format!(
        r#"[{{"name": "backup_2019-06-01T10-00-00-000Z", "path": {}, "size": 16}}]"#,
        serde_json::to_string(&old).unwrap()
    );
    fs::write(&manager.paths().registry, registry).unwrap();

    let views = manager.list_backups().unwrap();

    assert_eq!(views.len(), 1);
    assert!(views[0].is_legacy_format);
    assert_eq!(views[0].formatted_size, "16 B");
}

#[test]
fn default_layout_is_under_data_dir() {
    let paths = Paths::under(Path::new("/data"));
    assert_eq!(paths.database, Path::new("/data/clinic.db"));
    assert_eq!(paths.backups_dir, Path::new("/data/backups"));
    assert_eq!(paths.registry, Path::new("/data/backups.json"));
}
