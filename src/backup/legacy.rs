//! Restore from the JSON export written by older releases.
//!
//! The export is an object of tables, each a list of row objects:
//!
//! ```json
//! { "patients": [ { "id": 1, "name": "Ada" } ], "appointments": [] }
//! ```
//!
//! optionally wrapped as `{ "tables": { ... } }`. Keys whose value is not a
//! list are export metadata and are skipped. Each table becomes an untyped
//! SQLite table with the union of its rows' keys as columns; nested objects
//! and arrays are stored as JSON text.

use std::fs;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};

use super::{sibling, LEGACY_IMPORT_SUFFIX};
use crate::error::BackupError;

type Row = Map<String, Value>;

pub(super) fn restore_legacy(export: &Path, live: &Path) -> Result<(), BackupError> {
    let contents = fs::read_to_string(export)
        .map_err(|e| BackupError::io("read legacy backup", export, e))?;
    let document: Value = serde_json::from_str(&contents)
        .map_err(|e| BackupError::LegacyFormat(e.to_string()))?;
    let tables = parse_tables(&document)?;

    let staging = sibling(live, LEGACY_IMPORT_SUFFIX);
    let _ = fs::remove_file(&staging);

    if let Err(e) = write_database(&staging, &tables) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, live).map_err(|e| {
        let _ = fs::remove_file(&staging);
        BackupError::io("replace live database", live, e)
    })
}

fn parse_tables(document: &Value) -> Result<Vec<(String, Vec<&Row>)>, BackupError> {
    let root = document
        .as_object()
        .ok_or_else(|| BackupError::LegacyFormat("expected an object of tables".into()))?;
    let root = match root.get("tables").and_then(Value::as_object) {
        Some(inner) => inner,
        None => root,
    };

    let mut tables = Vec::new();
    for (name, value) in root {
        let Some(rows) = value.as_array() else {
            tracing::debug!(key = %name, "skipping non-table key in legacy backup");
            continue;
        };
        let rows = rows
            .iter()
            .map(|row| {
                row.as_object().ok_or_else(|| {
                    BackupError::LegacyFormat(format!("table {name} has a row that is not an object"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        tables.push((name.clone(), rows));
    }

    if tables.is_empty() {
        return Err(BackupError::LegacyFormat("no tables found".into()));
    }
    Ok(tables)
}

fn write_database(path: &Path, tables: &[(String, Vec<&Row>)]) -> Result<(), BackupError> {
    let mut conn = Connection::open(path)?;
    let tx = conn.transaction()?;

    for (table, rows) in tables {
        let mut columns: Vec<&str> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
        if columns.is_empty() {
            // nothing to infer a schema from
            continue;
        }

        let column_list = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
        tx.execute(&format!("CREATE TABLE {} ({column_list})", quote(table)), [])?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote(table)
        ))?;
        for row in rows {
            stmt.execute(params_from_iter(columns.iter().map(|c| to_sql(row.get(*c)))))?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}
