//! Whole-database JSON snapshots.
//!
//! A snapshot holds every row of the clinical and settings tables
//! ([`SNAPSHOT_TABLES`]) keyed by column name. Backup bookkeeping and calendar
//! credentials are not part of a snapshot, so restoring one never rewinds the
//! backup history itself.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{BackupError, BackupResult};
use crate::db::{Database, SNAPSHOT_TABLES};

/// Current snapshot document version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One table row, column name to value.
pub type SnapshotRow = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, Vec<SnapshotRow>>,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestoreSummary {
    pub tables: usize,
    pub rows: usize,
}

/// Hex SHA-256 of the given bytes.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Object name for a backup taken at `at`: `backup-YYYYMMDD-HHMMSS.json`.
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("backup-{}.json", at.format("%Y%m%d-%H%M%S"))
}

impl Snapshot {
    /// Read every snapshot table.
    pub fn capture(db: &Database, at: DateTime<Utc>) -> BackupResult<Self> {
        let conn = db.conn();
        let mut tables = BTreeMap::new();
        for table in SNAPSHOT_TABLES {
            tables.insert(table.to_string(), read_table(conn, table)?);
        }
        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: at,
            tables,
        })
    }

    pub fn to_bytes(&self) -> BackupResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and sanity-check a stored snapshot.
    pub fn from_bytes(bytes: &[u8]) -> BackupResult<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(BackupError::InvalidSnapshot(format!(
                "unsupported format version {}",
                snapshot.format_version
            )));
        }
        if let Some(unknown) = snapshot
            .tables
            .keys()
            .find(|name| !SNAPSHOT_TABLES.contains(&name.as_str()))
        {
            return Err(BackupError::InvalidSnapshot(format!("unknown table {unknown}")));
        }
        Ok(snapshot)
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Replace the contents of every snapshot table, in one transaction.
    ///
    /// Tables absent from the snapshot end up empty.
    pub fn restore_into(&self, db: &mut Database) -> BackupResult<RestoreSummary> {
        let tx = db.transaction()?;
        tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;

        for table in SNAPSHOT_TABLES.iter().rev() {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        let mut rows = 0;
        for table in SNAPSHOT_TABLES {
            let Some(table_rows) = self.tables.get(*table) else {
                continue;
            };
            let known = table_columns(&tx, table)?;
            for row in table_rows {
                insert_row(&tx, table, &known, row)?;
                rows += 1;
            }
        }

        tx.commit()?;
        Ok(RestoreSummary {
            tables: SNAPSHOT_TABLES.len(),
            rows,
        })
    }
}

fn read_table(conn: &Connection, table: &str) -> BackupResult<Vec<SnapshotRow>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {table} ORDER BY rowid"))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Map::new();
        for (i, column) in columns.iter().enumerate() {
            map.insert(column.clone(), to_json(row.get_ref(i)?));
        }
        out.push(map);
    }
    Ok(out)
}

fn table_columns(conn: &Connection, table: &str) -> BackupResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names
        .collect::<Result<HashSet<_>, _>>()
        .map_err(Into::into)
}

fn insert_row(
    conn: &Connection,
    table: &str,
    known: &HashSet<String>,
    row: &SnapshotRow,
) -> BackupResult<()> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row {
        if !known.contains(column) {
            return Err(BackupError::InvalidSnapshot(format!(
                "unknown column {table}.{column}"
            )));
        }
        columns.push(column.as_str());
        values.push(from_json(value)?);
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        ),
        params_from_iter(values.iter()),
    )?;
    Ok(())
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

fn from_json(value: &Value) -> BackupResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(SqlValue::Integer(i)),
            (None, Some(f)) => Ok(SqlValue::Real(f)),
            _ => Err(BackupError::InvalidSnapshot(format!("unsupported number {n}"))),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(BackupError::InvalidSnapshot(
            "nested values are not valid column data".into(),
        )),
    }
}
