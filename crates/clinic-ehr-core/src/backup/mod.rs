//! Database backups: snapshots, storage, schedules and retention.

mod retention;
mod schedule;
mod snapshot;
mod store;

pub use retention::*;
pub use snapshot::*;
pub use store::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{Database, DbError};
use crate::models::{BackupKind, BackupLog, BackupStatus};

/// Backup errors.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Backup directory error: {0}")]
    Boundary(#[from] strict_path::StrictPathError),

    #[error("Invalid backup name: {0}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// What a retention pass did.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetentionReport {
    pub kept: usize,
    /// File names removed from the store and the log
    pub pruned: Vec<String>,
    /// File names that could not be removed and were left for the next pass
    pub failed: Vec<String>,
}

/// Runs backups and restores against a database and a backup store.
pub struct BackupManager<'a> {
    db: &'a mut Database,
    store: &'a dyn BackupStore,
}

impl<'a> BackupManager<'a> {
    pub fn new(db: &'a mut Database, store: &'a dyn BackupStore) -> Self {
        Self { db, store }
    }

    /// Take a snapshot, upload it and log the attempt.
    ///
    /// A failed snapshot or upload is recorded as a failed log entry and
    /// returned as `Ok`; only failing to write the log itself is an error.
    pub fn run_backup(&self, kind: BackupKind, schedule_id: Option<&str>) -> BackupResult<BackupLog> {
        let now = Utc::now();
        let mut log = BackupLog {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: backup_file_name(now),
            kind,
            status: BackupStatus::Success,
            size_bytes: 0,
            checksum: None,
            schedule_id: schedule_id.map(str::to_string),
            error: None,
            created_at: now,
        };

        match self.write_snapshot(now) {
            Ok((file_name, size, sum)) => {
                info!(file = %file_name, size_bytes = size, kind = %kind, "Backup written");
                log.file_name = file_name;
                log.size_bytes = size;
                log.checksum = Some(sum);
            }
            Err(e) => {
                error!(error = %e, kind = %kind, "Backup failed");
                log.status = BackupStatus::Failed;
                log.error = Some(e.to_string());
            }
        }

        self.db.insert_backup_log(&log)?;
        Ok(log)
    }

    fn write_snapshot(&self, now: DateTime<Utc>) -> BackupResult<(String, i64, String)> {
        let bytes = Snapshot::capture(&*self.db, now)?.to_bytes()?;
        let file_name = self.unused_name(now)?;
        let sum = checksum(&bytes);
        self.store.put(&file_name, &bytes)?;
        Ok((file_name, bytes.len() as i64, sum))
    }

    /// `backup-YYYYMMDD-HHMMSS.json`, with a counter if that second is taken.
    fn unused_name(&self, now: DateTime<Utc>) -> BackupResult<String> {
        let base = backup_file_name(now);
        let existing = self.store.list()?;
        if !existing.contains(&base) {
            return Ok(base);
        }
        let stem = base.trim_end_matches(".json");
        let mut n = 1;
        loop {
            let candidate = format!("{stem}-{n}.json");
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Restore the database from a successful backup.
    ///
    /// The stored object must match the logged checksum. Backup logs and
    /// schedules are left as they are.
    pub fn restore(&mut self, log_id: &str) -> BackupResult<RestoreSummary> {
        let log = self
            .db
            .get_backup_log(log_id)?
            .ok_or_else(|| BackupError::NotFound(format!("backup {log_id}")))?;
        if !log.succeeded() {
            return Err(BackupError::InvalidSnapshot(format!(
                "backup {} failed and has nothing to restore",
                log.file_name
            )));
        }

        let bytes = self.store.get(&log.file_name)?;
        let actual = checksum(&bytes);
        if let Some(expected) = &log.checksum {
            if *expected != actual {
                warn!(file = %log.file_name, "Backup checksum mismatch");
                return Err(BackupError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let snapshot = Snapshot::from_bytes(&bytes)?;
        let summary = snapshot.restore_into(self.db)?;
        info!(
            file = %log.file_name,
            tables = summary.tables,
            rows = summary.rows,
            "Database restored from backup"
        );
        Ok(summary)
    }

    /// Run every enabled schedule that is due at `now`.
    ///
    /// Each due schedule is stamped with `now` whether or not its backup
    /// succeeded, so a failing target does not retrigger on every call.
    pub fn run_due(&self, now: DateTime<Utc>) -> BackupResult<Vec<BackupLog>> {
        let mut logs = Vec::new();
        for schedule in self.db.list_backup_schedules()? {
            if !schedule.enabled {
                continue;
            }
            if schedule.next_run_after(now).is_none() {
                warn!(schedule = %schedule.name, "Schedule has no valid fire time, skipping");
                continue;
            }
            if !schedule.is_due(now) {
                continue;
            }

            info!(schedule = %schedule.name, "Running scheduled backup");
            let log = self.run_backup(BackupKind::Scheduled, Some(&schedule.id))?;
            self.db.touch_schedule_last_run(&schedule.id, now)?;
            logs.push(log);
        }
        Ok(logs)
    }

    /// Prune backups outside `policy` from the store and the log.
    pub fn apply_retention(&self, policy: &RetentionPolicy) -> BackupResult<RetentionReport> {
        let logs = self.db.list_backup_logs()?;
        let plan = plan_retention(&logs, policy);

        let mut report = RetentionReport {
            kept: plan.keep.len(),
            ..Default::default()
        };
        for log in plan.prune {
            if log.succeeded() {
                if let Err(e) = self.store.delete(&log.file_name) {
                    warn!(file = %log.file_name, error = %e, "Could not delete pruned backup");
                    report.failed.push(log.file_name);
                    continue;
                }
            }
            self.db.delete_backup_log(&log.id)?;
            report.pruned.push(log.file_name);
        }

        info!(
            kept = report.kept,
            pruned = report.pruned.len(),
            failed = report.failed.len(),
            "Retention applied"
        );
        Ok(report)
    }
}
