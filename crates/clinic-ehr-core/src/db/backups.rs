//! Backup log and schedule database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{require_found, Database, DbResult};
use crate::models::{BackupLog, BackupSchedule};

const BACKUP_LOG_COLUMNS: &str = r#"
    id, file_name, kind, status, size_bytes, checksum, schedule_id, error, created_at
"#;

const BACKUP_SCHEDULE_COLUMNS: &str = r#"
    id, name, frequency, time_of_day, weekday, day_of_month, enabled, last_run_at, created_at
"#;

fn backup_log_from_row(row: &Row<'_>) -> rusqlite::Result<BackupLog> {
    Ok(BackupLog {
        id: row.get(0)?,
        file_name: row.get(1)?,
        kind: row.get(2)?,
        status: row.get(3)?,
        size_bytes: row.get(4)?,
        checksum: row.get(5)?,
        schedule_id: row.get(6)?,
        error: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn backup_schedule_from_row(row: &Row<'_>) -> rusqlite::Result<BackupSchedule> {
    Ok(BackupSchedule {
        id: row.get(0)?,
        name: row.get(1)?,
        frequency: row.get(2)?,
        time_of_day: row.get(3)?,
        weekday: row.get(4)?,
        day_of_month: row.get(5)?,
        enabled: row.get(6)?,
        last_run_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    // ========================================================================
    // Backup logs
    // ========================================================================

    pub fn insert_backup_log(&self, log: &BackupLog) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO backup_logs ({BACKUP_LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                log.id,
                log.file_name,
                log.kind,
                log.status,
                log.size_bytes,
                log.checksum,
                log.schedule_id,
                log.error,
                log.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_backup_log(&self, id: &str) -> DbResult<Option<BackupLog>> {
        self.conn
            .query_row(
                &format!("SELECT {BACKUP_LOG_COLUMNS} FROM backup_logs WHERE id = ?"),
                [id],
                backup_log_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Every backup attempt, newest first.
    pub fn list_backup_logs(&self) -> DbResult<Vec<BackupLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BACKUP_LOG_COLUMNS} FROM backup_logs ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], backup_log_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_backup_log(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM backup_logs WHERE id = ?", [id])?;
        require_found(rows_affected, "Backup log", id)
    }

    // ========================================================================
    // Backup schedules
    // ========================================================================

    pub fn insert_backup_schedule(&self, schedule: &BackupSchedule) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO backup_schedules ({BACKUP_SCHEDULE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                schedule.id,
                schedule.name,
                schedule.frequency,
                schedule.time_of_day,
                schedule.weekday,
                schedule.day_of_month,
                schedule.enabled,
                schedule.last_run_at,
                schedule.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_backup_schedule(&self, schedule: &BackupSchedule) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE backup_schedules SET
                name = ?2,
                frequency = ?3,
                time_of_day = ?4,
                weekday = ?5,
                day_of_month = ?6,
                enabled = ?7
            WHERE id = ?1
            "#,
            params![
                schedule.id,
                schedule.name,
                schedule.frequency,
                schedule.time_of_day,
                schedule.weekday,
                schedule.day_of_month,
                schedule.enabled,
            ],
        )?;
        require_found(rows_affected, "Backup schedule", &schedule.id)
    }

    pub fn get_backup_schedule(&self, id: &str) -> DbResult<Option<BackupSchedule>> {
        self.conn
            .query_row(
                &format!("SELECT {BACKUP_SCHEDULE_COLUMNS} FROM backup_schedules WHERE id = ?"),
                [id],
                backup_schedule_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_backup_schedules(&self) -> DbResult<Vec<BackupSchedule>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BACKUP_SCHEDULE_COLUMNS} FROM backup_schedules ORDER BY name"
        ))?;
        let rows = stmt.query_map([], backup_schedule_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_backup_schedule(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM backup_schedules WHERE id = ?", [id])?;
        require_found(rows_affected, "Backup schedule", id)
    }

    /// Stamp the time a schedule last fired.
    pub fn touch_schedule_last_run(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE backup_schedules SET last_run_at = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        require_found(rows_affected, "Backup schedule", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use crate::models::{
        BackupFrequency, BackupKind, BackupScheduleInput, BackupStatus,
    };
    use chrono::{Duration, NaiveTime};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn log(file_name: &str, created_at: DateTime<Utc>) -> BackupLog {
        BackupLog {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            kind: BackupKind::Manual,
            status: BackupStatus::Success,
            size_bytes: 1024,
            checksum: Some("abc".into()),
            schedule_id: None,
            error: None,
            created_at,
        }
    }

    fn schedule() -> BackupSchedule {
        BackupSchedule::new(BackupScheduleInput {
            name: "Nightly".into(),
            frequency: BackupFrequency::Daily,
            time_of_day: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            weekday: None,
            day_of_month: None,
            enabled: true,
        })
    }

    #[test]
    fn test_logs_newest_first() {
        let db = setup_db();
        let now = Utc::now();
        db.insert_backup_log(&log("old.json", now - Duration::days(1))).unwrap();
        db.insert_backup_log(&log("new.json", now)).unwrap();

        let logs = db.list_backup_logs().unwrap();
        assert_eq!(logs[0].file_name, "new.json");
        assert_eq!(logs[1].file_name, "old.json");
    }

    #[test]
    fn test_delete_log() {
        let db = setup_db();
        let entry = log("a.json", Utc::now());
        db.insert_backup_log(&entry).unwrap();
        assert_eq!(db.get_backup_log(&entry.id).unwrap().unwrap(), entry);
        db.delete_backup_log(&entry.id).unwrap();
        assert!(matches!(
            db.delete_backup_log(&entry.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_schedule_crud() {
        let db = setup_db();
        let mut s = schedule();
        db.insert_backup_schedule(&s).unwrap();
        assert_eq!(db.get_backup_schedule(&s.id).unwrap().unwrap(), s);

        s.enabled = false;
        db.update_backup_schedule(&s).unwrap();
        assert!(!db.get_backup_schedule(&s.id).unwrap().unwrap().enabled);

        let at = Utc::now();
        db.touch_schedule_last_run(&s.id, at).unwrap();
        assert_eq!(
            db.get_backup_schedule(&s.id).unwrap().unwrap().last_run_at,
            Some(at)
        );

        db.delete_backup_schedule(&s.id).unwrap();
        assert!(db.list_backup_schedules().unwrap().is_empty());
    }

    #[test]
    fn test_deleting_schedule_keeps_logs() {
        let db = setup_db();
        let s = schedule();
        db.insert_backup_schedule(&s).unwrap();
        let mut entry = log("a.json", Utc::now());
        entry.schedule_id = Some(s.id.clone());
        entry.kind = BackupKind::Scheduled;
        db.insert_backup_log(&entry).unwrap();

        db.delete_backup_schedule(&s.id).unwrap();
        assert_eq!(db.get_backup_log(&entry.id).unwrap().unwrap().schedule_id, None);
    }
}
