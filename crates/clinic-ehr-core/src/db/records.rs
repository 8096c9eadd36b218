//! Medical record database operations.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::{require_found, Database, DbResult};
use crate::models::MedicalRecord;

const RECORD_COLUMNS: &str = r#"
    id, patient_id, doctor_id, appointment_id, visit_date, chief_complaint,
    diagnosis, treatment, notes, vitals, created_at, updated_at
"#;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecord> {
    let vitals_json: String = row.get(9)?;
    let vitals = serde_json::from_str(&vitals_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(MedicalRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        visit_date: row.get(4)?,
        chief_complaint: row.get(5)?,
        diagnosis: row.get(6)?,
        treatment: row.get(7)?,
        notes: row.get(8)?,
        vitals,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl Database {
    /// Insert a new medical record.
    pub fn insert_medical_record(&self, record: &MedicalRecord) -> DbResult<()> {
        let vitals_json = serde_json::to_string(&record.vitals)?;

        self.conn.execute(
            &format!(
                "INSERT INTO medical_records ({RECORD_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                record.id,
                record.patient_id,
                record.doctor_id,
                record.appointment_id,
                record.visit_date,
                record.chief_complaint,
                record.diagnosis,
                record.treatment,
                record.notes,
                vitals_json,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_medical_record(&self, record: &MedicalRecord) -> DbResult<()> {
        let vitals_json = serde_json::to_string(&record.vitals)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE medical_records SET
                patient_id = ?2,
                doctor_id = ?3,
                appointment_id = ?4,
                visit_date = ?5,
                chief_complaint = ?6,
                diagnosis = ?7,
                treatment = ?8,
                notes = ?9,
                vitals = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.patient_id,
                record.doctor_id,
                record.appointment_id,
                record.visit_date,
                record.chief_complaint,
                record.diagnosis,
                record.treatment,
                record.notes,
                vitals_json,
                record.updated_at,
            ],
        )?;
        require_found(rows_affected, "Medical record", &record.id)
    }

    pub fn get_medical_record(&self, id: &str) -> DbResult<Option<MedicalRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?"),
                [id],
                record_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A patient's records, most recent visit first.
    pub fn list_medical_records(&self, patient_id: &str) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM medical_records
            WHERE patient_id = ?
            ORDER BY visit_date DESC, created_at DESC
            "#
        ))?;
        let rows = stmt.query_map([patient_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_medical_record(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medical_records WHERE id = ?", [id])?;
        require_found(rows_affected, "Medical record", id)
    }
}
