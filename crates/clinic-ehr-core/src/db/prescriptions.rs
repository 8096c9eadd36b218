//! Prescription database operations, including dispensing.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use tracing::info;

use super::{require_found, Database, DbError, DbResult};
use crate::models::{Prescription, PrescriptionFilter, PrescriptionStatus, PrescriptionView};

/// Prescription columns, qualified with the `rx` alias.
const PRESCRIPTION_COLUMNS: &str = r#"
    rx.id, rx.patient_id, rx.doctor_id, rx.medication_id, rx.medical_record_id,
    rx.dosage, rx.frequency, rx.duration_days, rx.quantity, rx.instructions,
    rx.status, rx.prescribed_at, rx.dispensed_at, rx.dispensed_by, rx.updated_at
"#;

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        medication_id: row.get(3)?,
        medical_record_id: row.get(4)?,
        dosage: row.get(5)?,
        frequency: row.get(6)?,
        duration_days: row.get(7)?,
        quantity: row.get(8)?,
        instructions: row.get(9)?,
        status: row.get(10)?,
        prescribed_at: row.get(11)?,
        dispensed_at: row.get(12)?,
        dispensed_by: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl Database {
    pub fn insert_prescription(&self, prescription: &Prescription) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                id, patient_id, doctor_id, medication_id, medical_record_id,
                dosage, frequency, duration_days, quantity, instructions,
                status, prescribed_at, dispensed_at, dispensed_by, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                prescription.id,
                prescription.patient_id,
                prescription.doctor_id,
                prescription.medication_id,
                prescription.medical_record_id,
                prescription.dosage,
                prescription.frequency,
                prescription.duration_days,
                prescription.quantity,
                prescription.instructions,
                prescription.status,
                prescription.prescribed_at,
                prescription.dispensed_at,
                prescription.dispensed_by,
                prescription.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an active prescription. Dispensed and cancelled ones are final.
    pub fn update_prescription(&self, prescription: &Prescription) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescriptions SET
                medication_id = ?2,
                medical_record_id = ?3,
                dosage = ?4,
                frequency = ?5,
                duration_days = ?6,
                quantity = ?7,
                instructions = ?8,
                updated_at = ?9
            WHERE id = ?1 AND status = 'active'
            "#,
            params![
                prescription.id,
                prescription.medication_id,
                prescription.medical_record_id,
                prescription.dosage,
                prescription.frequency,
                prescription.duration_days,
                prescription.quantity,
                prescription.instructions,
                prescription.updated_at,
            ],
        )?;
        if rows_affected == 0 && self.get_prescription(&prescription.id)?.is_some() {
            return Err(DbError::Constraint(
                "only active prescriptions can be changed".into(),
            ));
        }
        require_found(rows_affected, "Prescription", &prescription.id)
    }

    pub fn get_prescription(&self, id: &str) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions rx WHERE rx.id = ?"),
                [id],
                prescription_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List prescriptions with patient and medication names, newest first.
    pub fn list_prescriptions(&self, filter: &PrescriptionFilter) -> DbResult<Vec<PrescriptionView>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(patient_id) = &filter.patient_id {
            clauses.push("rx.patient_id = ?");
            values.push(Box::new(patient_id.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("rx.status = ?");
            values.push(Box::new(status));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {PRESCRIPTION_COLUMNS},
                   p.first_name || ' ' || p.last_name,
                   m.name
            FROM prescriptions rx
            JOIN patients p ON p.id = rx.patient_id
            JOIN medications m ON m.id = rx.medication_id
            {where_sql}
            ORDER BY rx.prescribed_at DESC
            "#
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(PrescriptionView {
                prescription: prescription_from_row(row)?,
                patient_name: row.get(15)?,
                medication_name: row.get(16)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_prescription(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prescriptions WHERE id = ?", [id])?;
        require_found(rows_affected, "Prescription", id)
    }

    /// Cancel an active prescription.
    pub fn cancel_prescription(&self, id: &str) -> DbResult<Prescription> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescriptions SET status = 'cancelled', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
            params![id, Utc::now()],
        )?;
        let prescription = self
            .get_prescription(id)?
            .ok_or_else(|| DbError::NotFound(format!("Prescription {id}")))?;
        if rows_affected == 0 && prescription.status != PrescriptionStatus::Cancelled {
            return Err(DbError::Constraint(format!(
                "prescription is already {}",
                prescription.status
            )));
        }
        Ok(prescription)
    }

    /// Dispense an active prescription.
    ///
    /// Decrements the medication's stock by the prescribed quantity and marks
    /// the prescription dispensed, atomically. Nothing changes on failure.
    pub fn dispense_prescription(&mut self, id: &str, pharmacist_id: &str) -> DbResult<Prescription> {
        let tx = self.conn.transaction()?;

        let mut prescription = tx
            .query_row(
                &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions rx WHERE rx.id = ?"),
                [id],
                prescription_from_row,
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("Prescription {id}")))?;

        if prescription.status != PrescriptionStatus::Active {
            return Err(DbError::Constraint(format!(
                "prescription is already {}",
                prescription.status
            )));
        }

        let (medication_name, stock): (String, i64) = tx
            .query_row(
                "SELECT name, stock_quantity FROM medications WHERE id = ?",
                [&prescription.medication_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| {
                DbError::NotFound(format!("Medication {}", prescription.medication_id))
            })?;

        if stock < prescription.quantity {
            return Err(DbError::Constraint(format!(
                "insufficient stock for {medication_name}: have {stock}, need {}",
                prescription.quantity
            )));
        }

        let now = Utc::now();
        tx.execute(
            "UPDATE medications SET stock_quantity = stock_quantity - ?2, updated_at = ?3 WHERE id = ?1",
            params![prescription.medication_id, prescription.quantity, now],
        )?;

        prescription.status = PrescriptionStatus::Dispensed;
        prescription.dispensed_at = Some(now);
        prescription.dispensed_by = Some(pharmacist_id.to_string());
        prescription.updated_at = now;
        tx.execute(
            r#"
            UPDATE prescriptions SET
                status = ?2, dispensed_at = ?3, dispensed_by = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                prescription.id,
                prescription.status,
                prescription.dispensed_at,
                prescription.dispensed_by,
                prescription.updated_at,
            ],
        )?;
        tx.commit()?;

        info!(
            prescription_id = %prescription.id,
            medication = %medication_name,
            quantity = prescription.quantity,
            "Prescription dispensed"
        );
        Ok(prescription)
    }

    /// (issued, dispensed) counts for prescriptions written in `[from, to)`.
    pub fn count_prescriptions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<(i64, i64)> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN status = 'dispensed' THEN 1 ELSE 0 END), 0)
                FROM prescriptions
                WHERE prescribed_at >= ?1 AND prescribed_at < ?2
                "#,
                params![from, to],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(Into::into)
    }
}
