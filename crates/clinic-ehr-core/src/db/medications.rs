//! Pharmacy inventory database operations.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{require_found, Database, DbError, DbResult};
use crate::models::Medication;

const MEDICATION_COLUMNS: &str = r#"
    id, name, generic_name, category, form, strength, unit, stock_quantity,
    reorder_level, unit_price_cents, expiry_date, supplier, created_at, updated_at
"#;

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(0)?,
        name: row.get(1)?,
        generic_name: row.get(2)?,
        category: row.get(3)?,
        form: row.get(4)?,
        strength: row.get(5)?,
        unit: row.get(6)?,
        stock_quantity: row.get(7)?,
        reorder_level: row.get(8)?,
        unit_price_cents: row.get(9)?,
        expiry_date: row.get(10)?,
        supplier: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl Database {
    /// Insert a new medication.
    pub fn insert_medication(&self, medication: &Medication) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO medications ({MEDICATION_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                medication.id,
                medication.name,
                medication.generic_name,
                medication.category,
                medication.form,
                medication.strength,
                medication.unit,
                medication.stock_quantity,
                medication.reorder_level,
                medication.unit_price_cents,
                medication.expiry_date,
                medication.supplier,
                medication.created_at,
                medication.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_medication(&self, medication: &Medication) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medications SET
                name = ?2,
                generic_name = ?3,
                category = ?4,
                form = ?5,
                strength = ?6,
                unit = ?7,
                stock_quantity = ?8,
                reorder_level = ?9,
                unit_price_cents = ?10,
                expiry_date = ?11,
                supplier = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
            params![
                medication.id,
                medication.name,
                medication.generic_name,
                medication.category,
                medication.form,
                medication.strength,
                medication.unit,
                medication.stock_quantity,
                medication.reorder_level,
                medication.unit_price_cents,
                medication.expiry_date,
                medication.supplier,
                medication.updated_at,
            ],
        )?;
        require_found(rows_affected, "Medication", &medication.id)
    }

    pub fn get_medication(&self, id: &str) -> DbResult<Option<Medication>> {
        self.conn
            .query_row(
                &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?"),
                [id],
                medication_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All medications, alphabetically.
    pub fn list_medications(&self) -> DbResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt.query_map([], medication_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_medication(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medications WHERE id = ?", [id])?;
        require_found(rows_affected, "Medication", id)
    }

    /// Add (positive) or remove (negative) stock.
    ///
    /// Fails without changing anything if the result would go below zero or
    /// past the largest storable count.
    pub fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Medication> {
        let tx = self.conn.unchecked_transaction()?;

        let mut medication = tx
            .query_row(
                &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?"),
                [id],
                medication_from_row,
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("Medication {id}")))?;

        let stock = match medication.stock_quantity.checked_add(delta) {
            Some(stock) if stock >= 0 => stock,
            Some(_) => {
                return Err(DbError::Constraint(format!(
                    "insufficient stock for {}: have {}, need {}",
                    medication.name,
                    medication.stock_quantity,
                    delta.unsigned_abs()
                )))
            }
            None => {
                return Err(DbError::Constraint(format!(
                    "stock adjustment of {delta} for {} is out of range",
                    medication.name
                )))
            }
        };

        medication.stock_quantity = stock;
        medication.updated_at = Utc::now();
        tx.execute(
            "UPDATE medications SET stock_quantity = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, medication.stock_quantity, medication.updated_at],
        )?;
        tx.commit()?;

        info!(
            medication_id = %id,
            delta,
            stock = medication.stock_quantity,
            "Stock adjusted"
        );
        Ok(medication)
    }

    /// Medications at or below their reorder level, emptiest first.
    pub fn low_stock(&self) -> DbResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE stock_quantity <= reorder_level
            ORDER BY stock_quantity, name
            "#
        ))?;
        let rows = stmt.query_map([], medication_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Medications with an expiry date on or before `date`, soonest first.
    pub fn expiring_before(&self, date: NaiveDate) -> DbResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE expiry_date IS NOT NULL AND expiry_date <= ?
            ORDER BY expiry_date, name
            "#
        ))?;
        let rows = stmt.query_map([date], medication_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
