//! Payment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};

use super::{require_found, Database, DbError, DbResult};
use crate::models::{Payment, PaymentFilter, PaymentStatus, PaymentView};

/// Payment columns, qualified with the `pay` alias.
const PAYMENT_COLUMNS: &str = r#"
    pay.id, pay.patient_id, pay.appointment_id, pay.amount_cents, pay.method,
    pay.status, pay.description, pay.reference, pay.paid_at, pay.created_at,
    pay.updated_at
"#;

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_id: row.get(2)?,
        amount_cents: row.get(3)?,
        method: row.get(4)?,
        status: row.get(5)?,
        description: row.get(6)?,
        reference: row.get(7)?,
        paid_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Record a new payment.
    pub fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO payments (
                id, patient_id, appointment_id, amount_cents, method, status,
                description, reference, paid_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                payment.id,
                payment.patient_id,
                payment.appointment_id,
                payment.amount_cents,
                payment.method,
                payment.status,
                payment.description,
                payment.reference,
                payment.paid_at,
                payment.created_at,
                payment.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_payment(&self, payment: &Payment) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE payments SET
                patient_id = ?2,
                appointment_id = ?3,
                amount_cents = ?4,
                method = ?5,
                status = ?6,
                description = ?7,
                reference = ?8,
                paid_at = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                payment.id,
                payment.patient_id,
                payment.appointment_id,
                payment.amount_cents,
                payment.method,
                payment.status,
                payment.description,
                payment.reference,
                payment.paid_at,
                payment.updated_at,
            ],
        )?;
        require_found(rows_affected, "Payment", &payment.id)
    }

    pub fn get_payment(&self, id: &str) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!("SELECT {PAYMENT_COLUMNS} FROM payments pay WHERE pay.id = ?"),
                [id],
                payment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List payments with the payer's name, newest first.
    pub fn list_payments(&self, filter: &PaymentFilter) -> DbResult<Vec<PaymentView>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(patient_id) = &filter.patient_id {
            clauses.push("pay.patient_id = ?");
            values.push(Box::new(patient_id.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("pay.status = ?");
            values.push(Box::new(status));
        }
        if let Some(from) = filter.from {
            clauses.push("pay.created_at >= ?");
            values.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            clauses.push("pay.created_at < ?");
            values.push(Box::new(to));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS},
                   p.first_name || ' ' || p.last_name,
                   p.mrn
            FROM payments pay
            JOIN patients p ON p.id = pay.patient_id
            {where_sql}
            ORDER BY pay.created_at DESC
            "#
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(PaymentView {
                payment: payment_from_row(row)?,
                patient_name: row.get(11)?,
                patient_mrn: row.get(12)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_payment(&self, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute("DELETE FROM payments WHERE id = ?", [id])?;
        require_found(rows_affected, "Payment", id)
    }

    /// Change a payment's status. Moving to paid stamps `paid_at` once.
    pub fn set_payment_status(&self, id: &str, status: PaymentStatus) -> DbResult<Payment> {
        let mut payment = self
            .get_payment(id)?
            .ok_or_else(|| DbError::NotFound(format!("Payment {id}")))?;
        payment.set_status(status);
        self.update_payment(&payment)?;
        Ok(payment)
    }

    pub fn mark_paid(&self, id: &str) -> DbResult<Payment> {
        self.set_payment_status(id, PaymentStatus::Paid)
    }

    /// `(paid_at, amount_cents)` of every payment paid in `[from, to)`.
    pub fn paid_amounts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<(DateTime<Utc>, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT paid_at, amount_cents
            FROM payments
            WHERE status = 'paid' AND paid_at >= ?1 AND paid_at < ?2
            ORDER BY paid_at
            "#,
        )?;
        let rows = stmt.query_map(params![from, to], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Total of pending payments raised in `[from, to)`.
    pub fn pending_total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                SELECT COALESCE(SUM(amount_cents), 0)
                FROM payments
                WHERE status = 'pending' AND created_at >= ?1 AND created_at < ?2
                "#,
                params![from, to],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
