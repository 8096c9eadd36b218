//! Payment export for the accounting package.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::{PaymentFilter, PaymentStatus, PaymentView};

/// Payments raised in a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentExport {
    pub metadata: PaymentExportMetadata,
    pub rows: Vec<PaymentExportRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentExportMetadata {
    pub clinic_name: String,
    pub currency: String,
    /// Inclusive start of the range
    pub from: DateTime<Utc>,
    /// Exclusive end of the range
    pub to: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    /// Sum of paid rows, in cents
    pub total_paid_cents: i64,
}

/// One payment as it appears in the export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentExportRow {
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
    pub patient_mrn: String,
    pub patient_name: String,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&PaymentView> for PaymentExportRow {
    fn from(view: &PaymentView) -> Self {
        let payment = &view.payment;
        Self {
            payment_id: payment.id.clone(),
            created_at: payment.created_at,
            patient_mrn: view.patient_mrn.clone(),
            patient_name: view.patient_name.clone(),
            amount_cents: payment.amount_cents,
            method: payment.method.to_string(),
            status: payment.status.to_string(),
            reference: payment.reference.clone(),
            description: payment.description.clone(),
            paid_at: payment.paid_at,
        }
    }
}

impl PaymentExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format, oldest payment first.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("payment_id,created_at,patient_mrn,patient_name,amount,currency,method,status,reference,description,paid_at\n");

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.payment_id),
                row.created_at.to_rfc3339(),
                escape_csv(&row.patient_mrn),
                escape_csv(&row.patient_name),
                format_cents(row.amount_cents),
                escape_csv(&self.metadata.currency),
                row.method,
                row.status,
                escape_csv(row.reference.as_deref().unwrap_or("")),
                escape_csv(row.description.as_deref().unwrap_or("")),
                row.paid_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ));
        }

        csv
    }
}

/// Builds payment exports from the database.
pub struct PaymentExporter<'a> {
    db: &'a Database,
}

impl<'a> PaymentExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Every payment created in `[from, to)`.
    pub fn export_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<PaymentExport> {
        let settings = self.db.get_clinic_settings()?;
        let mut views = self.db.list_payments(&PaymentFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        })?;
        views.reverse();

        let total_paid_cents = views
            .iter()
            .filter(|v| v.payment.status == PaymentStatus::Paid)
            .map(|v| v.payment.amount_cents)
            .sum();

        Ok(PaymentExport {
            metadata: PaymentExportMetadata {
                clinic_name: settings.clinic_name,
                currency: settings.currency,
                from,
                to,
                exported_at: Utc::now(),
                total_paid_cents,
            },
            rows: views.iter().map(PaymentExportRow::from).collect(),
        })
    }
}

/// `1250` -> `"12.50"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
