//! Dashboard and period summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError, DbResult};
use crate::models::{AppointmentStatus, ClinicSettings, LabTestStatus, ValidationError};

/// Longest range a summary will bucket into days.
const MAX_REPORT_DAYS: i64 = 366;

/// Activity over `[from, to)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub new_patients: i64,
    /// Every status is present, zero when unused
    pub appointments_by_status: BTreeMap<String, i64>,
    pub lab_tests_by_status: BTreeMap<String, i64>,
    pub prescriptions_issued: i64,
    pub prescriptions_dispensed: i64,
    /// Paid in the range, in cents
    pub revenue_cents: i64,
    /// Still pending from payments raised in the range, in cents
    pub outstanding_cents: i64,
    pub low_stock_count: usize,
    /// One entry per clinic-local day, oldest first
    pub daily_revenue: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub amount_cents: i64,
}

/// Fill a status map with zeros for every variant, then apply counts.
fn status_counts<S: Copy + std::fmt::Display>(all: &[S], counts: Vec<(S, i64)>) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = all.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, count) in counts {
        map.insert(status.to_string(), count);
    }
    map
}

/// Summarize clinic activity between `from` (inclusive) and `to` (exclusive).
///
/// Daily revenue is bucketed by the clinic's local date.
pub fn clinic_summary(
    db: &Database,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    settings: &ClinicSettings,
) -> DbResult<ClinicSummary> {
    if to <= from {
        return Err(ValidationError::new("to", "must be after from").into());
    }
    if to - from > Duration::days(MAX_REPORT_DAYS) {
        return Err(DbError::Validation(ValidationError::new(
            "to",
            format!("range is limited to {MAX_REPORT_DAYS} days"),
        )));
    }

    let offset = settings.offset();
    let first_day = from.with_timezone(&offset).date_naive();
    let last_day = (to - Duration::nanoseconds(1)).with_timezone(&offset).date_naive();

    let mut by_day: BTreeMap<NaiveDate, i64> = first_day
        .iter_days()
        .take_while(|d| *d <= last_day)
        .map(|d| (d, 0))
        .collect();

    let mut revenue_cents = 0;
    for (paid_at, amount) in db.paid_amounts_between(from, to)? {
        revenue_cents += amount;
        *by_day
            .entry(paid_at.with_timezone(&offset).date_naive())
            .or_insert(0) += amount;
    }

    let (prescriptions_issued, prescriptions_dispensed) = db.count_prescriptions(from, to)?;

    Ok(ClinicSummary {
        from,
        to,
        new_patients: db.count_patients_created_between(from, to)?,
        appointments_by_status: status_counts(
            AppointmentStatus::ALL,
            db.count_appointments_by_status(from, to)?,
        ),
        lab_tests_by_status: status_counts(LabTestStatus::ALL, db.count_lab_tests_by_status(from, to)?),
        prescriptions_issued,
        prescriptions_dispensed,
        revenue_cents,
        outstanding_cents: db.pending_total_between(from, to)?,
        low_stock_count: db.low_stock()?.len(),
        daily_revenue: by_day
            .into_iter()
            .map(|(date, amount_cents)| DailyRevenue { date, amount_cents })
            .collect(),
    })
}
