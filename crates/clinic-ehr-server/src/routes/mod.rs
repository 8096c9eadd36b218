//! REST endpoints under `/api`.
//!
//! Handlers lock the database only for synchronous work. Anything that
//! awaits (calendar calls) or touches the filesystem (backups) takes the
//! lock inside its own scope or a blocking task.

mod appointments;
mod backups;
mod calendar;
mod deployments;
mod patients;
mod payments;
mod pharmacy;
mod prescriptions;
mod records;
mod reports;
mod settings;

use axum::Router;
use serde::Serialize;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(patients::routes())
        .merge(appointments::routes())
        .merge(records::routes())
        .merge(lab_tests::routes())
        .merge(pharmacy::routes())
        .merge(prescriptions::routes())
        .merge(payments::routes())
        .merge(reports::routes())
        .merge(settings::routes())
        .merge(backups::routes())
        .merge(deployments::routes())
        .merge(calendar::routes())
}

/// Unwrap a lookup or answer 404.
fn found<T>(value: Option<T>, what: &str, id: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::not_found(format!("{what} {id} not found")))
}

/// Body for deletes.
#[derive(Debug, Serialize)]
struct Deleted {
    id: String,
}
