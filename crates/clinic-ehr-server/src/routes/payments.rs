use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clinic_ehr_core::models::{Payment, PaymentFilter, PaymentInput, PaymentStatus, PaymentView};
use clinic_ehr_core::{Action, PaymentExporter, Resource};
use serde::Deserialize;
use tracing::info;

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiError, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/export", get(export_payments))
        .route(
            "/payments/:id",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route("/payments/:id/status", post(set_status))
        .route("/payments/:id/pay", post(mark_paid))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    #[serde(default)]
    format: ExportFormat,
}

async fn list_payments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<PaymentFilter>,
) -> ApiResult<Vec<PaymentView>> {
    user.require(Action::Read, Resource::Payments)?;
    ok(state.db()?.list_payments(&filter)?)
}

async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<PaymentInput>,
) -> ApiResult<Payment> {
    user.require(Action::Write, Resource::Payments)?;
    input.validate()?;
    let payment = Payment::new(input);
    state.db()?.insert_payment(&payment)?;
    info!(
        payment_id = %payment.id,
        amount_cents = payment.amount_cents,
        status = %payment.status,
        "Payment recorded"
    );
    ok(payment)
}

async fn get_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Payment> {
    user.require(Action::Read, Resource::Payments)?;
    let payment = state.db()?.get_payment(&id)?;
    ok(found(payment, "Payment", &id)?)
}

async fn update_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PaymentInput>,
) -> ApiResult<Payment> {
    user.require(Action::Write, Resource::Payments)?;
    input.validate()?;
    let db = state.db()?;
    let mut payment = found(db.get_payment(&id)?, "Payment", &id)?;
    payment.apply(input);
    db.update_payment(&payment)?;
    ok(payment)
}

async fn delete_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Payments)?;
    state.db()?.delete_payment(&id)?;
    ok(Deleted { id })
}

async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Payment> {
    user.require(Action::Write, Resource::Payments)?;
    ok(state.db()?.set_payment_status(&id, change.status)?)
}

async fn mark_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Payment> {
    user.require(Action::Write, Resource::Payments)?;
    let payment = state.db()?.mark_paid(&id)?;
    info!(payment_id = %id, amount_cents = payment.amount_cents, "Payment marked paid");
    ok(payment)
}

/// Payments raised in `[from, to)` as a JSON document or CSV file.
async fn export_payments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    user.require(Action::Read, Resource::Payments)?;
    if query.to <= query.from {
        return Err(ApiError::bad_request("`to` must be after `from`"));
    }
    let export = {
        let db = state.db()?;
        PaymentExporter::new(&db).export_range(query.from, query.to)?
    };
    info!(rows = export.rows.len(), format = ?query.format, "Payments exported");

    let response = match query.format {
        ExportFormat::Json => {
            let body = export
                .to_json()
                .map_err(|e| ApiError::internal(format!("export failed: {e}")))?;
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        ExportFormat::Csv => {
            let file_name = format!(
                "payments-{}-{}.csv",
                query.from.format("%Y%m%d"),
                query.to.format("%Y%m%d")
            );
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                export.to_csv(),
            )
                .into_response()
        }
    };
    Ok(response)
}
