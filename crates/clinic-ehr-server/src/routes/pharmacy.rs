use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use clinic_ehr_core::models::{Medication, MedicationInput};
use clinic_ehr_core::{Action, MedicationMatch, Resource};
use serde::Deserialize;
use tracing::{info, warn};

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiError, ApiResult};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const DEFAULT_EXPIRY_DAYS: i64 = 90;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/medications", get(list_medications).post(create_medication))
        .route("/medications/search", get(search_medications))
        .route("/medications/low-stock", get(low_stock))
        .route("/medications/expiring", get(expiring))
        .route(
            "/medications/:id",
            get(get_medication)
                .put(update_medication)
                .delete(delete_medication),
        )
        .route("/medications/:id/stock", post(adjust_stock))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ExpiringQuery {
    /// Defaults to 90 days from today
    before: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct StockAdjustment {
    delta: i64,
}

async fn list_medications(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Medication>> {
    user.require(Action::Read, Resource::Pharmacy)?;
    ok(state.db()?.list_medications()?)
}

async fn create_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<MedicationInput>,
) -> ApiResult<Medication> {
    user.require(Action::Write, Resource::Pharmacy)?;
    input.validate()?;
    let medication = Medication::new(input);
    state.db()?.insert_medication(&medication)?;
    ok(medication)
}

async fn search_medications(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<MedicationMatch>> {
    user.require(Action::Read, Resource::Pharmacy)?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    ok(state.db()?.search_medications(&query.q, limit)?)
}

async fn low_stock(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Medication>> {
    user.require(Action::Read, Resource::Pharmacy)?;
    ok(state.db()?.low_stock()?)
}

async fn expiring(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ExpiringQuery>,
) -> ApiResult<Vec<Medication>> {
    user.require(Action::Read, Resource::Pharmacy)?;
    let db = state.db()?;
    let before = match query.before {
        Some(date) => date,
        None => db.get_clinic_settings()?.today(Utc::now()) + chrono::Duration::days(DEFAULT_EXPIRY_DAYS),
    };
    ok(db.expiring_before(before)?)
}

async fn get_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Medication> {
    user.require(Action::Read, Resource::Pharmacy)?;
    let medication = state.db()?.get_medication(&id)?;
    ok(found(medication, "Medication", &id)?)
}

async fn update_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<MedicationInput>,
) -> ApiResult<Medication> {
    user.require(Action::Write, Resource::Pharmacy)?;
    input.validate()?;
    let db = state.db()?;
    let mut medication = found(db.get_medication(&id)?, "Medication", &id)?;
    medication.apply(input);
    db.update_medication(&medication)?;
    ok(medication)
}

async fn delete_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Pharmacy)?;
    state.db()?.delete_medication(&id)?;
    ok(Deleted { id })
}

async fn adjust_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(adjustment): Json<StockAdjustment>,
) -> ApiResult<Medication> {
    user.require(Action::Write, Resource::Pharmacy)?;
    if adjustment.delta == 0 {
        return Err(ApiError::bad_request("delta must not be zero"));
    }
    let medication = state.db()?.adjust_stock(&id, adjustment.delta)?;
    info!(
        medication_id = %id,
        delta = adjustment.delta,
        stock = medication.stock_quantity,
        "Stock adjusted"
    );
    if medication.is_low_stock() {
        warn!(medication = %medication.name, stock = medication.stock_quantity, "Medication at or below reorder level");
    }
    ok(medication)
}
