use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_ehr_core::models::{Prescription, PrescriptionFilter, PrescriptionInput, PrescriptionView};
use clinic_ehr_core::{Action, Resource};

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/prescriptions",
            get(list_prescriptions).post(create_prescription),
        )
        .route(
            "/prescriptions/:id",
            get(get_prescription)
                .put(update_prescription)
                .delete(delete_prescription),
        )
        .route("/prescriptions/:id/dispense", post(dispense))
        .route("/prescriptions/:id/cancel", post(cancel))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<PrescriptionFilter>,
) -> ApiResult<Vec<PrescriptionView>> {
    user.require(Action::Read, Resource::Prescriptions)?;
    ok(state.db()?.list_prescriptions(&filter)?)
}

async fn create_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<PrescriptionInput>,
) -> ApiResult<Prescription> {
    user.require(Action::Write, Resource::Prescriptions)?;
    input.validate()?;
    let prescription = Prescription::new(input);
    state.db()?.insert_prescription(&prescription)?;
    ok(prescription)
}

async fn get_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Prescription> {
    user.require(Action::Read, Resource::Prescriptions)?;
    let prescription = state.db()?.get_prescription(&id)?;
    ok(found(prescription, "Prescription", &id)?)
}

async fn update_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PrescriptionInput>,
) -> ApiResult<Prescription> {
    user.require(Action::Write, Resource::Prescriptions)?;
    input.validate()?;
    let db = state.db()?;
    let mut prescription = found(db.get_prescription(&id)?, "Prescription", &id)?;
    prescription.apply(input);
    db.update_prescription(&prescription)?;
    ok(prescription)
}

async fn delete_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Prescriptions)?;
    state.db()?.delete_prescription(&id)?;
    ok(Deleted { id })
}

/// Hand out the medication. Dispensing also draws down pharmacy stock.
async fn dispense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Prescription> {
    user.require(Action::Write, Resource::Prescriptions)?;
    user.require(Action::Write, Resource::Pharmacy)?;
    let mut db = state.db()?;
    ok(db.dispense_prescription(&id, user.id())?)
}

async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Prescription> {
    user.require(Action::Write, Resource::Prescriptions)?;
    ok(state.db()?.cancel_prescription(&id)?)
}
