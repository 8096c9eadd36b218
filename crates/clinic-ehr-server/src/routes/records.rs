use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_ehr_core::models::{MedicalRecord, MedicalRecordInput};
use clinic_ehr_core::{Action, Resource};

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/records", post(create_record))
        .route(
            "/records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

async fn create_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<MedicalRecordInput>,
) -> ApiResult<MedicalRecord> {
    user.require(Action::Write, Resource::MedicalRecords)?;
    input.validate()?;
    let record = MedicalRecord::new(input);
    state.db()?.insert_medical_record(&record)?;
    ok(record)
}

async fn get_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<MedicalRecord> {
    user.require(Action::Read, Resource::MedicalRecords)?;
    let record = state.db()?.get_medical_record(&id)?;
    ok(found(record, "Medical record", &id)?)
}

async fn update_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<MedicalRecordInput>,
) -> ApiResult<MedicalRecord> {
    user.require(Action::Write, Resource::MedicalRecords)?;
    input.validate()?;
    let db = state.db()?;
    let mut record = found(db.get_medical_record(&id)?, "Medical record", &id)?;
    record.apply(input);
    db.update_medical_record(&record)?;
    ok(record)
}

async fn delete_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::MedicalRecords)?;
    state.db()?.delete_medical_record(&id)?;
    ok(Deleted { id })
}
