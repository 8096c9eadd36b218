use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use clinic_ehr_core::models::{MedicalRecord, Patient, PatientInput};
use clinic_ehr_core::{Action, Resource};
use serde::Deserialize;
use tracing::info;

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/records", get(patient_records))
}

#[derive(Debug, Deserialize)]
struct PatientQuery {
    /// Name, phone or MRN prefix
    q: Option<String>,
    limit: Option<usize>,
}

async fn list_patients(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PatientQuery>,
) -> ApiResult<Vec<Patient>> {
    user.require(Action::Read, Resource::Patients)?;
    let db = state.db()?;
    let patients = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => db.search_patients(q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))?,
        None => db.list_patients()?,
    };
    ok(patients)
}

async fn create_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<PatientInput>,
) -> ApiResult<Patient> {
    user.require(Action::Write, Resource::Patients)?;
    let db = state.db()?;
    let today = db.get_clinic_settings()?.today(Utc::now());
    input.validate(today)?;
    let patient = Patient::new(input);
    db.insert_patient(&patient)?;
    info!(patient_id = %patient.id, mrn = %patient.mrn, "Patient registered");
    ok(patient)
}

async fn get_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Patient> {
    user.require(Action::Read, Resource::Patients)?;
    let patient = state.db()?.get_patient(&id)?;
    ok(found(patient, "Patient", &id)?)
}

async fn update_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PatientInput>,
) -> ApiResult<Patient> {
    user.require(Action::Write, Resource::Patients)?;
    let db = state.db()?;
    let today = db.get_clinic_settings()?.today(Utc::now());
    input.validate(today)?;
    let mut patient = found(db.get_patient(&id)?, "Patient", &id)?;
    patient.apply(input);
    db.update_patient(&patient)?;
    ok(patient)
}

async fn delete_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Patients)?;
    state.db()?.delete_patient(&id)?;
    info!(patient_id = %id, "Patient deleted");
    ok(Deleted { id })
}

async fn patient_records(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Vec<MedicalRecord>> {
    user.require(Action::Read, Resource::MedicalRecords)?;
    ok(state.db()?.list_medical_records(&id)?)
}
