use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use clinic_ehr_core::models::{
    Appointment, AppointmentFilter, AppointmentInput, AppointmentStatus, AppointmentView, EditWindow,
};
use clinic_ehr_core::{Action, Resource};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(book_appointment))
        .route(
            "/appointments/:id",
            get(get_appointment)
                .put(edit_appointment)
                .delete(delete_appointment),
        )
        .route("/appointments/:id/status", post(set_status))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: AppointmentStatus,
}

/// An appointment with what the caller may still change.
#[derive(Debug, Serialize)]
struct AppointmentDetail {
    #[serde(flatten)]
    view: AppointmentView,
    edit_window: EditWindow,
}

async fn list_appointments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<AppointmentFilter>,
) -> ApiResult<Vec<AppointmentView>> {
    user.require(Action::Read, Resource::Appointments)?;
    let db = state.db()?;
    let settings = db.get_clinic_settings()?;
    ok(db.list_appointment_views(&filter, &settings, Utc::now())?)
}

async fn book_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<AppointmentInput>,
) -> ApiResult<Appointment> {
    user.require(Action::Write, Resource::Appointments)?;
    let appointment = state.db()?.book_appointment(input)?;
    info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        scheduled_at = %appointment.scheduled_at,
        "Appointment booked"
    );
    ok(appointment)
}

async fn get_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<AppointmentDetail> {
    user.require(Action::Read, Resource::Appointments)?;
    let now = Utc::now();
    let db = state.db()?;
    let settings = db.get_clinic_settings()?;
    let view = found(db.get_appointment_view(&id, &settings, now)?, "Appointment", &id)?;
    let edit_window = view.appointment.edit_window(now);
    ok(AppointmentDetail { view, edit_window })
}

async fn edit_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<AppointmentInput>,
) -> ApiResult<Appointment> {
    user.require(Action::Write, Resource::Appointments)?;
    ok(state.db()?.edit_appointment(&id, input, Utc::now())?)
}

async fn delete_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Appointments)?;
    state.db()?.delete_appointment(&id)?;
    ok(Deleted { id })
}

async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Appointment> {
    user.require(Action::Write, Resource::Appointments)?;
    let appointment = state.db()?.set_appointment_status(&id, change.status)?;
    info!(appointment_id = %id, status = %appointment.status, "Appointment status changed");
    ok(appointment)
}
