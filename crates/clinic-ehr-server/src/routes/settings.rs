//! Clinic settings, staff accounts, departments and rooms.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_ehr_core::models::{
    ClinicSettings, Department, DepartmentInput, Room, RoomInput, User, UserInput,
};
use clinic_ehr_core::{Action, Resource};
use serde::Deserialize;
use tracing::info;

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).put(save_settings))
        .route("/me", get(me))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/:id",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/:id",
            get(get_room).put(update_room).delete(delete_room),
        )
}

async fn get_settings(State(state): State<AppState>, user: CurrentUser) -> ApiResult<ClinicSettings> {
    user.require(Action::Read, Resource::Settings)?;
    ok(state.db()?.get_clinic_settings()?)
}

async fn save_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(settings): Json<ClinicSettings>,
) -> ApiResult<ClinicSettings> {
    user.require(Action::Write, Resource::Settings)?;
    let saved = state.db()?.save_clinic_settings(&settings)?;
    info!(updated_by = %user.id(), "Clinic settings saved");
    ok(saved)
}

async fn me(user: CurrentUser) -> ApiResult<User> {
    ok(user.0)
}

// Users

async fn list_users(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<User>> {
    user.require(Action::Read, Resource::Users)?;
    ok(state.db()?.list_users()?)
}

async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<UserInput>,
) -> ApiResult<User> {
    user.require(Action::Write, Resource::Users)?;
    input.validate()?;
    let created = User::new(input);
    state.db()?.insert_user(&created)?;
    info!(user_id = %created.id, role = %created.role, "Staff account created");
    ok(created)
}

async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<User> {
    user.require(Action::Read, Resource::Users)?;
    let found_user = state.db()?.get_user(&id)?;
    ok(found(found_user, "User", &id)?)
}

async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> ApiResult<User> {
    user.require(Action::Write, Resource::Users)?;
    input.validate()?;
    let db = state.db()?;
    let mut target = found(db.get_user(&id)?, "User", &id)?;
    target.apply(input);
    db.update_user(&target)?;
    ok(target)
}

async fn deactivate_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<User> {
    user.require(Action::Write, Resource::Users)?;
    let db = state.db()?;
    db.deactivate_user(&id)?;
    info!(user_id = %id, by = %user.id(), "Staff account deactivated");
    ok(found(db.get_user(&id)?, "User", &id)?)
}

// Departments

async fn list_departments(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Department>> {
    user.require(Action::Read, Resource::Settings)?;
    ok(state.db()?.list_departments()?)
}

async fn create_department(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<Department> {
    user.require(Action::Write, Resource::Settings)?;
    input.validate()?;
    let department = Department::new(input);
    state.db()?.insert_department(&department)?;
    ok(department)
}

async fn get_department(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Department> {
    user.require(Action::Read, Resource::Settings)?;
    let department = state.db()?.get_department(&id)?;
    ok(found(department, "Department", &id)?)
}

async fn update_department(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<Department> {
    user.require(Action::Write, Resource::Settings)?;
    input.validate()?;
    let db = state.db()?;
    let mut department = found(db.get_department(&id)?, "Department", &id)?;
    department.apply(input);
    db.update_department(&department)?;
    ok(department)
}

async fn delete_department(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Settings)?;
    state.db()?.delete_department(&id)?;
    ok(Deleted { id })
}

// Rooms

#[derive(Debug, Deserialize)]
struct RoomQuery {
    department_id: Option<String>,
}

async fn list_rooms(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Vec<Room>> {
    user.require(Action::Read, Resource::Settings)?;
    ok(state.db()?.list_rooms(query.department_id.as_deref())?)
}

async fn create_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<RoomInput>,
) -> ApiResult<Room> {
    user.require(Action::Write, Resource::Settings)?;
    input.validate()?;
    let room = Room::new(input);
    state.db()?.insert_room(&room)?;
    ok(room)
}

async fn get_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Room> {
    user.require(Action::Read, Resource::Settings)?;
    let room = state.db()?.get_room(&id)?;
    ok(found(room, "Room", &id)?)
}

async fn update_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<RoomInput>,
) -> ApiResult<Room> {
    user.require(Action::Write, Resource::Settings)?;
    input.validate()?;
    let db = state.db()?;
    let mut room = found(db.get_room(&id)?, "Room", &id)?;
    room.apply(input);
    db.update_room(&room)?;
    ok(room)
}

async fn delete_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Settings)?;
    state.db()?.delete_room(&id)?;
    ok(Deleted { id })
}
