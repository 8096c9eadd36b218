use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_ehr_core::models::Deployment;
use clinic_ehr_core::{Action, Resource};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deployments", get(list_deployments).post(stage))
        .route("/deployments/live", get(live))
        .route("/deployments/:id/promote", post(promote))
        .route("/deployments/:id/rollback", post(rollback))
}

#[derive(Debug, Deserialize)]
struct StageRequest {
    version: String,
    #[serde(default)]
    notes: Option<String>,
}

/// Result of a rollback: the release that is live now, if any.
#[derive(Debug, Serialize)]
struct RollbackOutcome {
    live: Option<Deployment>,
}

async fn list_deployments(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Deployment>> {
    user.require(Action::Read, Resource::Deployments)?;
    ok(state.db()?.list_deployments()?)
}

async fn live(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Option<Deployment>> {
    user.require(Action::Read, Resource::Deployments)?;
    ok(state.db()?.live_deployment()?)
}

async fn stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<StageRequest>,
) -> ApiResult<Deployment> {
    user.require(Action::Write, Resource::Deployments)?;
    let deployment = state
        .db()?
        .stage_deployment(&request.version, request.notes, user.id())?;
    ok(deployment)
}

async fn promote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deployment> {
    user.require(Action::Write, Resource::Deployments)?;
    let mut db = state.db()?;
    ok(db.promote_deployment(&id)?)
}

async fn rollback(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<RollbackOutcome> {
    user.require(Action::Write, Resource::Deployments)?;
    let mut db = state.db()?;
    let live = db.rollback_deployment(&id)?;
    if live.is_none() {
        warn!(deployment_id = %id, "Rolled back with no earlier release to restore");
    }
    ok(RollbackOutcome { live })
}
