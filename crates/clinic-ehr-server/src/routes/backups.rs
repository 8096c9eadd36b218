//! Backup runs, restores, retention and schedules.
//!
//! Snapshots read and write files, so manager calls run on the blocking
//! pool with the database lock taken there.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clinic_ehr_core::backup::{plan_retention, BackupResult, RestoreSummary, RetentionPlan, RetentionReport};
use clinic_ehr_core::models::{BackupKind, BackupLog, BackupSchedule, BackupScheduleInput};
use clinic_ehr_core::{Action, BackupManager, Resource};
use serde::Serialize;
use tracing::{info, warn};

use super::{found, Deleted};
use crate::auth::CurrentUser;
use crate::error::{ok, ApiError, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/backups", get(list_backups).post(run_backup))
        .route("/backups/run-due", post(run_due))
        .route("/backups/retention", get(preview_retention).post(apply_retention))
        .route("/backups/:id/restore", post(restore))
        .route(
            "/backup-schedules",
            get(list_schedules).post(create_schedule),
        )
        .route(
            "/backup-schedules/:id",
            get(get_schedule)
                .put(update_schedule)
                .delete(delete_schedule),
        )
}

/// A schedule with its next fire time. A time in the past means the
/// schedule is due and waits for the next run-due call.
#[derive(Debug, Serialize)]
struct ScheduleView {
    #[serde(flatten)]
    schedule: BackupSchedule,
    next_run_at: Option<DateTime<Utc>>,
}

impl From<BackupSchedule> for ScheduleView {
    fn from(schedule: BackupSchedule) -> Self {
        let next_run_at = if schedule.enabled {
            schedule.next_run_after(schedule.last_run_at.unwrap_or(schedule.created_at))
        } else {
            None
        };
        Self {
            schedule,
            next_run_at,
        }
    }
}

/// Run `f` with a backup manager on the blocking pool.
async fn with_manager<T, F>(state: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut BackupManager<'_>) -> BackupResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut db = state.db()?;
        let mut manager = BackupManager::new(&mut db, state.store.as_ref());
        let result = f(&mut manager);
        result.map_err(ApiError::from)
    })
    .await?
}

async fn list_backups(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<BackupLog>> {
    user.require(Action::Read, Resource::Backups)?;
    ok(state.db()?.list_backup_logs()?)
}

async fn run_backup(State(state): State<AppState>, user: CurrentUser) -> ApiResult<BackupLog> {
    user.require(Action::Write, Resource::Backups)?;
    info!(requested_by = %user.id(), "Manual backup requested");
    let log = with_manager(state, |manager| manager.run_backup(BackupKind::Manual, None)).await?;
    if !log.succeeded() {
        let message = log.error.clone().unwrap_or_else(|| "backup failed".to_string());
        return Err(ApiError::internal(message));
    }
    ok(log)
}

async fn run_due(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<BackupLog>> {
    user.require(Action::Write, Resource::Backups)?;
    let now = Utc::now();
    let logs = with_manager(state, move |manager| manager.run_due(now)).await?;
    let failed = logs.iter().filter(|log| !log.succeeded()).count();
    if failed > 0 {
        warn!(failed, ran = logs.len(), "Some scheduled backups failed");
    }
    ok(logs)
}

async fn restore(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<RestoreSummary> {
    user.require(Action::Write, Resource::Backups)?;
    warn!(backup_id = %id, requested_by = %user.id(), "Restoring database from backup");
    ok(with_manager(state, move |manager| manager.restore(&id)).await?)
}

/// What retention would prune right now under the configured policy.
async fn preview_retention(State(state): State<AppState>, user: CurrentUser) -> ApiResult<RetentionPlan> {
    user.require(Action::Read, Resource::Backups)?;
    let logs = state.db()?.list_backup_logs()?;
    ok(plan_retention(&logs, &state.config.retention))
}

async fn apply_retention(State(state): State<AppState>, user: CurrentUser) -> ApiResult<RetentionReport> {
    user.require(Action::Write, Resource::Backups)?;
    let policy = state.config.retention;
    ok(with_manager(state, move |manager| manager.apply_retention(&policy)).await?)
}

async fn list_schedules(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<ScheduleView>> {
    user.require(Action::Read, Resource::Backups)?;
    let schedules = state.db()?.list_backup_schedules()?;
    ok(schedules.into_iter().map(ScheduleView::from).collect())
}

async fn create_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<BackupScheduleInput>,
) -> ApiResult<ScheduleView> {
    user.require(Action::Write, Resource::Backups)?;
    input.validate()?;
    let schedule = BackupSchedule::new(input);
    state.db()?.insert_backup_schedule(&schedule)?;
    info!(schedule = %schedule.name, frequency = %schedule.frequency, "Backup schedule created");
    ok(schedule.into())
}

async fn get_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ScheduleView> {
    user.require(Action::Read, Resource::Backups)?;
    let schedule = found(state.db()?.get_backup_schedule(&id)?, "Backup schedule", &id)?;
    ok(schedule.into())
}

async fn update_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<BackupScheduleInput>,
) -> ApiResult<ScheduleView> {
    user.require(Action::Write, Resource::Backups)?;
    input.validate()?;
    let db = state.db()?;
    let mut schedule = found(db.get_backup_schedule(&id)?, "Backup schedule", &id)?;
    schedule.apply(input);
    db.update_backup_schedule(&schedule)?;
    ok(schedule.into())
}

async fn delete_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    user.require(Action::Write, Resource::Backups)?;
    state.db()?.delete_backup_schedule(&id)?;
    ok(Deleted { id })
}
