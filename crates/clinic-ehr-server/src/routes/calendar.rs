//! Google Calendar connection and appointment sync.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clinic_ehr_core::models::CalendarIntegration;
use clinic_ehr_core::{Action, Resource};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::calendar_sync::{CalendarSync, SyncOutcome};
use crate::error::{ok, ApiError, ApiResult};
use crate::google::CalendarError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calendar/status", get(status))
        .route("/calendar/auth-url", get(auth_url))
        .route("/calendar/callback", get(callback))
        .route("/calendar/settings", put(update_settings))
        .route("/calendar/disconnect", post(disconnect))
        .route("/calendar/sync/:appointment_id", post(sync_appointment))
}

/// Connection state without the tokens.
#[derive(Debug, Serialize)]
struct CalendarStatus {
    configured: bool,
    connected: bool,
    enabled: bool,
    calendar_id: String,
    connected_email: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl CalendarStatus {
    fn new(configured: bool, integration: &CalendarIntegration) -> Self {
        Self {
            configured,
            connected: integration.is_connected(),
            enabled: integration.enabled,
            calendar_id: integration.calendar_id.clone(),
            connected_email: integration.connected_email.clone(),
            token_expires_at: integration.token_expires_at,
            last_synced_at: integration.last_synced_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthUrl {
    url: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarSettings {
    calendar_id: String,
    enabled: bool,
    #[serde(default)]
    connected_email: Option<String>,
}

#[derive(Debug, Serialize)]
struct SyncResult {
    appointment_id: String,
    outcome: SyncOutcome,
}

async fn status(State(state): State<AppState>, user: CurrentUser) -> ApiResult<CalendarStatus> {
    user.require(Action::Read, Resource::Calendar)?;
    let integration = state.db()?.get_calendar_integration()?;
    ok(CalendarStatus::new(state.google.is_configured(), &integration))
}

/// Google consent page to send the browser to.
async fn auth_url(State(state): State<AppState>, user: CurrentUser) -> ApiResult<AuthUrl> {
    user.require(Action::Write, Resource::Calendar)?;
    if !state.google.is_configured() {
        return Err(CalendarError::NotConfigured.into());
    }
    let oauth_state = state.oauth_states.issue(Utc::now())?;
    let url = state.google.authorization_url(&oauth_state)?;
    ok(AuthUrl {
        url,
        state: oauth_state,
    })
}

/// Redirect target after consent: trade the code for tokens and store them.
async fn callback(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<CalendarStatus> {
    user.require(Action::Write, Resource::Calendar)?;
    let now = Utc::now();
    let oauth_state = query.state.unwrap_or_default();
    if let Err(e) = state.oauth_states.redeem(&oauth_state, now) {
        warn!(user_id = %user.id(), "Calendar callback with unknown OAuth state");
        return Err(e.into());
    }
    if let Some(error) = query.error {
        warn!(%error, "Google consent was not granted");
        return Err(ApiError::bad_request(format!("authorization failed: {error}")));
    }
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing authorization code"))?;

    let grant = state.google.exchange_code(&code).await?;
    let integration = {
        let db = state.db()?;
        let mut integration = db.get_calendar_integration()?;
        integration
            .apply_grant(grant, now)
            .map_err(CalendarError::from)?;
        db.save_calendar_integration(&integration)?;
        integration
    };
    info!(connected_by = %user.id(), "Google Calendar connected");
    ok(CalendarStatus::new(true, &integration))
}

async fn update_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(settings): Json<CalendarSettings>,
) -> ApiResult<CalendarStatus> {
    user.require(Action::Write, Resource::Calendar)?;
    let calendar_id = settings.calendar_id.trim();
    if calendar_id.is_empty() {
        return Err(ApiError::bad_request("calendar_id is required"));
    }
    let db = state.db()?;
    let mut integration = db.get_calendar_integration()?;
    integration.calendar_id = calendar_id.to_string();
    integration.enabled = settings.enabled;
    if settings.connected_email.is_some() {
        integration.connected_email = settings.connected_email;
    }
    integration.updated_at = Some(Utc::now());
    db.save_calendar_integration(&integration)?;
    ok(CalendarStatus::new(state.google.is_configured(), &integration))
}

async fn disconnect(State(state): State<AppState>, user: CurrentUser) -> ApiResult<CalendarStatus> {
    user.require(Action::Write, Resource::Calendar)?;
    let db = state.db()?;
    let mut integration = db.get_calendar_integration()?;
    integration.disconnect(Utc::now());
    db.save_calendar_integration(&integration)?;
    info!(disconnected_by = %user.id(), "Google Calendar disconnected");
    ok(CalendarStatus::new(state.google.is_configured(), &integration))
}

async fn sync_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(appointment_id): Path<String>,
) -> ApiResult<SyncResult> {
    user.require(Action::Write, Resource::Calendar)?;
    let sync = CalendarSync::new(&state.google, &state.db, &state.calendar_gate);
    let outcome = sync.sync_appointment(&appointment_id, Utc::now()).await?;
    ok(SyncResult {
        appointment_id,
        outcome,
    })
}
