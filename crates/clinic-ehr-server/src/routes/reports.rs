use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use clinic_ehr_core::{clinic_summary, Action, ClinicSummary, Resource};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::{ok, ApiResult};
use crate::AppState;

const DEFAULT_REPORT_DAYS: i64 = 30;

pub fn routes() -> Router<AppState> {
    Router::new().route("/reports/summary", get(summary))
}

/// Both bounds are optional; the default is the 30 days up to now.
#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(range): Query<RangeQuery>,
) -> ApiResult<ClinicSummary> {
    user.require(Action::Read, Resource::Reports)?;
    let to = range.to.unwrap_or_else(Utc::now);
    let from = range.from.unwrap_or(to - Duration::days(DEFAULT_REPORT_DAYS));
    let db = state.db()?;
    let settings = db.get_clinic_settings()?;
    ok(clinic_summary(&db, from, to, &settings)?)
}
