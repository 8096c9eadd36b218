//! Caller identity and permission checks.
//!
//! Authentication happens in front of this service; the proxy forwards the
//! signed-in staff member's id in `X-User-Id`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use clinic_ehr_core::models::User;
use clinic_ehr_core::{Action, Resource};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// The active staff member making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// 403 unless the user's role grants `action` on `resource`.
    pub fn require(&self, action: Action, resource: Resource) -> Result<(), ApiError> {
        if self.0.role.can(action, resource) {
            return Ok(());
        }
        warn!(user_id = %self.0.id, role = %self.0.role, ?action, %resource, "Permission denied");
        Err(ApiError::forbidden(format!(
            "role {} may not {} {}",
            self.0.role,
            match action {
                Action::Read => "read",
                Action::Write => "modify",
            },
            resource
        )))
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::unauthorized("missing X-User-Id header"))?;

        let user = state.db()?.get_user(user_id)?;
        match user {
            Some(user) if user.active => Ok(Self(user)),
            Some(_) => Err(ApiError::unauthorized("user is deactivated")),
            None => Err(ApiError::unauthorized("unknown user")),
        }
    }
}
