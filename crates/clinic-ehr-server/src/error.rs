//! API error type and the JSON response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinic_ehr_core::models::ValidationError;
use clinic_ehr_core::{BackupError, DbError};
use serde::Serialize;
use tracing::{debug, error};

use crate::google::CalendarError;

/// Successful response body: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Wrap `data` in the success envelope.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

/// An error rendered as `{ "success": false, "error": "..." }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        } else {
            debug!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        let status = match &e {
            DbError::NotFound(_) => StatusCode::NOT_FOUND,
            DbError::Validation(_) | DbError::Constraint(_) => StatusCode::BAD_REQUEST,
            DbError::Conflict(_) => StatusCode::CONFLICT,
            DbError::Sqlite(inner) if is_constraint_violation(inner) => StatusCode::BAD_REQUEST,
            DbError::Sqlite(_) | DbError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        DbError::from(e).into()
    }
}

impl From<BackupError> for ApiError {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::Database(inner) => inner.into(),
            BackupError::NotFound(_) => Self::not_found(e.to_string()),
            BackupError::InvalidName(_) => Self::bad_request(e.to_string()),
            BackupError::ChecksumMismatch { .. } | BackupError::InvalidSnapshot(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            BackupError::Sqlite(_)
            | BackupError::Io(_)
            | BackupError::Json(_)
            | BackupError::Boundary(_) => {
                Self::internal(e.to_string())
            }
        }
    }
}

impl From<CalendarError> for ApiError {
    fn from(e: CalendarError) -> Self {
        match e {
            CalendarError::Database(inner) => inner.into(),
            CalendarError::NotConfigured
            | CalendarError::NotConnected
            | CalendarError::TokenMissing
            | CalendarError::InvalidState => {
                Self::bad_request(e.to_string())
            }
            CalendarError::Http(_)
            | CalendarError::Provider { .. }
            | CalendarError::InvalidGrant(_) => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
            CalendarError::Url(_) | CalendarError::LockPoisoned => Self::internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(format!("background task failed: {e}"))
    }
}

/// Foreign key, NOT NULL and CHECK failures are bad input, not server faults.
fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
