//! Google OAuth and Calendar REST client.

use clinic_ehr_core::models::{CalendarEvent, TokenGrant, ValidationError};
use clinic_ehr_core::DbError;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::config::GoogleConfig;

/// Scope needed to create and edit events on the clinic calendar.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// Calendar integration errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Google Calendar is not configured on this server")]
    NotConfigured,

    #[error("Google Calendar is not connected")]
    NotConnected,

    #[error("No refresh token stored; reconnect Google Calendar")]
    TokenMissing,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Google returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Unknown or expired OAuth state; start the connection again")]
    InvalidState,

    #[error("Google returned an unusable token: {0}")]
    InvalidGrant(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type CalendarResult<T> = Result<T, CalendarError>;

#[derive(Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: &'static str,
}

#[derive(Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    start: EventTime,
    end: EventTime,
}

impl<'a> From<&'a CalendarEvent> for EventBody<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        Self {
            summary: &event.summary,
            description: event.description.as_deref(),
            location: event.location.as_deref(),
            start: EventTime {
                date_time: event.start.to_rfc3339(),
                time_zone: "UTC",
            },
            end: EventTime {
                date_time: event.end.to_rfc3339(),
                time_zone: "UTC",
            },
        }
    }
}

#[derive(Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Thin client over the OAuth token endpoint and the Calendar v3 API.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Consent page URL. `state` is echoed back to the callback.
    pub fn authorization_url(&self, state: &str) -> CalendarResult<String> {
        if !self.is_configured() {
            return Err(CalendarError::NotConfigured);
        }
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Trade an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> CalendarResult<TokenGrant> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    /// Get a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> CalendarResult<TokenGrant> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> CalendarResult<TokenGrant> {
        if !self.is_configured() {
            return Err(CalendarError::NotConfigured);
        }
        let response = self.http.post(&self.config.token_url).form(form).send().await?;
        let response = check(response, "token request").await?;
        Ok(response.json().await?)
    }

    /// Create an event and return its id.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> CalendarResult<String> {
        let url = self.events_url(calendar_id, None)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&EventBody::from(event))
            .send()
            .await?;
        let created: CreatedEvent = check(response, "insert event").await?.json().await?;
        Ok(created.id)
    }

    pub async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &CalendarEvent,
    ) -> CalendarResult<()> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let response = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .json(&EventBody::from(event))
            .send()
            .await?;
        check(response, "update event").await?;
        Ok(())
    }

    /// Delete an event. An event that is already gone counts as deleted.
    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> CalendarResult<()> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let response = self.http.delete(url).bearer_auth(access_token).send().await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            warn!(event_id, "Calendar event already deleted");
            return Ok(());
        }
        check(response, "delete event").await?;
        Ok(())
    }

    /// `{api_base}/calendars/{calendar_id}/events[/{event_id}]`, with each
    /// id percent-encoded as a path segment.
    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> CalendarResult<Url> {
        let mut url = Url::parse(&self.config.api_base_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push("calendars").push(calendar_id).push("events");
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }
}

/// Turn a non-2xx response into `CalendarError::Provider`.
async fn check(response: Response, what: &str) -> CalendarResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), %message, "Google {what} failed");
    Err(CalendarError::Provider {
        status: status.as_u16(),
        message,
    })
}
