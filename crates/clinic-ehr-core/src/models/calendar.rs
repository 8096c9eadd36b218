//! Google Calendar integration state.

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{AppointmentView, ValidationError};

/// Refresh access tokens this long before they actually expire.
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 60;

/// Stored OAuth connection to a Google calendar (single row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarIntegration {
    pub calendar_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub connected_email: Option<String>,
    pub enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CalendarIntegration {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            connected_email: None,
            enabled: false,
            last_synced_at: None,
            updated_at: None,
        }
    }
}

/// Token response from the OAuth token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Only present on the initial code exchange (and occasionally on refresh)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl CalendarIntegration {
    /// A refresh token is what makes the connection durable.
    pub fn is_connected(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// True when there is no access token or it expires within the skew.
    pub fn token_needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.token_expires_at) {
            (Some(_), Some(expires_at)) => {
                expires_at - Duration::seconds(TOKEN_REFRESH_SKEW_SECS) <= now
            }
            _ => true,
        }
    }

    /// Store a fresh grant. Keeps the existing refresh token when the grant
    /// omits one.
    ///
    /// A lifetime that is negative or does not fit a timestamp leaves the
    /// integration unchanged.
    pub fn apply_grant(
        &mut self,
        grant: TokenGrant,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let expires_at = TimeDelta::try_seconds(grant.expires_in)
            .filter(|lifetime| *lifetime >= TimeDelta::zero())
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ValidationError::new(
                    "expires_in",
                    format!("token lifetime of {} seconds is out of range", grant.expires_in),
                )
            })?;

        self.access_token = Some(grant.access_token);
        if let Some(refresh) = grant.refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.token_expires_at = Some(expires_at);
        self.enabled = true;
        self.updated_at = Some(now);
        Ok(())
    }

    /// Forget all credentials.
    pub fn disconnect(&mut self, now: DateTime<Utc>) {
        self.access_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
        self.connected_email = None;
        self.enabled = false;
        self.updated_at = Some(now);
    }
}

/// Provider-neutral calendar event built from an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn for_appointment(view: &AppointmentView) -> Self {
        let appt = &view.appointment;
        let mut description = format!(
            "{} with {}",
            appt.appointment_type.as_str().replace('_', " "),
            view.doctor_name
        );
        if let Some(reason) = &appt.reason {
            description.push_str("\nReason: ");
            description.push_str(reason);
        }
        Self {
            summary: format!("Appointment: {}", view.patient_name),
            description: Some(description),
            location: view.room_name.clone(),
            start: appt.scheduled_at,
            end: appt.ends_at(),
        }
    }
}
