//! Pushing appointments to the connected Google calendar.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use clinic_ehr_core::models::{AppointmentStatus, CalendarEvent, CalendarIntegration};
use clinic_ehr_core::{Database, DbError};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::google::{CalendarError, CalendarResult, GoogleClient};

/// What a sync did to the remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
    Deleted,
    /// Cancelled appointment that never had an event
    Skipped,
}

/// Keeps the stored token fresh and mirrors appointments as events.
///
/// The database lock is never held across a network call. Syncs sharing a
/// `gate` run one at a time, so each sees the event id the previous one
/// stored.
pub struct CalendarSync<'a> {
    client: &'a GoogleClient,
    db: &'a Mutex<Database>,
    gate: &'a AsyncMutex<()>,
}

impl<'a> CalendarSync<'a> {
    pub fn new(
        client: &'a GoogleClient,
        db: &'a Mutex<Database>,
        gate: &'a AsyncMutex<()>,
    ) -> Self {
        Self { client, db, gate }
    }

    fn lock(&self) -> CalendarResult<MutexGuard<'a, Database>> {
        self.db.lock().map_err(|_| CalendarError::LockPoisoned)
    }

    /// Stored integration with a usable access token, refreshing and
    /// persisting a new one first when needed.
    pub async fn ensure_fresh_token(&self, now: DateTime<Utc>) -> CalendarResult<CalendarIntegration> {
        let mut integration = {
            let db = self.lock()?;
            db.get_calendar_integration()?
        };
        if !integration.enabled || !integration.is_connected() {
            return Err(CalendarError::NotConnected);
        }
        if !integration.token_needs_refresh(now) {
            return Ok(integration);
        }

        let refresh_token = integration
            .refresh_token
            .clone()
            .ok_or(CalendarError::TokenMissing)?;
        let grant = self.client.refresh(&refresh_token).await?;
        integration.apply_grant(grant, now)?;
        {
            let db = self.lock()?;
            db.save_calendar_integration(&integration)?;
        }
        info!("Refreshed Google Calendar access token");
        Ok(integration)
    }

    /// Create, update or delete the event for one appointment.
    ///
    /// Cancelled and no-show appointments lose their event; everything else
    /// gets one matching its current time, patient and room.
    pub async fn sync_appointment(&self, id: &str, now: DateTime<Utc>) -> CalendarResult<SyncOutcome> {
        let _turn = self.gate.lock().await;
        let integration = self.ensure_fresh_token(now).await?;
        let access_token = integration.access_token.clone().ok_or(CalendarError::TokenMissing)?;
        let calendar_id = integration.calendar_id.as_str();

        let view = {
            let db = self.lock()?;
            let settings = db.get_clinic_settings()?;
            db.get_appointment_view(id, &settings, now)?
                .ok_or_else(|| DbError::NotFound(format!("Appointment {id}")))?
        };
        let appointment = &view.appointment;
        let existing = appointment.calendar_event_id.clone();

        let outcome = match (appointment.status, existing) {
            (AppointmentStatus::Cancelled | AppointmentStatus::NoShow, Some(event_id)) => {
                self.client.delete_event(&access_token, calendar_id, &event_id).await?;
                self.lock()?.set_calendar_event_id(id, None)?;
                SyncOutcome::Deleted
            }
            (AppointmentStatus::Cancelled | AppointmentStatus::NoShow, None) => SyncOutcome::Skipped,
            (_, Some(event_id)) => {
                let event = CalendarEvent::for_appointment(&view);
                self.client
                    .update_event(&access_token, calendar_id, &event_id, &event)
                    .await?;
                SyncOutcome::Updated
            }
            (_, None) => {
                let event = CalendarEvent::for_appointment(&view);
                let event_id = self.client.insert_event(&access_token, calendar_id, &event).await?;
                self.lock()?.set_calendar_event_id(id, Some(&event_id))?;
                SyncOutcome::Created
            }
        };

        self.lock()?.touch_calendar_sync(now)?;
        info!(appointment_id = id, outcome = ?outcome, "Appointment synced to Google Calendar");
        Ok(outcome)
    }
}
