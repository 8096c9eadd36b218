//! One-time OAuth `state` values for the Google connect flow.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::google::{CalendarError, CalendarResult};

/// How long a consent link stays redeemable.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

/// Outstanding `state` values handed out with consent links.
///
/// Each value is accepted by exactly one callback, and only before it
/// expires.
#[derive(Debug, Default)]
pub struct OAuthStates {
    pending: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl OAuthStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh value and remember it until it expires.
    pub fn issue(&self, now: DateTime<Utc>) -> CalendarResult<String> {
        let mut pending = self.pending.lock().map_err(|_| CalendarError::LockPoisoned)?;
        pending.retain(|_, expires_at| *expires_at > now);
        let state = Uuid::new_v4().to_string();
        pending.insert(state.clone(), now + Duration::seconds(OAUTH_STATE_TTL_SECS));
        Ok(state)
    }

    /// Consume `state`. Unknown, reused and expired values are rejected.
    pub fn redeem(&self, state: &str, now: DateTime<Utc>) -> CalendarResult<()> {
        let mut pending = self.pending.lock().map_err(|_| CalendarError::LockPoisoned)?;
        match pending.remove(state) {
            Some(expires_at) if expires_at > now => Ok(()),
            _ => Err(CalendarError::InvalidState),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
