//! Appointment models, the edit-window rule and schedule date labels.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};

/// Default slot length when a booking does not specify one.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

text_enum! {
    /// Appointment lifecycle status.
    pub enum AppointmentStatus {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        CheckedIn => "checked_in",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

text_enum! {
    pub enum AppointmentType {
        Consultation => "consultation",
        FollowUp => "follow_up",
        Procedure => "procedure",
        LabVisit => "lab_visit",
        Emergency => "emergency",
    }
}

impl AppointmentStatus {
    /// Completed, cancelled and no-show appointments are closed for edits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether `next` is a legal status change from `self`.
    ///
    /// Setting the same status again is always allowed (no-op).
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Scheduled => matches!(next, Confirmed | CheckedIn | Cancelled | NoShow),
            Confirmed => matches!(next, CheckedIn | Cancelled | NoShow),
            CheckedIn => matches!(next, Completed | Cancelled),
            Completed | Cancelled | NoShow => false,
        }
    }
}

/// What may be changed on an appointment at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditWindow {
    /// Before the start time: every field may change.
    Open,
    /// Start time passed or patient checked in: only the status may change.
    StatusOnly,
    /// Terminal status: nothing may change.
    Locked,
}

/// A booked appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    /// User ID of the attending doctor
    pub doctor_id: String,
    pub room_id: Option<String>,
    pub department_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Google Calendar event ID once synced
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking / edit form for an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentInput {
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id.trim().is_empty() {
            return Err(ValidationError::new("patient_id", "is required"));
        }
        if self.doctor_id.trim().is_empty() {
            return Err(ValidationError::new("doctor_id", "is required"));
        }
        if let Some(minutes) = self.duration_minutes {
            if minutes == 0 || minutes > 8 * 60 {
                return Err(ValidationError::new(
                    "duration_minutes",
                    "must be between 1 and 480",
                ));
            }
        }
        Ok(())
    }
}

impl Appointment {
    /// Create a new scheduled appointment.
    pub fn new(input: AppointmentInput) -> Self {
        let now = Utc::now();
        let mut appointment = Self {
            id: new_id(),
            patient_id: String::new(),
            doctor_id: String::new(),
            room_id: None,
            department_id: None,
            scheduled_at: input.scheduled_at,
            duration_minutes: DEFAULT_APPOINTMENT_MINUTES,
            appointment_type: AppointmentType::Consultation,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            calendar_event_id: None,
            created_at: now,
            updated_at: now,
        };
        appointment.apply(input);
        appointment
    }

    /// Overwrite bookable fields from a form submission.
    pub fn apply(&mut self, input: AppointmentInput) {
        self.patient_id = input.patient_id;
        self.doctor_id = input.doctor_id;
        self.room_id = clean(input.room_id);
        self.department_id = clean(input.department_id);
        self.scheduled_at = input.scheduled_at;
        self.duration_minutes = input.duration_minutes.unwrap_or(self.duration_minutes);
        self.appointment_type = input.appointment_type.unwrap_or(self.appointment_type);
        self.reason = clean(input.reason);
        self.notes = clean(input.notes);
        self.updated_at = Utc::now();
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether the two appointments occupy overlapping time.
    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.scheduled_at < other.ends_at() && other.scheduled_at < self.ends_at()
    }

    /// Compute which edits are allowed at `now`.
    pub fn edit_window(&self, now: DateTime<Utc>) -> EditWindow {
        if self.status.is_terminal() {
            EditWindow::Locked
        } else if self.status == AppointmentStatus::CheckedIn || now >= self.scheduled_at {
            EditWindow::StatusOnly
        } else {
            EditWindow::Open
        }
    }
}

/// Appointment joined with display names, as shown on schedule pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub doctor_name: String,
    pub room_name: Option<String>,
    /// Human label such as "Today" or "Mon, Jan 5"
    pub date_label: String,
}

/// Filters for listing appointments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

/// UTC instants bounding the clinic-local calendar day `[start, end)`.
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(
        &(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))),
    );
    (start, start + Duration::days(1))
}

/// Label a timestamp relative to `today`, both in the clinic's local offset.
///
/// Yields "Today", "Tomorrow" or "Yesterday" when applicable, otherwise a
/// short date such as "Mon, Jan 5", with the year appended when it differs
/// from `today`'s.
pub fn date_label(at: DateTime<Utc>, today: NaiveDate, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset).date_naive();
    match (local - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ if local.year() == today.year() => local.format("%a, %b %-d").to_string(),
        _ => local.format("%a, %b %-d, %Y").to_string(),
    }
}
