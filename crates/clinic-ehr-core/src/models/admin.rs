//! Administrative models: staff users, departments, rooms, clinic settings
//! and deployment staging.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};
use crate::access::Role;

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<String>,
    pub phone: Option<String>,
    /// Deactivated users keep their history but cannot act
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInput {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl UserInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.email.contains('@') {
            return Err(ValidationError::new("email", "is not a valid address"));
        }
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::new("full_name", "is required"));
        }
        Ok(())
    }
}

impl User {
    pub fn new(input: UserInput) -> Self {
        let now = Utc::now();
        let mut user = Self {
            id: new_id(),
            email: String::new(),
            full_name: String::new(),
            role: input.role,
            department_id: None,
            phone: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        user.apply(input);
        user
    }

    /// Emails are stored lowercased so uniqueness is case-insensitive.
    pub fn apply(&mut self, input: UserInput) {
        self.email = input.email.trim().to_lowercase();
        self.full_name = input.full_name.trim().to_string();
        self.role = input.role;
        self.department_id = clean(input.department_id);
        self.phone = clean(input.phone);
        self.updated_at = Utc::now();
    }
}

/// A clinic department (e.g. "Pediatrics").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl DepartmentInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "is required"));
        }
        Ok(())
    }
}

impl Department {
    pub fn new(input: DepartmentInput) -> Self {
        let mut department = Self {
            id: new_id(),
            name: String::new(),
            description: None,
            created_at: Utc::now(),
        };
        department.apply(input);
        department
    }

    pub fn apply(&mut self, input: DepartmentInput) {
        self.name = input.name.trim().to_string();
        self.description = clean(input.description);
    }
}

/// A consultation or procedure room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
    /// Free text kind, e.g. "consultation", "lab", "ward"
    pub room_type: Option<String>,
    pub capacity: u32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomInput {
    pub name: String,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_capacity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl RoomInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "is required"));
        }
        if self.capacity == 0 {
            return Err(ValidationError::new("capacity", "must be at least 1"));
        }
        Ok(())
    }
}

impl Room {
    pub fn new(input: RoomInput) -> Self {
        let mut room = Self {
            id: new_id(),
            name: String::new(),
            department_id: None,
            room_type: None,
            capacity: 1,
            available: true,
            created_at: Utc::now(),
        };
        room.apply(input);
        room
    }

    pub fn apply(&mut self, input: RoomInput) {
        self.name = input.name.trim().to_string();
        self.department_id = clean(input.department_id);
        self.room_type = clean(input.room_type);
        self.capacity = input.capacity;
        self.available = input.available;
    }
}

/// Clinic-wide settings (single row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicSettings {
    pub clinic_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// ISO 4217 code used on receipts
    pub currency: String,
    /// Clinic local time offset from UTC, in minutes
    pub utc_offset_minutes: i32,
    pub default_appointment_minutes: u32,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            clinic_name: "Clinic".to_string(),
            address: None,
            phone: None,
            email: None,
            currency: "USD".to_string(),
            utc_offset_minutes: 0,
            default_appointment_minutes: super::DEFAULT_APPOINTMENT_MINUTES,
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            closing_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            updated_at: None,
        }
    }
}

impl ClinicSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.clinic_name.trim().is_empty() {
            return Err(ValidationError::new("clinic_name", "is required"));
        }
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ValidationError::new(
                "utc_offset_minutes",
                "must be within +/- 14 hours",
            ));
        }
        if self.opening_time >= self.closing_time {
            return Err(ValidationError::new(
                "closing_time",
                "must be after opening time",
            ));
        }
        Ok(())
    }

    /// Local offset for labels and day boundaries.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Today's date in clinic local time.
    pub fn today(&self, now: DateTime<Utc>) -> chrono::NaiveDate {
        now.with_timezone(&self.offset()).date_naive()
    }
}

text_enum! {
    pub enum DeploymentStatus {
        Staged => "staged",
        Live => "live",
        Superseded => "superseded",
        RolledBack => "rolled_back",
    }
}

/// A release recorded through the staging workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub id: String,
    pub version: String,
    pub notes: Option<String>,
    pub status: DeploymentStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl Deployment {
    pub fn staged(version: String, notes: Option<String>, created_by: String) -> Self {
        Self {
            id: new_id(),
            version: version.trim().to_string(),
            notes: clean(notes),
            status: DeploymentStatus::Staged,
            created_by,
            created_at: Utc::now(),
            promoted_at: None,
            rolled_back_at: None,
        }
    }
}
