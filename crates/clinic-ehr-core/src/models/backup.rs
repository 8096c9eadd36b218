//! Backup log and schedule models.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, ValidationError};

text_enum! {
    pub enum BackupKind {
        Manual => "manual",
        Scheduled => "scheduled",
    }
}

text_enum! {
    pub enum BackupStatus {
        Success => "success",
        Failed => "failed",
    }
}

/// One backup attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupLog {
    pub id: String,
    /// Object name in the backup store
    pub file_name: String,
    pub kind: BackupKind,
    pub status: BackupStatus,
    pub size_bytes: i64,
    /// Hex SHA-256 of the stored object
    pub checksum: Option<String>,
    pub schedule_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BackupLog {
    pub fn succeeded(&self) -> bool {
        self.status == BackupStatus::Success
    }
}

text_enum! {
    pub enum BackupFrequency {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
    }
}

/// A recurring backup definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupSchedule {
    pub id: String,
    pub name: String,
    pub frequency: BackupFrequency,
    /// UTC time of day to run
    pub time_of_day: NaiveTime,
    /// Weekday for weekly schedules, 0 = Monday
    pub weekday: Option<u32>,
    /// Day of month for monthly schedules, 1..=28
    pub day_of_month: Option<u32>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupScheduleInput {
    pub name: String,
    pub frequency: BackupFrequency,
    pub time_of_day: NaiveTime,
    #[serde(default)]
    pub weekday: Option<u32>,
    #[serde(default)]
    pub day_of_month: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl BackupScheduleInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "is required"));
        }
        match self.frequency {
            BackupFrequency::Daily => {}
            BackupFrequency::Weekly => match self.weekday {
                Some(day) if day <= 6 => {}
                _ => {
                    return Err(ValidationError::new(
                        "weekday",
                        "weekly schedules need a weekday 0-6",
                    ))
                }
            },
            BackupFrequency::Monthly => match self.day_of_month {
                Some(day) if (1..=28).contains(&day) => {}
                _ => {
                    return Err(ValidationError::new(
                        "day_of_month",
                        "monthly schedules need a day 1-28",
                    ))
                }
            },
        }
        Ok(())
    }
}

impl BackupSchedule {
    pub fn new(input: BackupScheduleInput) -> Self {
        let mut schedule = Self {
            id: new_id(),
            name: String::new(),
            frequency: input.frequency,
            time_of_day: input.time_of_day,
            weekday: None,
            day_of_month: None,
            enabled: true,
            last_run_at: None,
            created_at: Utc::now(),
        };
        schedule.apply(input);
        schedule
    }

    pub fn apply(&mut self, input: BackupScheduleInput) {
        self.name = input.name.trim().to_string();
        self.frequency = input.frequency;
        self.time_of_day = input.time_of_day;
        self.weekday = input.weekday;
        self.day_of_month = input.day_of_month;
        self.enabled = input.enabled;
    }
}
