//! Medical records and lab tests.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};

/// A visit note written by a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    /// Vital signs as a free-form JSON object (e.g. `{"bp": "120/80"}`)
    pub vitals: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecordInput {
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub chief_complaint: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub vitals: Option<serde_json::Value>,
}

impl MedicalRecordInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id.trim().is_empty() {
            return Err(ValidationError::new("patient_id", "is required"));
        }
        if self.doctor_id.trim().is_empty() {
            return Err(ValidationError::new("doctor_id", "is required"));
        }
        match &self.vitals {
            None | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(ValidationError::new("vitals", "must be an object")),
        }
    }
}

impl MedicalRecord {
    pub fn new(input: MedicalRecordInput) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: new_id(),
            patient_id: String::new(),
            doctor_id: String::new(),
            appointment_id: None,
            visit_date: input.visit_date,
            chief_complaint: None,
            diagnosis: None,
            treatment: None,
            notes: None,
            vitals: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        };
        record.apply(input);
        record
    }

    pub fn apply(&mut self, input: MedicalRecordInput) {
        self.patient_id = input.patient_id;
        self.doctor_id = input.doctor_id;
        self.appointment_id = clean(input.appointment_id);
        self.visit_date = input.visit_date;
        self.chief_complaint = clean(input.chief_complaint);
        self.diagnosis = clean(input.diagnosis);
        self.treatment = clean(input.treatment);
        self.notes = clean(input.notes);
        self.vitals = input
            .vitals
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        self.updated_at = Utc::now();
    }
}

text_enum! {
    pub enum LabTestStatus {
        Ordered => "ordered",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum LabPriority {
        Routine => "routine",
        Urgent => "urgent",
        Stat => "stat",
    }
}

impl LabTestStatus {
    pub fn can_transition_to(&self, next: LabTestStatus) -> bool {
        use LabTestStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Ordered => matches!(next, InProgress | Completed | Cancelled),
            InProgress => matches!(next, Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }
}

/// A lab test ordered for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabTest {
    pub id: String,
    pub patient_id: String,
    /// User who ordered the test
    pub ordered_by: String,
    pub test_name: String,
    pub category: Option<String>,
    pub priority: LabPriority,
    pub status: LabTestStatus,
    pub result: Option<String>,
    pub reference_range: Option<String>,
    /// Technician who recorded the result
    pub performed_by: Option<String>,
    pub notes: Option<String>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabTestInput {
    pub patient_id: String,
    pub ordered_by: String,
    pub test_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<LabPriority>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LabTestInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id.trim().is_empty() {
            return Err(ValidationError::new("patient_id", "is required"));
        }
        if self.test_name.trim().is_empty() {
            return Err(ValidationError::new("test_name", "is required"));
        }
        Ok(())
    }
}

impl LabTest {
    pub fn new(input: LabTestInput) -> Self {
        let now = Utc::now();
        let mut test = Self {
            id: new_id(),
            patient_id: String::new(),
            ordered_by: String::new(),
            test_name: String::new(),
            category: None,
            priority: LabPriority::Routine,
            status: LabTestStatus::Ordered,
            result: None,
            reference_range: None,
            performed_by: None,
            notes: None,
            ordered_at: now,
            completed_at: None,
            updated_at: now,
        };
        test.apply(input);
        test
    }

    pub fn apply(&mut self, input: LabTestInput) {
        self.patient_id = input.patient_id;
        self.ordered_by = input.ordered_by;
        self.test_name = input.test_name.trim().to_string();
        self.category = clean(input.category);
        self.priority = input.priority.unwrap_or(self.priority);
        self.reference_range = clean(input.reference_range);
        self.notes = clean(input.notes);
        self.updated_at = Utc::now();
    }
}

/// Filters for listing lab tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabTestFilter {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<LabTestStatus>,
}
