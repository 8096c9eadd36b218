//! Patient models.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};

text_enum! {
    /// Administrative gender as captured at registration.
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Row ID
    pub id: String,
    /// Medical record number shown on cards and labels
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Blood group (e.g. "O+")
    pub blood_group: Option<String>,
    /// Known allergies, free text
    pub allergies: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration / edit form for a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub insurance_provider: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
}

impl PatientInput {
    /// Field checks the registration form performs before saving.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::new("first_name", "is required"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::new("last_name", "is required"));
        }
        if let Some(dob) = self.date_of_birth {
            if dob > today {
                return Err(ValidationError::new(
                    "date_of_birth",
                    "cannot be in the future",
                ));
            }
        }
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() && !email.contains('@') {
                return Err(ValidationError::new("email", "is not a valid address"));
            }
        }
        Ok(())
    }
}

impl Patient {
    /// Create a new patient from a registration form.
    pub fn new(input: PatientInput) -> Self {
        let now = Utc::now();
        let id = new_id();
        let mrn = format!(
            "MRN-{}-{}",
            now.format("%Y%m%d"),
            id[..6].to_uppercase()
        );
        let mut patient = Self {
            id,
            mrn,
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            gender: None,
            phone: None,
            email: None,
            address: None,
            blood_group: None,
            allergies: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            insurance_provider: None,
            insurance_number: None,
            created_at: now,
            updated_at: now,
        };
        patient.apply(input);
        patient
    }

    /// Overwrite editable fields from a form submission.
    pub fn apply(&mut self, input: PatientInput) {
        self.first_name = input.first_name.trim().to_string();
        self.last_name = input.last_name.trim().to_string();
        self.date_of_birth = input.date_of_birth;
        self.gender = input.gender;
        self.phone = clean(input.phone);
        self.email = clean(input.email);
        self.address = clean(input.address);
        self.blood_group = clean(input.blood_group);
        self.allergies = clean(input.allergies);
        self.emergency_contact_name = clean(input.emergency_contact_name);
        self.emergency_contact_phone = clean(input.emergency_contact_phone);
        self.insurance_provider = clean(input.insurance_provider);
        self.insurance_number = clean(input.insurance_number);
        self.updated_at = Utc::now();
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given date, if date of birth is known.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        if dob > date {
            return None;
        }
        let mut years = date.year() - dob.year();
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}
