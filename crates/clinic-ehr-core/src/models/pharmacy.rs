//! Pharmacy inventory and prescriptions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};

/// A stocked medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: String,
    /// Brand or display name
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    /// Dosage form (e.g. "tablet", "syrup")
    pub form: Option<String>,
    /// Strength (e.g. "500mg")
    pub strength: Option<String>,
    /// Dispensing unit (e.g. "tablet", "ml")
    pub unit: String,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub unit_price_cents: i64,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationInput {
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub supplier: Option<String>,
}

impl MedicationInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "is required"));
        }
        if self.unit.trim().is_empty() {
            return Err(ValidationError::new("unit", "is required"));
        }
        if self.stock_quantity < 0 {
            return Err(ValidationError::new("stock_quantity", "cannot be negative"));
        }
        if self.reorder_level < 0 {
            return Err(ValidationError::new("reorder_level", "cannot be negative"));
        }
        if self.unit_price_cents < 0 {
            return Err(ValidationError::new("unit_price_cents", "cannot be negative"));
        }
        Ok(())
    }
}

impl Medication {
    pub fn new(input: MedicationInput) -> Self {
        let now = Utc::now();
        let mut medication = Self {
            id: new_id(),
            name: String::new(),
            generic_name: None,
            category: None,
            form: None,
            strength: None,
            unit: String::new(),
            stock_quantity: 0,
            reorder_level: 0,
            unit_price_cents: 0,
            expiry_date: None,
            supplier: None,
            created_at: now,
            updated_at: now,
        };
        medication.apply(input);
        medication
    }

    pub fn apply(&mut self, input: MedicationInput) {
        self.name = input.name.trim().to_string();
        self.generic_name = clean(input.generic_name);
        self.category = clean(input.category);
        self.form = clean(input.form);
        self.strength = clean(input.strength);
        self.unit = input.unit.trim().to_string();
        self.stock_quantity = input.stock_quantity;
        self.reorder_level = input.reorder_level;
        self.unit_price_cents = input.unit_price_cents;
        self.expiry_date = input.expiry_date;
        self.supplier = clean(input.supplier);
        self.updated_at = Utc::now();
    }

    /// At or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }

    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= date)
    }
}

text_enum! {
    pub enum PrescriptionStatus {
        Active => "active",
        Dispensed => "dispensed",
        Cancelled => "cancelled",
    }
}

/// A medication prescribed to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub medication_id: String,
    pub medical_record_id: Option<String>,
    /// Dose per administration (e.g. "1 tablet")
    pub dosage: String,
    /// Frequency (e.g. "twice daily")
    pub frequency: String,
    pub duration_days: Option<u32>,
    /// Units to dispense
    pub quantity: i64,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub prescribed_at: DateTime<Utc>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub dispensed_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionInput {
    pub patient_id: String,
    pub doctor_id: String,
    pub medication_id: String,
    #[serde(default)]
    pub medical_record_id: Option<String>,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub duration_days: Option<u32>,
    pub quantity: i64,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl PrescriptionInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.medication_id.trim().is_empty() {
            return Err(ValidationError::new("medication_id", "is required"));
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::new("dosage", "is required"));
        }
        if self.frequency.trim().is_empty() {
            return Err(ValidationError::new("frequency", "is required"));
        }
        if self.quantity <= 0 {
            return Err(ValidationError::new("quantity", "must be positive"));
        }
        Ok(())
    }
}

impl Prescription {
    pub fn new(input: PrescriptionInput) -> Self {
        let now = Utc::now();
        let mut prescription = Self {
            id: new_id(),
            patient_id: String::new(),
            doctor_id: String::new(),
            medication_id: String::new(),
            medical_record_id: None,
            dosage: String::new(),
            frequency: String::new(),
            duration_days: None,
            quantity: 0,
            instructions: None,
            status: PrescriptionStatus::Active,
            prescribed_at: now,
            dispensed_at: None,
            dispensed_by: None,
            updated_at: now,
        };
        prescription.apply(input);
        prescription
    }

    pub fn apply(&mut self, input: PrescriptionInput) {
        self.patient_id = input.patient_id;
        self.doctor_id = input.doctor_id;
        self.medication_id = input.medication_id;
        self.medical_record_id = clean(input.medical_record_id);
        self.dosage = input.dosage.trim().to_string();
        self.frequency = input.frequency.trim().to_string();
        self.duration_days = input.duration_days;
        self.quantity = input.quantity;
        self.instructions = clean(input.instructions);
        self.updated_at = Utc::now();
    }
}

/// Prescription joined with patient and medication names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionView {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub patient_name: String,
    pub medication_name: String,
}

/// Filters for listing prescriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionFilter {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<PrescriptionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medication(stock: i64, reorder: i64) -> Medication {
        Medication::new(MedicationInput {
            name: "Amoxil".into(),
            generic_name: Some("Amoxicillin".into()),
            category: None,
            form: Some("capsule".into()),
            strength: Some("500mg".into()),
            unit: "capsule".into(),
            stock_quantity: stock,
            reorder_level: reorder,
            unit_price_cents: 25,
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 31),
            supplier: None,
        })
    }

    #[test]
    fn test_low_stock() {
        assert!(medication(10, 10).is_low_stock());
        assert!(!medication(11, 10).is_low_stock());
    }

    #[test]
    fn test_expired_on() {
        let med = medication(10, 5);
        assert!(!med.is_expired_on(NaiveDate::from_ymd_opt(2027, 1, 30).unwrap()));
        assert!(med.is_expired_on(NaiveDate::from_ymd_opt(2027, 1, 31).unwrap()));
    }

    #[test]
    fn test_medication_validation() {
        let mut input = MedicationInput {
            name: "Amoxil".into(),
            generic_name: None,
            category: None,
            form: None,
            strength: None,
            unit: "capsule".into(),
            stock_quantity: -1,
            reorder_level: 0,
            unit_price_cents: 0,
            expiry_date: None,
            supplier: None,
        };
        assert_eq!(input.validate().unwrap_err().field, "stock_quantity");
        input.stock_quantity = 0;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_prescription_requires_positive_quantity() {
        let input = PrescriptionInput {
            patient_id: "p1".into(),
            doctor_id: "d1".into(),
            medication_id: "m1".into(),
            medical_record_id: None,
            dosage: "1 capsule".into(),
            frequency: "three times daily".into(),
            duration_days: Some(7),
            quantity: 0,
            instructions: None,
        };
        assert_eq!(input.validate().unwrap_err().field, "quantity");
    }
}
