//! Payment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, new_id, ValidationError};

text_enum! {
    pub enum PaymentMethod {
        Cash => "cash",
        Card => "card",
        Insurance => "insurance",
        MobileMoney => "mobile_money",
        BankTransfer => "bank_transfer",
    }
}

text_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Refunded => "refunded",
        Cancelled => "cancelled",
    }
}

/// A charge against a patient, optionally tied to an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    /// Amount in minor currency units
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub description: Option<String>,
    /// Receipt / transaction reference
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInput {
    pub patient_id: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl PaymentInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id.trim().is_empty() {
            return Err(ValidationError::new("patient_id", "is required"));
        }
        if self.amount_cents <= 0 {
            return Err(ValidationError::new("amount_cents", "must be positive"));
        }
        Ok(())
    }
}

impl Payment {
    pub fn new(input: PaymentInput) -> Self {
        let now = Utc::now();
        let mut payment = Self {
            id: new_id(),
            patient_id: String::new(),
            appointment_id: None,
            amount_cents: 0,
            method: input.method,
            status: PaymentStatus::Pending,
            description: None,
            reference: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        payment.apply(input);
        payment
    }

    /// Apply a form submission. Moving to `paid` stamps `paid_at` once.
    pub fn apply(&mut self, input: PaymentInput) {
        self.patient_id = input.patient_id;
        self.appointment_id = clean(input.appointment_id);
        self.amount_cents = input.amount_cents;
        self.method = input.method;
        self.description = clean(input.description);
        self.reference = clean(input.reference);
        if let Some(status) = input.status {
            self.set_status(status);
        }
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: PaymentStatus) {
        if status == PaymentStatus::Paid && self.paid_at.is_none() {
            self.paid_at = Some(Utc::now());
        }
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Payment joined with the payer's name and MRN, for lists and exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub patient_name: String,
    pub patient_mrn: String,
}

/// Filters for listing payments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFilter {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    /// Inclusive lower bound on `created_at`
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}
