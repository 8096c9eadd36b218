//! Clinic EHR Core Library
//!
//! Records, scheduling, pharmacy, billing and backups for a small clinic,
//! on an embedded SQLite database.
//!
//! # Architecture
//!
//! ```text
//!   HTTP handlers (clinic-ehr-server)
//!              │
//!     access::Role::can(action, resource)
//!              │
//!   ┌──────────▼───────────┐
//!   │   db::Database       │  CRUD + rules (edit window, stock, transitions)
//!   └──────────┬───────────┘
//!              │
//!   ┌──────────┼───────────────┬──────────────────┐
//!   ▼          ▼               ▼                  ▼
//! reports   export         backup             search
//! summary   payments CSV   snapshot/restore   medication
//!                          schedules          fuzzy match
//!                          retention
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer, one file per table group
//! - [`models`]: Domain types (Patient, Appointment, Prescription, etc.)
//! - [`access`]: Role permission matrix
//! - [`backup`]: Snapshots, backup store, schedules and GFS retention
//! - [`export`]: Payment export as JSON or CSV
//! - [`reports`]: Period summaries for the dashboard
//! - [`search`]: Fuzzy medication lookup

#[macro_use]
pub mod models;

pub mod access;
pub mod backup;
pub mod db;
pub mod export;
pub mod reports;
pub mod search;

// Re-export commonly used types
pub use access::{Action, Resource, Role};
pub use backup::{BackupError, BackupManager, BackupStore, FsBackupStore, RetentionPolicy};
pub use db::{Database, DbError, DbResult};
pub use export::{PaymentExport, PaymentExporter};
pub use reports::{clinic_summary, ClinicSummary};
pub use search::MedicationMatch;
