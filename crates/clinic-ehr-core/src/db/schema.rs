//! SQLite schema definition.

/// Complete database schema for the clinic EHR.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Staff & Organisation
-- ============================================================================

CREATE TABLE IF NOT EXISTS departments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN (
        'admin', 'doctor', 'nurse', 'receptionist',
        'pharmacist', 'lab_technician', 'accountant'
    )),
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    phone TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    room_type TEXT,
    capacity INTEGER NOT NULL DEFAULT 1,
    available INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    mrn TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT,
    gender TEXT CHECK (gender IN ('male', 'female', 'other')),
    phone TEXT,
    email TEXT,
    address TEXT,
    blood_group TEXT,
    allergies TEXT,
    emergency_contact_name TEXT,
    emergency_contact_phone TEXT,
    insurance_provider TEXT,
    insurance_number TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name);
CREATE INDEX IF NOT EXISTS idx_patients_phone ON patients(phone);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES users(id),
    room_id TEXT REFERENCES rooms(id) ON DELETE SET NULL,
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    scheduled_at TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
    appointment_type TEXT NOT NULL CHECK (appointment_type IN (
        'consultation', 'follow_up', 'procedure', 'lab_visit', 'emergency'
    )),
    status TEXT NOT NULL DEFAULT 'scheduled' CHECK (status IN (
        'scheduled', 'confirmed', 'checked_in', 'completed', 'cancelled', 'no_show'
    )),
    reason TEXT,
    notes TEXT,
    calendar_event_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_scheduled ON appointments(scheduled_at);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_id, scheduled_at);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);

-- ============================================================================
-- Clinical
-- ============================================================================

CREATE TABLE IF NOT EXISTS medical_records (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES users(id),
    appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
    visit_date TEXT NOT NULL,
    chief_complaint TEXT,
    diagnosis TEXT,
    treatment TEXT,
    notes TEXT,
    vitals TEXT NOT NULL DEFAULT '{}',            -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_patient ON medical_records(patient_id, visit_date);

CREATE TABLE IF NOT EXISTS lab_tests (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    ordered_by TEXT NOT NULL REFERENCES users(id),
    test_name TEXT NOT NULL,
    category TEXT,
    priority TEXT NOT NULL DEFAULT 'routine' CHECK (priority IN ('routine', 'urgent', 'stat')),
    status TEXT NOT NULL DEFAULT 'ordered' CHECK (status IN (
        'ordered', 'in_progress', 'completed', 'cancelled'
    )),
    result TEXT,
    reference_range TEXT,
    performed_by TEXT REFERENCES users(id),
    notes TEXT,
    ordered_at TEXT NOT NULL,
    completed_at TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lab_tests_status ON lab_tests(status);
CREATE INDEX IF NOT EXISTS idx_lab_tests_patient ON lab_tests(patient_id);

-- ============================================================================
-- Pharmacy
-- ============================================================================

CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    generic_name TEXT,
    category TEXT,
    form TEXT,
    strength TEXT,
    unit TEXT NOT NULL,
    stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
    reorder_level INTEGER NOT NULL DEFAULT 0 CHECK (reorder_level >= 0),
    unit_price_cents INTEGER NOT NULL DEFAULT 0 CHECK (unit_price_cents >= 0),
    expiry_date TEXT,
    supplier TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name);

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES users(id),
    medication_id TEXT NOT NULL REFERENCES medications(id),
    medical_record_id TEXT REFERENCES medical_records(id) ON DELETE SET NULL,
    dosage TEXT NOT NULL,
    frequency TEXT NOT NULL,
    duration_days INTEGER,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    instructions TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'dispensed', 'cancelled')),
    prescribed_at TEXT NOT NULL,
    dispensed_at TEXT,
    dispensed_by TEXT REFERENCES users(id),
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);

-- ============================================================================
-- Payments
-- ============================================================================

CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    method TEXT NOT NULL CHECK (method IN (
        'cash', 'card', 'insurance', 'mobile_money', 'bank_transfer'
    )),
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN (
        'pending', 'paid', 'refunded', 'cancelled'
    )),
    description TEXT,
    reference TEXT,
    paid_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_created ON payments(created_at);
CREATE INDEX IF NOT EXISTS idx_payments_patient ON payments(patient_id);

-- ============================================================================
-- Settings
-- ============================================================================

-- Single row, created on first save
CREATE TABLE IF NOT EXISTS clinic_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    clinic_name TEXT NOT NULL,
    address TEXT,
    phone TEXT,
    email TEXT,
    currency TEXT NOT NULL,
    utc_offset_minutes INTEGER NOT NULL,
    default_appointment_minutes INTEGER NOT NULL,
    opening_time TEXT NOT NULL,
    closing_time TEXT NOT NULL,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS deployments (
    id TEXT PRIMARY KEY,
    version TEXT NOT NULL,
    notes TEXT,
    status TEXT NOT NULL CHECK (status IN ('staged', 'live', 'superseded', 'rolled_back')),
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    promoted_at TEXT,
    rolled_back_at TEXT
);

-- At most one live deployment
CREATE UNIQUE INDEX IF NOT EXISTS idx_deployments_single_live
    ON deployments(status) WHERE status = 'live';

-- ============================================================================
-- Backups
-- ============================================================================

CREATE TABLE IF NOT EXISTS backup_schedules (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    frequency TEXT NOT NULL CHECK (frequency IN ('daily', 'weekly', 'monthly')),
    time_of_day TEXT NOT NULL,
    weekday INTEGER CHECK (weekday BETWEEN 0 AND 6),
    day_of_month INTEGER CHECK (day_of_month BETWEEN 1 AND 28),
    enabled INTEGER NOT NULL DEFAULT 1,
    last_run_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS backup_logs (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('manual', 'scheduled')),
    status TEXT NOT NULL CHECK (status IN ('success', 'failed')),
    size_bytes INTEGER NOT NULL DEFAULT 0,
    checksum TEXT,
    schedule_id TEXT REFERENCES backup_schedules(id) ON DELETE SET NULL,
    error TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_backup_logs_created ON backup_logs(created_at);

-- ============================================================================
-- Calendar Integration
-- ============================================================================

-- Single row, created on first connect
CREATE TABLE IF NOT EXISTS calendar_integration (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    calendar_id TEXT NOT NULL DEFAULT 'primary',
    access_token TEXT,
    refresh_token TEXT,
    token_expires_at TEXT,
    connected_email TEXT,
    enabled INTEGER NOT NULL DEFAULT 0,
    last_synced_at TEXT,
    updated_at TEXT
);
"#;

/// Tables captured in backup snapshots, in foreign-key dependency order.
///
/// Backup bookkeeping and calendar credentials are not captured.
pub const SNAPSHOT_TABLES: &[&str] = &[
    "departments",
    "users",
    "rooms",
    "patients",
    "appointments",
    "medical_records",
    "lab_tests",
    "medications",
    "prescriptions",
    "payments",
    "clinic_settings",
    "deployments",
];
