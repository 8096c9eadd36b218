//! End-to-end clinic day: register, book, see, prescribe, dispense, bill.

use chrono::{Duration, Utc};
use clinic_ehr_core::db::{Database, DbError};
use clinic_ehr_core::export::PaymentExporter;
use clinic_ehr_core::models::{
    AppointmentFilter, AppointmentInput, AppointmentStatus, ClinicSettings, EditWindow,
    LabTest, LabTestInput, LabTestStatus, MedicalRecord, MedicalRecordInput, Medication,
    MedicationInput, Patient, PatientInput, Payment, PaymentInput, PaymentMethod,
    PaymentStatus, Prescription, PrescriptionFilter, PrescriptionInput, PrescriptionStatus,
    User, UserInput,
};
use clinic_ehr_core::reports::clinic_summary;
use clinic_ehr_core::Role;

struct Clinic {
    db: Database,
    patient: Patient,
    doctor: User,
    pharmacist: User,
}

fn user(db: &Database, email: &str, name: &str, role: Role) -> User {
    let user = User::new(UserInput {
        email: email.into(),
        full_name: name.into(),
        role,
        department_id: None,
        phone: None,
    });
    db.insert_user(&user).unwrap();
    user
}

fn open_clinic() -> Clinic {
    let db = Database::open_in_memory().unwrap();
    let patient = Patient::new(PatientInput {
        first_name: "Amina".into(),
        last_name: "Okafor".into(),
        phone: Some("+234 803 555 0101".into()),
        ..Default::default()
    });
    db.insert_patient(&patient).unwrap();
    let doctor = user(&db, "ade@clinic.org", "Dr. Ade Bello", Role::Doctor);
    let pharmacist = user(&db, "ngozi@clinic.org", "Ngozi Eze", Role::Pharmacist);
    Clinic {
        db,
        patient,
        doctor,
        pharmacist,
    }
}

fn booking(clinic: &Clinic, minutes_from_now: i64) -> AppointmentInput {
    AppointmentInput {
        patient_id: clinic.patient.id.clone(),
        doctor_id: clinic.doctor.id.clone(),
        room_id: None,
        department_id: None,
        scheduled_at: Utc::now() + Duration::minutes(minutes_from_now),
        duration_minutes: Some(20),
        appointment_type: None,
        reason: Some("Fever for three days".into()),
        notes: None,
    }
}

#[test]
fn test_visit_from_booking_to_payment() {
    let mut clinic = open_clinic();
    let settings = ClinicSettings::default();

    // Booking
    let appt = clinic.db.book_appointment(booking(&clinic, 60)).unwrap();
    assert_eq!(appt.edit_window(Utc::now()), EditWindow::Open);
    let views = clinic
        .db
        .list_appointment_views(
            &AppointmentFilter {
                patient_id: Some(clinic.patient.id.clone()),
                ..Default::default()
            },
            &settings,
            Utc::now(),
        )
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].patient_name, "Amina Okafor");
    assert_eq!(views[0].doctor_name, "Dr. Ade Bello");

    // Visit
    clinic
        .db
        .set_appointment_status(&appt.id, AppointmentStatus::CheckedIn)
        .unwrap();
    let record = MedicalRecord::new(MedicalRecordInput {
        patient_id: clinic.patient.id.clone(),
        doctor_id: clinic.doctor.id.clone(),
        appointment_id: Some(appt.id.clone()),
        visit_date: Utc::now().date_naive(),
        chief_complaint: Some("Fever".into()),
        diagnosis: Some("Malaria".into()),
        treatment: Some("ACT course".into()),
        notes: None,
        vitals: Some(serde_json::json!({ "temp_c": 38.9, "pulse": 104 })),
    });
    clinic.db.insert_medical_record(&record).unwrap();

    let lab = LabTest::new(LabTestInput {
        patient_id: clinic.patient.id.clone(),
        ordered_by: clinic.doctor.id.clone(),
        test_name: "Malaria RDT".into(),
        category: None,
        priority: None,
        reference_range: None,
        notes: None,
    });
    clinic.db.insert_lab_test(&lab).unwrap();
    let tech = user(&clinic.db, "femi@clinic.org", "Femi Ojo", Role::LabTechnician);
    let lab = clinic
        .db
        .record_lab_result(&lab.id, "Positive (P. falciparum)", &tech.id)
        .unwrap();
    assert_eq!(lab.status, LabTestStatus::Completed);

    // Prescribe and dispense
    let medication = Medication::new(MedicationInput {
        name: "Coartem".into(),
        generic_name: Some("Artemether/Lumefantrine".into()),
        category: Some("Antimalarial".into()),
        form: Some("tablet".into()),
        strength: Some("20/120mg".into()),
        unit: "tablet".into(),
        stock_quantity: 30,
        reorder_level: 24,
        unit_price_cents: 80,
        expiry_date: None,
        supplier: None,
    });
    clinic.db.insert_medication(&medication).unwrap();

    let rx = Prescription::new(PrescriptionInput {
        patient_id: clinic.patient.id.clone(),
        doctor_id: clinic.doctor.id.clone(),
        medication_id: medication.id.clone(),
        medical_record_id: Some(record.id.clone()),
        dosage: "4 tablets".into(),
        frequency: "twice daily".into(),
        duration_days: Some(3),
        quantity: 24,
        instructions: Some("Take with food".into()),
    });
    clinic.db.insert_prescription(&rx).unwrap();

    let pharmacist_id = clinic.pharmacist.id.clone();
    let dispensed = clinic.db.dispense_prescription(&rx.id, &pharmacist_id).unwrap();
    assert_eq!(dispensed.status, PrescriptionStatus::Dispensed);
    let stock = clinic.db.get_medication(&medication.id).unwrap().unwrap();
    assert_eq!(stock.stock_quantity, 6);
    assert!(stock.is_low_stock());

    clinic
        .db
        .set_appointment_status(&appt.id, AppointmentStatus::Completed)
        .unwrap();

    // Bill
    let payment = Payment::new(PaymentInput {
        patient_id: clinic.patient.id.clone(),
        appointment_id: Some(appt.id.clone()),
        amount_cents: 4420,
        method: PaymentMethod::MobileMoney,
        status: None,
        description: Some("Consultation and Coartem".into()),
        reference: None,
    });
    clinic.db.insert_payment(&payment).unwrap();
    let paid = clinic.db.mark_paid(&payment.id).unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());

    // Reporting
    let from = Utc::now() - Duration::days(1);
    let to = Utc::now() + Duration::days(1);
    let summary = clinic_summary(&clinic.db, from, to, &settings).unwrap();
    assert_eq!(summary.new_patients, 1);
    assert_eq!(summary.appointments_by_status["completed"], 1);
    assert_eq!(summary.lab_tests_by_status["completed"], 1);
    assert_eq!(summary.prescriptions_issued, 1);
    assert_eq!(summary.prescriptions_dispensed, 1);
    assert_eq!(summary.revenue_cents, 4420);
    assert_eq!(summary.low_stock_count, 1);

    let csv = PaymentExporter::new(&clinic.db).export_range(from, to).unwrap().to_csv();
    assert!(csv.contains("44.20"));
}

#[test]
fn test_completed_appointment_is_locked() {
    let clinic = open_clinic();
    let appt = clinic.db.book_appointment(booking(&clinic, 30)).unwrap();
    clinic
        .db
        .set_appointment_status(&appt.id, AppointmentStatus::CheckedIn)
        .unwrap();
    clinic
        .db
        .set_appointment_status(&appt.id, AppointmentStatus::Completed)
        .unwrap();

    let result = clinic.db.edit_appointment(&appt.id, booking(&clinic, 90), Utc::now());
    assert!(matches!(result, Err(DbError::Constraint(_))));

    let result = clinic
        .db
        .set_appointment_status(&appt.id, AppointmentStatus::Scheduled);
    assert!(matches!(result, Err(DbError::Constraint(_))));
}

#[test]
fn test_cancelled_slot_can_be_rebooked() {
    let clinic = open_clinic();
    let first = clinic.db.book_appointment(booking(&clinic, 120)).unwrap();
    assert!(matches!(
        clinic.db.book_appointment(booking(&clinic, 125)),
        Err(DbError::Conflict(_))
    ));

    clinic
        .db
        .set_appointment_status(&first.id, AppointmentStatus::Cancelled)
        .unwrap();
    clinic.db.book_appointment(booking(&clinic, 125)).unwrap();
}

#[test]
fn test_dispense_without_stock_changes_nothing() {
    let mut clinic = open_clinic();
    let medication = Medication::new(MedicationInput {
        name: "Amoxil".into(),
        generic_name: Some("Amoxicillin".into()),
        category: None,
        form: None,
        strength: Some("500mg".into()),
        unit: "capsule".into(),
        stock_quantity: 5,
        reorder_level: 10,
        unit_price_cents: 25,
        expiry_date: None,
        supplier: None,
    });
    clinic.db.insert_medication(&medication).unwrap();

    let rx = Prescription::new(PrescriptionInput {
        patient_id: clinic.patient.id.clone(),
        doctor_id: clinic.doctor.id.clone(),
        medication_id: medication.id.clone(),
        medical_record_id: None,
        dosage: "1 capsule".into(),
        frequency: "three times daily".into(),
        duration_days: Some(7),
        quantity: 21,
        instructions: None,
    });
    clinic.db.insert_prescription(&rx).unwrap();

    let pharmacist_id = clinic.pharmacist.id.clone();
    match clinic.db.dispense_prescription(&rx.id, &pharmacist_id) {
        Err(DbError::Constraint(msg)) => assert!(msg.contains("insufficient stock")),
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    let stock = clinic.db.get_medication(&medication.id).unwrap().unwrap();
    assert_eq!(stock.stock_quantity, 5);
    let views = clinic
        .db
        .list_prescriptions(&PrescriptionFilter {
            status: Some(PrescriptionStatus::Active),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].medication_name, "Amoxil");
}
