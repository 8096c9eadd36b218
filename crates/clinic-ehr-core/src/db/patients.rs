//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{conflict_on_unique, require_found, Database, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = r#"
    id, mrn, first_name, last_name, date_of_birth, gender, phone, email,
    address, blood_group, allergies, emergency_contact_name,
    emergency_contact_phone, insurance_provider, insurance_number,
    created_at, updated_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        mrn: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        date_of_birth: row.get(4)?,
        gender: row.get(5)?,
        phone: row.get(6)?,
        email: row.get(7)?,
        address: row.get(8)?,
        blood_group: row.get(9)?,
        allergies: row.get(10)?,
        emergency_contact_name: row.get(11)?,
        emergency_contact_phone: row.get(12)?,
        insurance_provider: row.get(13)?,
        insurance_number: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO patients ({PATIENT_COLUMNS}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    patient.id,
                    patient.mrn,
                    patient.first_name,
                    patient.last_name,
                    patient.date_of_birth,
                    patient.gender,
                    patient.phone,
                    patient.email,
                    patient.address,
                    patient.blood_group,
                    patient.allergies,
                    patient.emergency_contact_name,
                    patient.emergency_contact_phone,
                    patient.insurance_provider,
                    patient.insurance_number,
                    patient.created_at,
                    patient.updated_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "Patient"))?;
        Ok(())
    }

    /// Update an existing patient. The MRN never changes.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                date_of_birth = ?4,
                gender = ?5,
                phone = ?6,
                email = ?7,
                address = ?8,
                blood_group = ?9,
                allergies = ?10,
                emergency_contact_name = ?11,
                emergency_contact_phone = ?12,
                insurance_provider = ?13,
                insurance_number = ?14,
                updated_at = ?15
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth,
                patient.gender,
                patient.phone,
                patient.email,
                patient.address,
                patient.blood_group,
                patient.allergies,
                patient.emergency_contact_name,
                patient.emergency_contact_phone,
                patient.insurance_provider,
                patient.insurance_number,
                patient.updated_at,
            ],
        )?;
        require_found(rows_affected, "Patient", &patient.id)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients, most recently registered first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, last_name"
        ))?;
        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search patients by name, phone or MRN prefix (case-insensitive).
    ///
    /// A query with a space also matches "first last".
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query.trim().replace('%', "").replace('_', ""));
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patients
            WHERE first_name LIKE ?1
               OR last_name LIKE ?1
               OR (first_name || ' ' || last_name) LIKE ?1
               OR phone LIKE ?1
               OR mrn LIKE ?1
            ORDER BY last_name, first_name
            LIMIT ?2
            "#
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a patient and (by cascade) their clinical history.
    pub fn delete_patient(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        require_found(rows_affected, "Patient", id)
    }

    /// Count patients registered in `[from, to)`.
    pub fn count_patients_created_between(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM patients WHERE created_at >= ?1 AND created_at < ?2",
                params![from, to],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use crate::models::{Gender, PatientInput};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_patient(first: &str, last: &str) -> Patient {
        Patient::new(PatientInput {
            first_name: first.into(),
            last_name: last.into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = new_patient("Amina", "Okafor");
        patient.gender = Some(Gender::Female);
        patient.date_of_birth = chrono::NaiveDate::from_ymd_opt(1990, 6, 15);
        patient.phone = Some("+2348012345678".into());

        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved, patient);
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();

        let mut patient = new_patient("Amina", "Okafor");
        db.insert_patient(&patient).unwrap();

        patient.allergies = Some("Penicillin".into());
        patient.blood_group = Some("O+".into());
        db.update_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.allergies, Some("Penicillin".into()));
        assert_eq!(retrieved.blood_group, Some("O+".into()));
        assert_eq!(retrieved.mrn, patient.mrn);
    }

    #[test]
    fn test_update_missing_patient() {
        let db = setup_db();
        let patient = new_patient("Ghost", "Patient");
        assert!(matches!(db.update_patient(&patient), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();

        let mut a = new_patient("Amina", "Okafor");
        a.phone = Some("0803555".into());
        db.insert_patient(&a).unwrap();
        db.insert_patient(&new_patient("Aminu", "Bello")).unwrap();
        db.insert_patient(&new_patient("Chidi", "Okeke")).unwrap();

        assert_eq!(db.search_patients("amin", 10).unwrap().len(), 2);
        assert_eq!(db.search_patients("Ok", 10).unwrap().len(), 2);
        assert_eq!(db.search_patients("Amina Ok", 10).unwrap().len(), 1);
        assert_eq!(db.search_patients("0803", 10).unwrap()[0].id, a.id);
        assert_eq!(db.search_patients(&a.mrn, 10).unwrap()[0].id, a.id);
        assert_eq!(db.search_patients("amin", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_patient() {
        let db = setup_db();
        let patient = new_patient("Amina", "Okafor");
        db.insert_patient(&patient).unwrap();

        db.delete_patient(&patient.id).unwrap();
        assert!(db.get_patient(&patient.id).unwrap().is_none());
        assert!(matches!(
            db.delete_patient(&patient.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_mrn_conflicts() {
        let db = setup_db();
        let a = new_patient("Amina", "Okafor");
        let mut b = new_patient("Chidi", "Okeke");
        b.mrn = a.mrn.clone();
        db.insert_patient(&a).unwrap();
        assert!(matches!(db.insert_patient(&b), Err(DbError::Conflict(_))));
    }
}
