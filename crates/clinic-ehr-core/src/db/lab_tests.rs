//! Lab test database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};

use super::{require_found, Database, DbError, DbResult};
use crate::models::{LabTest, LabTestFilter, LabTestStatus};

const LAB_TEST_COLUMNS: &str = r#"
    id, patient_id, ordered_by, test_name, category, priority, status, result,
    reference_range, performed_by, notes, ordered_at, completed_at, updated_at
"#;

fn lab_test_from_row(row: &Row<'_>) -> rusqlite::Result<LabTest> {
    Ok(LabTest {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        ordered_by: row.get(2)?,
        test_name: row.get(3)?,
        category: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        result: row.get(7)?,
        reference_range: row.get(8)?,
        performed_by: row.get(9)?,
        notes: row.get(10)?,
        ordered_at: row.get(11)?,
        completed_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl Database {
    /// Order a lab test.
    pub fn insert_lab_test(&self, test: &LabTest) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO lab_tests ({LAB_TEST_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                test.id,
                test.patient_id,
                test.ordered_by,
                test.test_name,
                test.category,
                test.priority,
                test.status,
                test.result,
                test.reference_range,
                test.performed_by,
                test.notes,
                test.ordered_at,
                test.completed_at,
                test.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update the order details. Status and result go through
    /// [`Database::set_lab_test_status`] and [`Database::record_lab_result`].
    pub fn update_lab_test(&self, test: &LabTest) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE lab_tests SET
                test_name = ?2,
                category = ?3,
                priority = ?4,
                reference_range = ?5,
                notes = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                test.id,
                test.test_name,
                test.category,
                test.priority,
                test.reference_range,
                test.notes,
                test.updated_at,
            ],
        )?;
        require_found(rows_affected, "Lab test", &test.id)
    }

    pub fn get_lab_test(&self, id: &str) -> DbResult<Option<LabTest>> {
        self.conn
            .query_row(
                &format!("SELECT {LAB_TEST_COLUMNS} FROM lab_tests WHERE id = ?"),
                [id],
                lab_test_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List lab tests, newest order first.
    pub fn list_lab_tests(&self, filter: &LabTestFilter) -> DbResult<Vec<LabTest>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(patient_id) = &filter.patient_id {
            clauses.push("patient_id = ?");
            values.push(Box::new(patient_id.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Box::new(status));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LAB_TEST_COLUMNS} FROM lab_tests {where_sql} ORDER BY ordered_at DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), lab_test_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_lab_test(&self, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute("DELETE FROM lab_tests WHERE id = ?", [id])?;
        require_found(rows_affected, "Lab test", id)
    }

    /// Move a lab test through its workflow.
    pub fn set_lab_test_status(&self, id: &str, status: LabTestStatus) -> DbResult<LabTest> {
        let mut test = self
            .get_lab_test(id)?
            .ok_or_else(|| DbError::NotFound(format!("Lab test {id}")))?;

        if !test.status.can_transition_to(status) {
            return Err(DbError::Constraint(format!(
                "cannot change lab test from {} to {}",
                test.status, status
            )));
        }

        let now = Utc::now();
        if status == LabTestStatus::Completed && test.completed_at.is_none() {
            test.completed_at = Some(now);
        }
        test.status = status;
        test.updated_at = now;

        self.conn.execute(
            "UPDATE lab_tests SET status = ?2, completed_at = ?3, updated_at = ?4 WHERE id = ?1",
            params![test.id, test.status, test.completed_at, test.updated_at],
        )?;
        Ok(test)
    }

    /// Record the result and complete the test.
    ///
    /// Cancelled tests cannot take a result. A completed test may have its
    /// result corrected; `completed_at` keeps the first completion time.
    pub fn record_lab_result(
        &self,
        id: &str,
        result: &str,
        performed_by: &str,
    ) -> DbResult<LabTest> {
        let result = result.trim();
        if result.is_empty() {
            return Err(crate::models::ValidationError::new("result", "is required").into());
        }

        let mut test = self
            .get_lab_test(id)?
            .ok_or_else(|| DbError::NotFound(format!("Lab test {id}")))?;
        if test.status == LabTestStatus::Cancelled {
            return Err(DbError::Constraint("lab test was cancelled".into()));
        }

        let now = Utc::now();
        test.result = Some(result.to_string());
        test.performed_by = Some(performed_by.to_string());
        test.status = LabTestStatus::Completed;
        test.completed_at = test.completed_at.or(Some(now));
        test.updated_at = now;

        self.conn.execute(
            r#"
            UPDATE lab_tests SET
                result = ?2,
                performed_by = ?3,
                status = ?4,
                completed_at = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                test.id,
                test.result,
                test.performed_by,
                test.status,
                test.completed_at,
                test.updated_at,
            ],
        )?;
        Ok(test)
    }

    /// Lab test counts per status for tests ordered in `[from, to)`.
    pub fn count_lab_tests_by_status(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<(LabTestStatus, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT status, COUNT(*)
            FROM lab_tests
            WHERE ordered_at >= ?1 AND ordered_at < ?2
            GROUP BY status
            ORDER BY status
            "#,
        )?;
        let rows = stmt.query_map(params![from, to], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::models::{LabPriority, LabTestInput, Patient, PatientInput, User, UserInput};

    struct Fixture {
        db: Database,
        patient_id: String,
        doctor_id: String,
        tech_id: String,
    }

    fn user(db: &Database, email: &str, role: Role) -> String {
        let user = User::new(UserInput {
            email: email.into(),
            full_name: email.into(),
            role,
            department_id: None,
            phone: None,
        });
        db.insert_user(&user).unwrap();
        user.id
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(PatientInput {
            first_name: "Amina".into(),
            last_name: "Okafor".into(),
            ..Default::default()
        });
        db.insert_patient(&patient).unwrap();
        let doctor_id = user(&db, "doc@clinic.org", Role::Doctor);
        let tech_id = user(&db, "lab@clinic.org", Role::LabTechnician);
        Fixture {
            db,
            patient_id: patient.id,
            doctor_id,
            tech_id,
        }
    }

    fn order(f: &Fixture, name: &str) -> LabTest {
        let test = LabTest::new(LabTestInput {
            patient_id: f.patient_id.clone(),
            ordered_by: f.doctor_id.clone(),
            test_name: name.into(),
            category: Some("Hematology".into()),
            priority: Some(LabPriority::Urgent),
            reference_range: None,
            notes: None,
        });
        f.db.insert_lab_test(&test).unwrap();
        test
    }

    #[test]
    fn test_order_and_get() {
        let f = setup();
        let test = order(&f, "CBC");
        assert_eq!(f.db.get_lab_test(&test.id).unwrap().unwrap(), test);
    }

    #[test]
    fn test_record_result_completes() {
        let f = setup();
        let test = order(&f, "CBC");

        let done = f.db.record_lab_result(&test.id, " Hb 13.2 g/dL ", &f.tech_id).unwrap();
        assert_eq!(done.status, LabTestStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("Hb 13.2 g/dL"));
        assert!(done.completed_at.is_some());

        let stored = f.db.get_lab_test(&test.id).unwrap().unwrap();
        assert_eq!(stored.performed_by.as_deref(), Some(f.tech_id.as_str()));
    }

    #[test]
    fn test_record_result_rejected_when_cancelled() {
        let f = setup();
        let test = order(&f, "CBC");
        f.db.set_lab_test_status(&test.id, LabTestStatus::Cancelled).unwrap();

        let result = f.db.record_lab_result(&test.id, "Hb 13.2", &f.tech_id);
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_empty_result_rejected() {
        let f = setup();
        let test = order(&f, "CBC");
        assert!(matches!(
            f.db.record_lab_result(&test.id, "  ", &f.tech_id),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_status_workflow() {
        let f = setup();
        let test = order(&f, "CBC");
        f.db.set_lab_test_status(&test.id, LabTestStatus::InProgress).unwrap();
        let done = f.db.set_lab_test_status(&test.id, LabTestStatus::Completed).unwrap();
        assert!(done.completed_at.is_some());

        assert!(matches!(
            f.db.set_lab_test_status(&test.id, LabTestStatus::InProgress),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_list_filters() {
        let f = setup();
        let a = order(&f, "CBC");
        order(&f, "Malaria RDT");
        f.db.set_lab_test_status(&a.id, LabTestStatus::InProgress).unwrap();

        assert_eq!(f.db.list_lab_tests(&LabTestFilter::default()).unwrap().len(), 2);
        let in_progress = f
            .db
            .list_lab_tests(&LabTestFilter {
                status: Some(LabTestStatus::InProgress),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, a.id);

        let for_patient = f
            .db
            .list_lab_tests(&LabTestFilter {
                patient_id: Some(f.patient_id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(for_patient.len(), 2);
    }
}
