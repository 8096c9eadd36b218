//! Appointment database operations.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};

use super::{require_found, Database, DbError, DbResult};
use crate::models::{
    date_label, local_day_bounds, Appointment, AppointmentFilter, AppointmentInput,
    AppointmentStatus, AppointmentView, ClinicSettings, EditWindow,
};

/// Appointment columns, qualified with the `a` alias used by every query.
const APPOINTMENT_COLUMNS: &str = r#"
    a.id, a.patient_id, a.doctor_id, a.room_id, a.department_id,
    a.scheduled_at, a.duration_minutes, a.appointment_type, a.status,
    a.reason, a.notes, a.calendar_event_id, a.created_at, a.updated_at
"#;

/// Longest bookable slot, used to bound the overlap scan.
const MAX_APPOINTMENT_MINUTES: i64 = 8 * 60;

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        room_id: row.get(3)?,
        department_id: row.get(4)?,
        scheduled_at: row.get(5)?,
        duration_minutes: row.get(6)?,
        appointment_type: row.get(7)?,
        status: row.get(8)?,
        reason: row.get(9)?,
        notes: row.get(10)?,
        calendar_event_id: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Appointment plus the joined display names, label filled in later.
fn view_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentView> {
    Ok(AppointmentView {
        appointment: appointment_from_row(row)?,
        patient_name: row.get(14)?,
        doctor_name: row.get(15)?,
        room_name: row.get(16)?,
        date_label: String::new(),
    })
}

impl Database {
    /// Insert an appointment row as-is. See [`Database::book_appointment`]
    /// for the checked path.
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, room_id, department_id,
                scheduled_at, duration_minutes, appointment_type, status,
                reason, notes, calendar_event_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                appointment.room_id,
                appointment.department_id,
                appointment.scheduled_at,
                appointment.duration_minutes,
                appointment.appointment_type,
                appointment.status,
                appointment.reason,
                appointment.notes,
                appointment.calendar_event_id,
                appointment.created_at,
                appointment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite an appointment row as-is.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                patient_id = ?2,
                doctor_id = ?3,
                room_id = ?4,
                department_id = ?5,
                scheduled_at = ?6,
                duration_minutes = ?7,
                appointment_type = ?8,
                status = ?9,
                reason = ?10,
                notes = ?11,
                calendar_event_id = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
            params![
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                appointment.room_id,
                appointment.department_id,
                appointment.scheduled_at,
                appointment.duration_minutes,
                appointment.appointment_type,
                appointment.status,
                appointment.reason,
                appointment.notes,
                appointment.calendar_event_id,
                appointment.updated_at,
            ],
        )?;
        require_found(rows_affected, "Appointment", &appointment.id)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?"),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_appointment(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?", [id])?;
        require_found(rows_affected, "Appointment", id)
    }

    /// Validate and book a new appointment, rejecting double bookings.
    pub fn book_appointment(&self, input: AppointmentInput) -> DbResult<Appointment> {
        input.validate()?;
        let appointment = Appointment::new(input);
        self.ensure_doctor_free(&appointment)?;
        self.insert_appointment(&appointment)?;
        Ok(appointment)
    }

    /// Edit an appointment's bookable fields.
    ///
    /// Only allowed while the edit window is open; once the start time has
    /// passed only the status may change.
    pub fn edit_appointment(
        &self,
        id: &str,
        input: AppointmentInput,
        now: DateTime<Utc>,
    ) -> DbResult<Appointment> {
        input.validate()?;
        let mut appointment = self
            .get_appointment(id)?
            .ok_or_else(|| DbError::NotFound(format!("Appointment {id}")))?;

        match appointment.edit_window(now) {
            EditWindow::Open => {}
            EditWindow::StatusOnly => {
                return Err(DbError::Constraint(
                    "appointment has started; only its status can change".into(),
                ))
            }
            EditWindow::Locked => {
                return Err(DbError::Constraint(format!(
                    "appointment is {} and can no longer change",
                    appointment.status
                )))
            }
        }

        appointment.apply(input);
        self.ensure_doctor_free(&appointment)?;
        self.update_appointment(&appointment)?;
        Ok(appointment)
    }

    /// Move an appointment to a new status, enforcing the transition table.
    pub fn set_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> DbResult<Appointment> {
        let mut appointment = self
            .get_appointment(id)?
            .ok_or_else(|| DbError::NotFound(format!("Appointment {id}")))?;

        if appointment.status == status {
            return Ok(appointment);
        }
        if !appointment.status.can_transition_to(status) {
            return Err(DbError::Constraint(format!(
                "cannot change appointment from {} to {}",
                appointment.status, status
            )));
        }

        appointment.status = status;
        appointment.updated_at = Utc::now();
        self.conn.execute(
            "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![appointment.id, appointment.status, appointment.updated_at],
        )?;
        Ok(appointment)
    }

    /// Record (or clear) the synced calendar event.
    pub fn set_calendar_event_id(&self, id: &str, event_id: Option<&str>) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET calendar_event_id = ?2 WHERE id = ?1",
            params![id, event_id],
        )?;
        require_found(rows_affected, "Appointment", id)
    }

    /// Reject the booking if the doctor already has an overlapping,
    /// still-open appointment.
    fn ensure_doctor_free(&self, appointment: &Appointment) -> DbResult<()> {
        let window_start = appointment.scheduled_at - Duration::minutes(MAX_APPOINTMENT_MINUTES);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments a
            WHERE a.doctor_id = ?1
              AND a.id != ?2
              AND a.status NOT IN ('cancelled', 'no_show')
              AND a.scheduled_at >= ?3
              AND a.scheduled_at < ?4
            "#
        ))?;
        let rows = stmt.query_map(
            params![
                appointment.doctor_id,
                appointment.id,
                window_start,
                appointment.ends_at()
            ],
            appointment_from_row,
        )?;

        for existing in rows {
            let existing = existing?;
            if existing.overlaps(appointment) {
                return Err(DbError::Conflict(format!(
                    "doctor already booked at {}",
                    existing.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                )));
            }
        }
        Ok(())
    }

    /// List appointments matching the filter, earliest first.
    ///
    /// `filter.date` is a clinic-local day, so the offset in `settings`
    /// decides which UTC range it covers. Labels are relative to `now`.
    pub fn list_appointment_views(
        &self,
        filter: &AppointmentFilter,
        settings: &ClinicSettings,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<AppointmentView>> {
        let offset = settings.offset();
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(date) = filter.date {
            let (start, end) = local_day_bounds(date, offset);
            clauses.push("a.scheduled_at >= ? AND a.scheduled_at < ?");
            values.push(Box::new(start));
            values.push(Box::new(end));
        }
        if let Some(doctor_id) = &filter.doctor_id {
            clauses.push("a.doctor_id = ?");
            values.push(Box::new(doctor_id.clone()));
        }
        if let Some(patient_id) = &filter.patient_id {
            clauses.push("a.patient_id = ?");
            values.push(Box::new(patient_id.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("a.status = ?");
            values.push(Box::new(status));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS},
                   p.first_name || ' ' || p.last_name,
                   u.full_name,
                   r.name
            FROM appointments a
            JOIN patients p ON p.id = a.patient_id
            JOIN users u ON u.id = a.doctor_id
            LEFT JOIN rooms r ON r.id = a.room_id
            {where_sql}
            ORDER BY a.scheduled_at
            "#
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), view_from_row)?;

        let today = settings.today(now);
        let mut views = Vec::new();
        for row in rows {
            let mut view = row?;
            view.date_label = date_label(view.appointment.scheduled_at, today, offset);
            views.push(view);
        }
        Ok(views)
    }

    /// Single appointment with display names.
    pub fn get_appointment_view(
        &self,
        id: &str,
        settings: &ClinicSettings,
        now: DateTime<Utc>,
    ) -> DbResult<Option<AppointmentView>> {
        let view = self
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {APPOINTMENT_COLUMNS},
                           p.first_name || ' ' || p.last_name,
                           u.full_name,
                           r.name
                    FROM appointments a
                    JOIN patients p ON p.id = a.patient_id
                    JOIN users u ON u.id = a.doctor_id
                    LEFT JOIN rooms r ON r.id = a.room_id
                    WHERE a.id = ?
                    "#
                ),
                [id],
                view_from_row,
            )
            .optional()?;

        Ok(view.map(|mut view| {
            view.date_label = date_label(
                view.appointment.scheduled_at,
                settings.today(now),
                settings.offset(),
            );
            view
        }))
    }

    /// Appointment counts per status for appointments scheduled in `[from, to)`.
    pub fn count_appointments_by_status(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<(AppointmentStatus, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT status, COUNT(*)
            FROM appointments
            WHERE scheduled_at >= ?1 AND scheduled_at < ?2
            GROUP BY status
            ORDER BY status
            "#,
        )?;
        let rows = stmt.query_map(params![from, to], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
