//! Clinic settings, staff users, departments and rooms.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{conflict_on_unique, require_found, Database, DbResult};
use crate::models::{ClinicSettings, Department, Room, User};

const USER_COLUMNS: &str = r#"
    id, email, full_name, role, department_id, phone, active, created_at, updated_at
"#;

const ROOM_COLUMNS: &str = r#"
    id, name, department_id, room_type, capacity, available, created_at
"#;

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: row.get(3)?,
        department_id: row.get(4)?,
        phone: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        department_id: row.get(2)?,
        room_type: row.get(3)?,
        capacity: row.get(4)?,
        available: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    // ========================================================================
    // Clinic settings
    // ========================================================================

    /// Current clinic settings, or the defaults if never saved.
    pub fn get_clinic_settings(&self) -> DbResult<ClinicSettings> {
        let settings = self
            .conn
            .query_row(
                r#"
                SELECT clinic_name, address, phone, email, currency,
                       utc_offset_minutes, default_appointment_minutes,
                       opening_time, closing_time, updated_at
                FROM clinic_settings
                WHERE id = 1
                "#,
                [],
                |row| {
                    Ok(ClinicSettings {
                        clinic_name: row.get(0)?,
                        address: row.get(1)?,
                        phone: row.get(2)?,
                        email: row.get(3)?,
                        currency: row.get(4)?,
                        utc_offset_minutes: row.get(5)?,
                        default_appointment_minutes: row.get(6)?,
                        opening_time: row.get(7)?,
                        closing_time: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(settings.unwrap_or_default())
    }

    /// Validate and upsert the clinic settings row.
    pub fn save_clinic_settings(&self, settings: &ClinicSettings) -> DbResult<ClinicSettings> {
        settings.validate()?;
        let mut saved = settings.clone();
        saved.updated_at = Some(Utc::now());

        self.conn.execute(
            r#"
            INSERT INTO clinic_settings (
                id, clinic_name, address, phone, email, currency,
                utc_offset_minutes, default_appointment_minutes,
                opening_time, closing_time, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                clinic_name = excluded.clinic_name,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email,
                currency = excluded.currency,
                utc_offset_minutes = excluded.utc_offset_minutes,
                default_appointment_minutes = excluded.default_appointment_minutes,
                opening_time = excluded.opening_time,
                closing_time = excluded.closing_time,
                updated_at = excluded.updated_at
            "#,
            params![
                saved.clinic_name,
                saved.address,
                saved.phone,
                saved.email,
                saved.currency,
                saved.utc_offset_minutes,
                saved.default_appointment_minutes,
                saved.opening_time,
                saved.closing_time,
                saved.updated_at,
            ],
        )?;
        Ok(saved)
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Insert a user. Emails are unique.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.role,
                    user.department_id,
                    user.phone,
                    user.active,
                    user.created_at,
                    user.updated_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "User with this email"))?;
        Ok(())
    }

    pub fn update_user(&self, user: &User) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE users SET
                    email = ?2,
                    full_name = ?3,
                    role = ?4,
                    department_id = ?5,
                    phone = ?6,
                    active = ?7,
                    updated_at = ?8
                WHERE id = ?1
                "#,
                params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.role,
                    user.department_id,
                    user.phone,
                    user.active,
                    user.updated_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "User with this email"))?;
        require_found(rows_affected, "User", &user.id)
    }

    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                [id],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY full_name"))?;
        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Deactivate a user. History referencing them stays intact.
    pub fn deactivate_user(&self, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE users SET active = 0, updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now()],
        )?;
        require_found(rows_affected, "User", id)
    }

    // ========================================================================
    // Departments
    // ========================================================================

    pub fn insert_department(&self, department: &Department) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO departments (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    department.id,
                    department.name,
                    department.description,
                    department.created_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "Department"))?;
        Ok(())
    }

    pub fn update_department(&self, department: &Department) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE departments SET name = ?2, description = ?3 WHERE id = ?1",
                params![department.id, department.name, department.description],
            )
            .map_err(|e| conflict_on_unique(e, "Department"))?;
        require_found(rows_affected, "Department", &department.id)
    }

    pub fn get_department(&self, id: &str) -> DbResult<Option<Department>> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM departments WHERE id = ?",
                [id],
                department_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_departments(&self) -> DbResult<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, created_at FROM departments ORDER BY name")?;
        let rows = stmt.query_map([], department_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a department. Users and rooms in it become unassigned.
    pub fn delete_department(&self, id: &str) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM departments WHERE id = ?", [id])?;
        require_found(rows_affected, "Department", id)
    }

    // ========================================================================
    // Rooms
    // ========================================================================

    pub fn insert_room(&self, room: &Room) -> DbResult<()> {
        self.conn
            .execute(
                &format!("INSERT INTO rooms ({ROOM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    room.id,
                    room.name,
                    room.department_id,
                    room.room_type,
                    room.capacity,
                    room.available,
                    room.created_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "Room"))?;
        Ok(())
    }

    pub fn update_room(&self, room: &Room) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE rooms SET
                    name = ?2, department_id = ?3, room_type = ?4, capacity = ?5, available = ?6
                WHERE id = ?1
                "#,
                params![
                    room.id,
                    room.name,
                    room.department_id,
                    room.room_type,
                    room.capacity,
                    room.available,
                ],
            )
            .map_err(|e| conflict_on_unique(e, "Room"))?;
        require_found(rows_affected, "Room", &room.id)
    }

    pub fn get_room(&self, id: &str) -> DbResult<Option<Room>> {
        self.conn
            .query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?"),
                [id],
                room_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List rooms, optionally only those in one department.
    pub fn list_rooms(&self, department_id: Option<&str>) -> DbResult<Vec<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms
            WHERE ?1 IS NULL OR department_id = ?1
            ORDER BY name
            "#
        ))?;
        let rows = stmt.query_map([department_id], room_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_room(&self, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute("DELETE FROM rooms WHERE id = ?", [id])?;
        require_found(rows_affected, "Room", id)
    }
}
