//! Calendar integration state (single row).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::CalendarIntegration;

impl Database {
    /// Stored integration, or a disconnected default.
    pub fn get_calendar_integration(&self) -> DbResult<CalendarIntegration> {
        let integration = self
            .conn
            .query_row(
                r#"
                SELECT calendar_id, access_token, refresh_token, token_expires_at,
                       connected_email, enabled, last_synced_at, updated_at
                FROM calendar_integration
                WHERE id = 1
                "#,
                [],
                |row| {
                    Ok(CalendarIntegration {
                        calendar_id: row.get(0)?,
                        access_token: row.get(1)?,
                        refresh_token: row.get(2)?,
                        token_expires_at: row.get(3)?,
                        connected_email: row.get(4)?,
                        enabled: row.get(5)?,
                        last_synced_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(integration.unwrap_or_default())
    }

    pub fn save_calendar_integration(&self, integration: &CalendarIntegration) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO calendar_integration (
                id, calendar_id, access_token, refresh_token, token_expires_at,
                connected_email, enabled, last_synced_at, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                calendar_id = excluded.calendar_id,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                connected_email = excluded.connected_email,
                enabled = excluded.enabled,
                last_synced_at = excluded.last_synced_at,
                updated_at = excluded.updated_at
            "#,
            params![
                integration.calendar_id,
                integration.access_token,
                integration.refresh_token,
                integration.token_expires_at,
                integration.connected_email,
                integration.enabled,
                integration.last_synced_at,
                integration.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Record a successful sync.
    pub fn touch_calendar_sync(&self, at: DateTime<Utc>) -> DbResult<()> {
        self.conn.execute(
            "UPDATE calendar_integration SET last_synced_at = ?1 WHERE id = 1",
            params![at],
        )?;
        Ok(())
    }
}
