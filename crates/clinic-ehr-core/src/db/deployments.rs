//! Deployment staging: stage, promote and roll back releases.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{Database, DbError, DbResult};
use crate::models::{Deployment, DeploymentStatus, ValidationError};

const DEPLOYMENT_COLUMNS: &str = r#"
    id, version, notes, status, created_by, created_at, promoted_at, rolled_back_at
"#;

fn deployment_from_row(row: &Row<'_>) -> rusqlite::Result<Deployment> {
    Ok(Deployment {
        id: row.get(0)?,
        version: row.get(1)?,
        notes: row.get(2)?,
        status: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        promoted_at: row.get(6)?,
        rolled_back_at: row.get(7)?,
    })
}

fn fetch_deployment(conn: &Connection, id: &str) -> DbResult<Deployment> {
    conn.query_row(
        &format!("SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = ?"),
        [id],
        deployment_from_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("Deployment {id}")))
}

impl Database {
    /// Record a new staged release.
    pub fn stage_deployment(
        &self,
        version: &str,
        notes: Option<String>,
        created_by: &str,
    ) -> DbResult<Deployment> {
        if version.trim().is_empty() {
            return Err(ValidationError::new("version", "is required").into());
        }
        let deployment = Deployment::staged(version.to_string(), notes, created_by.to_string());

        self.conn.execute(
            &format!(
                "INSERT INTO deployments ({DEPLOYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                deployment.id,
                deployment.version,
                deployment.notes,
                deployment.status,
                deployment.created_by,
                deployment.created_at,
                deployment.promoted_at,
                deployment.rolled_back_at,
            ],
        )?;
        info!(deployment_id = %deployment.id, version = %deployment.version, "Deployment staged");
        Ok(deployment)
    }

    pub fn get_deployment(&self, id: &str) -> DbResult<Option<Deployment>> {
        self.conn
            .query_row(
                &format!("SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = ?"),
                [id],
                deployment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All deployments, newest first.
    pub fn list_deployments(&self) -> DbResult<Vec<Deployment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], deployment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// The release currently live, if any.
    pub fn live_deployment(&self) -> DbResult<Option<Deployment>> {
        self.conn
            .query_row(
                &format!("SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE status = 'live'"),
                [],
                deployment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Make a staged release live. The previous live release is superseded.
    pub fn promote_deployment(&mut self, id: &str) -> DbResult<Deployment> {
        let tx = self.conn.transaction()?;

        let deployment = fetch_deployment(&tx, id)?;
        if deployment.status != DeploymentStatus::Staged {
            return Err(DbError::Constraint(format!(
                "only staged deployments can be promoted (this one is {})",
                deployment.status
            )));
        }

        let now = Utc::now();
        tx.execute(
            "UPDATE deployments SET status = 'superseded' WHERE status = 'live'",
            [],
        )?;
        tx.execute(
            "UPDATE deployments SET status = 'live', promoted_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        let promoted = fetch_deployment(&tx, id)?;
        tx.commit()?;

        info!(deployment_id = %id, version = %promoted.version, "Deployment promoted");
        Ok(promoted)
    }

    /// Roll back the live release and restore the most recently superseded
    /// one. Returns the release that is live afterwards, if any.
    pub fn rollback_deployment(&mut self, id: &str) -> DbResult<Option<Deployment>> {
        let tx = self.conn.transaction()?;

        let deployment = fetch_deployment(&tx, id)?;
        if deployment.status != DeploymentStatus::Live {
            return Err(DbError::Constraint(format!(
                "only the live deployment can be rolled back (this one is {})",
                deployment.status
            )));
        }

        tx.execute(
            "UPDATE deployments SET status = 'rolled_back', rolled_back_at = ?2 WHERE id = ?1",
            params![id, Utc::now()],
        )?;

        let previous: Option<String> = tx
            .query_row(
                r#"
                SELECT id FROM deployments
                WHERE status = 'superseded'
                ORDER BY promoted_at DESC
                LIMIT 1
                "#,
                [],
                |row| row.get(0),
            )
            .optional()?;

        let restored = match previous {
            Some(previous_id) => {
                tx.execute(
                    "UPDATE deployments SET status = 'live' WHERE id = ?",
                    [&previous_id],
                )?;
                Some(fetch_deployment(&tx, &previous_id)?)
            }
            None => None,
        };
        tx.commit()?;

        info!(
            deployment_id = %id,
            restored = restored.as_ref().map(|d| d.version.as_str()).unwrap_or("none"),
            "Deployment rolled back"
        );
        Ok(restored)
    }
}
