use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use fleet_domain_models::{ComposeVersion, FleetError};

use crate::errors::db_err;

fn row_to_version(row: &libsql::Row) -> Result<ComposeVersion, FleetError> {
    let created_at: String = row.get(6).map_err(db_err)?;
    Ok(ComposeVersion {
        app_id: row.get(0).map_err(db_err)?,
        version: row.get(1).map_err(db_err)?,
        compose_content: row.get(2).map_err(db_err)?,
        is_current: row.get::<i64>(3).map_err(db_err)? != 0,
        change_reason: row.get(4).map_err(db_err)?,
        changed_by: row.get(5).map_err(db_err)?,
        rolled_back_from: row.get(7).map_err(db_err)?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| FleetError::DatabaseOperation(e.to_string()))?,
    })
}

const SELECT_COLUMNS: &str =
    "app_id, version, compose_content, is_current, change_reason, changed_by, created_at, rolled_back_from";

/// Persistence for the `compose_versions` table: one row per revision of an
/// app's compose document, with at most one `is_current = 1` row per app.
pub struct ComposeVersionRepository;

impl ComposeVersionRepository {
    /// Inserts `version` as a new row, clearing `is_current` on every other
    /// row for the same app inside one transaction.
    pub async fn append(conn: &Connection, version: &ComposeVersion) -> Result<(), FleetError> {
        let tx = conn.transaction().await.map_err(db_err)?;

        tx.execute(
            "UPDATE compose_versions SET is_current = 0 WHERE app_id = ?1",
            params![version.app_id.clone()],
        )
        .await
        .map_err(db_err)?;

        tx.execute(
            "INSERT INTO compose_versions (app_id, version, compose_content, is_current, \
             change_reason, changed_by, rolled_back_from, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)",
            params![
                version.app_id.clone(),
                version.version,
                version.compose_content.clone(),
                version.change_reason.clone(),
                version.changed_by.clone(),
                version.rolled_back_from,
                version.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    pub async fn next_version_number(conn: &Connection, app_id: &str) -> Result<i64, FleetError> {
        let mut rows = conn
            .query(
                "SELECT COALESCE(MAX(version), 0) FROM compose_versions WHERE app_id = ?1",
                params![app_id],
            )
            .await
            .map_err(db_err)?;
        let max: i64 = match rows.next().await.map_err(db_err)? {
            Some(row) => row.get(0).map_err(db_err)?,
            None => 0,
        };
        Ok(max + 1)
    }

    pub async fn list(conn: &Connection, app_id: &str) -> Result<Vec<ComposeVersion>, FleetError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM compose_versions WHERE app_id = ?1 ORDER BY version DESC"
        );
        let mut rows = conn.query(&sql, params![app_id]).await.map_err(db_err)?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            versions.push(row_to_version(&row)?);
        }
        Ok(versions)
    }

    pub async fn get(
        conn: &Connection,
        app_id: &str,
        version: i64,
    ) -> Result<Option<ComposeVersion>, FleetError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM compose_versions WHERE app_id = ?1 AND version = ?2"
        );
        let mut rows = conn
            .query(&sql, params![app_id, version])
            .await
            .map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_version(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_current(
        conn: &Connection,
        app_id: &str,
    ) -> Result<Option<ComposeVersion>, FleetError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM compose_versions WHERE app_id = ?1 AND is_current = 1"
        );
        let mut rows = conn.query(&sql, params![app_id]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_version(&row)?)),
            None => Ok(None),
        }
    }

    /// Removes every version row for `app_id`. Called explicitly from app
    /// deletion rather than relying on the `ON DELETE CASCADE` foreign key,
    /// since SQLite/libSQL does not enforce FK constraints unless
    /// `PRAGMA foreign_keys = ON` was set on the deleting connection.
    pub async fn delete_for_app(conn: &Connection, app_id: &str) -> Result<(), FleetError> {
        conn.execute(
            "DELETE FROM compose_versions WHERE app_id = ?1",
            params![app_id],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
