use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use fleet_domain_models::{App, AppStatus, FleetError};

use crate::errors::db_err;

fn row_to_app(row: &libsql::Row) -> Result<App, FleetError> {
    let status: String = row.get(9).map_err(db_err)?;
    let created_at: String = row.get(11).map_err(db_err)?;
    let updated_at: String = row.get(12).map_err(db_err)?;
    Ok(App {
        id: row.get(0).map_err(db_err)?,
        name: row.get(1).map_err(db_err)?,
        node_id: row.get(2).map_err(db_err)?,
        description: row.get(3).map_err(db_err)?,
        compose_content: row.get(4).map_err(db_err)?,
        tunnel_id: row.get(5).map_err(db_err)?,
        tunnel_token: row.get(6).map_err(db_err)?,
        tunnel_domain: row.get(7).map_err(db_err)?,
        public_url: row.get(8).map_err(db_err)?,
        status: status
            .parse()
            .map_err(|e| FleetError::DatabaseOperation(format!("corrupt app status: {e}")))?,
        error_message: row.get(10).map_err(db_err)?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| FleetError::DatabaseOperation(e.to_string()))?,
        updated_at: updated_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| FleetError::DatabaseOperation(e.to_string()))?,
    })
}

const SELECT_COLUMNS: &str = "id, name, node_id, description, compose_content, tunnel_id, \
     tunnel_token, tunnel_domain, public_url, status, error_message, created_at, updated_at";

/// Persistence for the `apps` table.
pub struct AppRepository;

impl AppRepository {
    pub async fn insert(conn: &Connection, app: &App) -> Result<(), FleetError> {
        conn.execute(
            "INSERT INTO apps (id, name, node_id, description, compose_content, tunnel_id, \
             tunnel_token, tunnel_domain, public_url, status, error_message, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                app.id.clone(),
                app.name.clone(),
                app.node_id.clone(),
                app.description.clone(),
                app.compose_content.clone(),
                app.tunnel_id.clone(),
                app.tunnel_token.clone(),
                app.tunnel_domain.clone(),
                app.public_url.clone(),
                app.status.as_str(),
                app.error_message.clone(),
                app.created_at.to_rfc3339(),
                app.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(conn: &Connection, id: &str) -> Result<Option<App>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM apps WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_app(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_name(conn: &Connection, name: &str) -> Result<Option<App>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM apps WHERE name = ?1");
        let mut rows = conn.query(&sql, params![name]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_app(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_by_node(conn: &Connection, node_id: &str) -> Result<Vec<App>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM apps WHERE node_id = ?1 ORDER BY name");
        let mut rows = conn.query(&sql, params![node_id]).await.map_err(db_err)?;
        let mut apps = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            apps.push(row_to_app(&row)?);
        }
        Ok(apps)
    }

    pub async fn list_all(conn: &Connection) -> Result<Vec<App>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM apps ORDER BY name");
        let mut rows = conn.query(&sql, ()).await.map_err(db_err)?;
        let mut apps = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            apps.push(row_to_app(&row)?);
        }
        Ok(apps)
    }

    pub async fn update(conn: &Connection, app: &App) -> Result<(), FleetError> {
        conn.execute(
            "UPDATE apps SET name = ?2, description = ?3, compose_content = ?4, tunnel_id = ?5, \
             tunnel_token = ?6, tunnel_domain = ?7, public_url = ?8, status = ?9, \
             error_message = ?10, updated_at = ?11 WHERE id = ?1",
            params![
                app.id.clone(),
                app.name.clone(),
                app.description.clone(),
                app.compose_content.clone(),
                app.tunnel_id.clone(),
                app.tunnel_token.clone(),
                app.tunnel_domain.clone(),
                app.public_url.clone(),
                app.status.as_str(),
                app.error_message.clone(),
                app.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn set_status(
        conn: &Connection,
        id: &str,
        status: AppStatus,
        error_message: Option<&str>,
    ) -> Result<(), FleetError> {
        conn.execute(
            "UPDATE apps SET status = ?2, error_message = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                id,
                status.as_str(),
                error_message,
                Utc::now().to_rfc3339()
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete(conn: &Connection, id: &str) -> Result<(), FleetError> {
        conn.execute("DELETE FROM apps WHERE id = ?1", params![id])
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
