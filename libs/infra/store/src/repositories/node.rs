use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use fleet_domain_models::{FleetError, Node};

use crate::errors::db_err;

fn row_to_node(row: &libsql::Row) -> Result<Node, FleetError> {
    let status: String = row.get(5).map_err(db_err)?;
    let last_seen: Option<String> = row.get(6).map_err(db_err)?;
    let last_health_check: Option<String> = row.get(7).map_err(db_err)?;
    Ok(Node {
        id: row.get(0).map_err(db_err)?,
        name: row.get(1).map_err(db_err)?,
        api_endpoint: row.get(2).map_err(db_err)?,
        api_key: row.get(3).map_err(db_err)?,
        is_primary: row.get::<i64>(4).map_err(db_err)? != 0,
        status: status
            .parse()
            .map_err(|e| FleetError::DatabaseOperation(format!("corrupt node status: {e}")))?,
        last_seen: last_seen
            .map(|s| {
                s.parse::<DateTime<Utc>>()
                    .map_err(|e| FleetError::DatabaseOperation(e.to_string()))
            })
            .transpose()?,
        last_health_check: last_health_check
            .map(|s| {
                s.parse::<DateTime<Utc>>()
                    .map_err(|e| FleetError::DatabaseOperation(e.to_string()))
            })
            .transpose()?,
        consecutive_failures: row.get(8).map_err(db_err)?,
    })
}

const SELECT_COLUMNS: &str = "id, name, api_endpoint, api_key, is_primary, status, last_seen, \
     last_health_check, consecutive_failures";

/// Persistence for the `nodes` table.
pub struct NodeRepository;

impl NodeRepository {
    pub async fn insert(conn: &Connection, node: &Node) -> Result<(), FleetError> {
        conn.execute(
            "INSERT INTO nodes (id, name, api_endpoint, api_key, is_primary, status, \
             last_seen, last_health_check, consecutive_failures) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                node.id.clone(),
                node.name.clone(),
                node.api_endpoint.clone(),
                node.api_key.clone(),
                node.is_primary as i64,
                node.status.as_str(),
                node.last_seen.map(|t| t.to_rfc3339()),
                node.last_health_check.map(|t| t.to_rfc3339()),
                node.consecutive_failures,
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(conn: &Connection, id: &str) -> Result<Option<Node>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM nodes WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_api_key(
        conn: &Connection,
        api_key: &str,
    ) -> Result<Option<Node>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM nodes WHERE api_key = ?1");
        let mut rows = conn.query(&sql, params![api_key]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_primary(conn: &Connection) -> Result<Option<Node>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM nodes WHERE is_primary = 1 LIMIT 1");
        let mut rows = conn.query(&sql, ()).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_all(conn: &Connection) -> Result<Vec<Node>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM nodes ORDER BY name");
        let mut rows = conn.query(&sql, ()).await.map_err(db_err)?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    pub async fn update(conn: &Connection, node: &Node) -> Result<(), FleetError> {
        conn.execute(
            "UPDATE nodes SET name = ?2, api_endpoint = ?3, api_key = ?4 WHERE id = ?1",
            params![
                node.id.clone(),
                node.name.clone(),
                node.api_endpoint.clone(),
                node.api_key.clone(),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Records the outcome of one health check: resets `consecutive_failures`
    /// to zero on success, or increments it on failure. The caller decides
    /// the resulting `status` from the new failure count.
    pub async fn record_heartbeat(
        conn: &Connection,
        id: &str,
        success: bool,
        status: fleet_domain_models::NodeStatus,
    ) -> Result<(), FleetError> {
        let now = Utc::now().to_rfc3339();
        if success {
            conn.execute(
                "UPDATE nodes SET status = ?2, last_seen = ?3, last_health_check = ?3, \
                 consecutive_failures = 0 WHERE id = ?1",
                params![id, status.as_str(), now],
            )
            .await
            .map_err(db_err)?;
        } else {
            conn.execute(
                "UPDATE nodes SET status = ?2, last_health_check = ?3, \
                 consecutive_failures = consecutive_failures + 1 WHERE id = ?1",
                params![id, status.as_str(), now],
            )
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    pub async fn delete(conn: &Connection, id: &str) -> Result<(), FleetError> {
        conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
