use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use fleet_domain_models::{FleetError, IngressRule, TunnelRecord};

use crate::errors::db_err;

fn row_to_tunnel(row: &libsql::Row) -> Result<TunnelRecord, FleetError> {
    let ingress_rules: String = row.get(5).map_err(db_err)?;
    let status: String = row.get(7).map_err(db_err)?;
    let last_synced_at: Option<String> = row.get(8).map_err(db_err)?;
    Ok(TunnelRecord {
        app_id: row.get(0).map_err(db_err)?,
        tunnel_id: row.get(1).map_err(db_err)?,
        tunnel_name: row.get(2).map_err(db_err)?,
        tunnel_token: row.get(3).map_err(db_err)?,
        account_id: row.get(4).map_err(db_err)?,
        ingress_rules: serde_json::from_str::<Vec<IngressRule>>(&ingress_rules)
            .map_err(|e| FleetError::DatabaseOperation(e.to_string()))?,
        is_active: row.get::<i64>(6).map_err(db_err)? != 0,
        status: status
            .parse()
            .map_err(|e| FleetError::DatabaseOperation(format!("corrupt tunnel status: {e}")))?,
        last_synced_at: last_synced_at
            .map(|s| {
                s.parse::<DateTime<Utc>>()
                    .map_err(|e| FleetError::DatabaseOperation(e.to_string()))
            })
            .transpose()?,
        error_details: row.get(9).map_err(db_err)?,
    })
}

const SELECT_COLUMNS: &str = "app_id, tunnel_id, tunnel_name, tunnel_token, account_id, \
     ingress_rules, is_active, status, last_synced_at, error_details";

/// Persistence for the `tunnels` table: one row per app with a provisioned
/// reverse tunnel.
pub struct TunnelRepository;

impl TunnelRepository {
    pub async fn upsert(conn: &Connection, tunnel: &TunnelRecord) -> Result<(), FleetError> {
        let ingress_rules = serde_json::to_string(&tunnel.ingress_rules)
            .map_err(|e| FleetError::DatabaseOperation(e.to_string()))?;
        conn.execute(
            "INSERT INTO tunnels (app_id, tunnel_id, tunnel_name, tunnel_token, account_id, \
             ingress_rules, is_active, status, last_synced_at, error_details) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(app_id) DO UPDATE SET \
             tunnel_id = excluded.tunnel_id, tunnel_name = excluded.tunnel_name, \
             tunnel_token = excluded.tunnel_token, account_id = excluded.account_id, \
             ingress_rules = excluded.ingress_rules, is_active = excluded.is_active, \
             status = excluded.status, last_synced_at = excluded.last_synced_at, \
             error_details = excluded.error_details",
            params![
                tunnel.app_id.clone(),
                tunnel.tunnel_id.clone(),
                tunnel.tunnel_name.clone(),
                tunnel.tunnel_token.clone(),
                tunnel.account_id.clone(),
                ingress_rules,
                tunnel.is_active as i64,
                tunnel.status.as_str(),
                tunnel.last_synced_at.map(|t| t.to_rfc3339()),
                tunnel.error_details.clone(),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(conn: &Connection, app_id: &str) -> Result<Option<TunnelRecord>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM tunnels WHERE app_id = ?1");
        let mut rows = conn.query(&sql, params![app_id]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_tunnel(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_active(conn: &Connection) -> Result<Vec<TunnelRecord>, FleetError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM tunnels WHERE is_active = 1");
        let mut rows = conn.query(&sql, ()).await.map_err(db_err)?;
        let mut tunnels = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            tunnels.push(row_to_tunnel(&row)?);
        }
        Ok(tunnels)
    }

    pub async fn delete(conn: &Connection, app_id: &str) -> Result<(), FleetError> {
        conn.execute("DELETE FROM tunnels WHERE app_id = ?1", params![app_id])
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
