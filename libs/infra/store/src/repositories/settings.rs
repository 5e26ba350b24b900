use libsql::{params, Connection};

use fleet_domain_models::{FleetError, Settings};

use crate::errors::db_err;

/// Persistence for the single-row `settings` table.
pub struct SettingsRepository;

impl SettingsRepository {
    pub async fn get(conn: &Connection) -> Result<Settings, FleetError> {
        let mut rows = conn
            .query(
                "SELECT cloud_api_token, cloud_account_id, auto_start_apps FROM settings WHERE id = 1",
                (),
            )
            .await
            .map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Settings {
                cloud_api_token: row.get(0).map_err(db_err)?,
                cloud_account_id: row.get(1).map_err(db_err)?,
                auto_start_apps: row.get::<i64>(2).map_err(db_err)? != 0,
            }),
            None => Ok(Settings::default()),
        }
    }

    pub async fn update(conn: &Connection, settings: &Settings) -> Result<(), FleetError> {
        conn.execute(
            "UPDATE settings SET cloud_api_token = ?1, cloud_account_id = ?2, \
             auto_start_apps = ?3 WHERE id = 1",
            params![
                settings.cloud_api_token.clone(),
                settings.cloud_account_id.clone(),
                settings.auto_start_apps as i64,
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
