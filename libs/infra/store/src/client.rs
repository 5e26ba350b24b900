// [libs/infra/store/src/client.rs]
/*!
 * =================================================================
 * APARATO: CLIENTE DE CONEXIÓN A LA BASE DE DATOS (ESTRATO L3)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER / PERSISTENCIA SOBERANA
 * RESPONSABILIDAD: GESTIÓN DE ENLACES LIBSQL Y APLICACIÓN DE ESQUEMA
 *
 * Un único `Database` compartido por `Arc`, del que cada operación
 * obtiene su propia `Connection`. Para una base en memoria, el ancla
 * mantiene viva una conexión: SQLite descarta un esquema en memoria
 * en cuanto se cierra su última conexión.
 * =================================================================
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{info, instrument};

use crate::errors::db_err;
use crate::schema::apply_schema;
use fleet_domain_models::FleetError;

/// Owns the libSQL database handle and hands out connections to repositories.
#[derive(Clone)]
pub struct Store {
    database: Arc<Database>,
    /// Keeps an in-memory database alive for the life of the process; SQLite
    /// drops an in-memory schema as soon as its last connection closes.
    _memory_anchor: Option<Arc<Connection>>,
}

impl Store {
    /// Opens `url`, applies the schema, and returns a ready-to-use handle.
    /// `url` may be a local file path, `:memory:`, or a `libsql://` remote
    /// replica URL (which requires `auth_token`).
    #[instrument(skip(auth_token))]
    pub async fn connect(url: &str, auth_token: Option<String>) -> Result<Self, FleetError> {
        let is_remote = url.starts_with("libsql://") || url.starts_with("https://");
        let is_memory = url.contains(":memory:");

        let database = if is_remote {
            let token = auth_token.ok_or_else(|| {
                FleetError::DatabaseOperation("remote database requires an auth token".into())
            })?;
            Builder::new_remote(url.to_string(), token)
                .build()
                .await
                .map_err(db_err)?
        } else {
            Builder::new_local(url).build().await.map_err(db_err)?
        };

        let database = Arc::new(database);

        let anchor = if is_memory {
            let conn = database.connect().map_err(db_err)?;
            apply_schema(&conn).await?;
            Some(Arc::new(conn))
        } else {
            let conn = database.connect().map_err(db_err)?;
            apply_schema(&conn).await?;
            None
        };

        info!(%url, "🔌 store connected, schema applied");
        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn conn(&self) -> Result<Connection, FleetError> {
        self.database.connect().map_err(db_err)
    }
}
