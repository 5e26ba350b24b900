use fleet_domain_models::FleetError;

/// Maps a libSQL driver error onto the shared error taxonomy. A free function
/// rather than a `From` impl: both types live outside this crate.
pub fn db_err(err: libsql::Error) -> FleetError {
    FleetError::DatabaseOperation(err.to_string())
}
