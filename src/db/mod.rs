pub mod sqlite;
pub mod repository;

pub use sqlite::*;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

/// Shared database handle. rusqlite connections are not Sync, so handlers
/// and the pipeline take short locks and never hold one across an await.
pub type Db = Arc<Mutex<Connection>>;

pub fn shared(conn: Connection) -> Db {
    Arc::new(Mutex::new(conn))
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}
