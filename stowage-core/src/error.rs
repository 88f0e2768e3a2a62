//! Structured error types for the stowage data-access layer.
//!
//! Uses `thiserror` for composable, typed errors. Application crates can
//! still wrap these in `anyhow` for convenience; library consumers get
//! the concrete taxonomy with driver errors preserved as sources.

use thiserror::Error;

use crate::driver::DriverError;

/// Main error type for database operations
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection could not be established within the retry budget
    #[error("could not connect to database server after {attempts} attempts: {source}")]
    Connection { attempts: u32, source: DriverError },

    /// Lookup by id matched nothing
    #[error("Could not find {table} with id: {id}")]
    NotFound { table: String, id: String },

    /// The driver rejected a CRUD or query operation
    #[error("{op} on table '{table}' failed: {source}")]
    Driver {
        table: String,
        op: &'static str,
        source: DriverError,
    },

    /// Insert acknowledged an unexpected number of generated keys
    #[error("insert into '{table}' returned {count} generated keys, expected exactly one")]
    GeneratedKeys { table: String, count: usize },

    /// Update requires the entity to carry its id
    #[error("cannot update a '{table}' record that has no id")]
    MissingId { table: String },

    /// A raw record did not fit the domain type
    #[error("could not map '{table}' record: {source}")]
    Map { table: String, source: MapError },
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Create a not-found error
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Create a driver operation error
    pub fn driver(table: impl Into<String>, op: &'static str, source: DriverError) -> Self {
        Self::Driver {
            table: table.into(),
            op,
            source,
        }
    }

    /// Create a mapping error
    pub fn map(table: impl Into<String>, source: MapError) -> Self {
        Self::Map {
            table: table.into(),
            source,
        }
    }

    /// Create a missing-id error
    pub fn missing_id(table: impl Into<String>) -> Self {
        Self::MissingId {
            table: table.into(),
        }
    }
}

/// A record did not match the shape a mapper expected
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct MapError {
    reason: String,
}

impl MapError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}
