//! Driver boundary for the external database client.
//!
//! The data-access layer is generic over these traits:
//! - [`Driver`] opens connections to a server
//! - [`Connection`] manages databases and tables and runs per-table operations
//! - [`Cursor`] materializes multi-record query results
//!
//! Creation calls are idempotent at this boundary: "already exists" is the
//! [`Created::Existing`] outcome, never an error.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw record exchanged with the driver
pub type Record = Map<String, Value>;

/// Outcome of an idempotent create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    /// Created by this call
    New,
    /// Already existed, nothing was done
    Existing,
}

/// Driver acknowledgement of an insert
#[derive(Debug, Clone, Default)]
pub struct InsertSummary {
    /// Records written
    pub inserted: u64,
    /// Server-assigned ids, one per record inserted without an id
    pub generated_keys: Vec<String>,
}

/// Driver acknowledgement of an update or delete
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    /// Records rewritten with new content
    pub replaced: u64,
    /// Records matched but already in the requested state
    pub unchanged: u64,
    /// Records the operation did not match
    pub skipped: u64,
    /// Records removed
    pub deleted: u64,
}

/// Error raised by a driver implementation
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error with a message
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Opens connections to a database server
#[async_trait]
pub trait Driver: Send + Sync {
    type Conn: Connection;

    /// Establish a connection to `host:port`
    async fn connect(&self, host: &str, port: u16) -> Result<Self::Conn, DriverError>;
}

/// An established server connection.
///
/// All operations take `&self`; once the working database is selected a
/// connection is safe to share across concurrent requests.
#[async_trait]
pub trait Connection: Send + Sync {
    type Cursor: Cursor;

    /// Create a database unless it already exists
    async fn db_create(&self, name: &str) -> Result<Created, DriverError>;

    /// Select the working database for subsequent operations
    fn db_use(&mut self, name: &str);

    /// Create a table in the working database unless it already exists
    async fn table_create(&self, name: &str) -> Result<Created, DriverError>;

    /// Insert one record; the server assigns an id when the record has none
    async fn insert(&self, table: &str, record: Record) -> Result<InsertSummary, DriverError>;

    /// Fetch one record by id, `None` when absent
    async fn get(&self, table: &str, id: &str) -> Result<Option<Record>, DriverError>;

    /// Merge `record` into the stored record sharing its id
    async fn update(&self, table: &str, record: Record) -> Result<WriteSummary, DriverError>;

    /// Delete one record by id
    async fn delete(&self, table: &str, id: &str) -> Result<WriteSummary, DriverError>;

    /// Start reading the whole table
    async fn query(&self, table: &str) -> Result<Self::Cursor, DriverError>;
}

/// A query result waiting to be materialized
#[async_trait]
pub trait Cursor: Send {
    /// Drain the cursor into records, preserving driver order
    async fn collect(self) -> Result<Vec<Record>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn driver_error_display_is_the_message() {
        let err = DriverError::new("connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert!(err.source().is_none());
    }

    #[test]
    fn wrapped_errors_stay_reachable_through_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DriverError::with_source("handshake failed", io);
        assert_eq!(err.to_string(), "handshake failed");
        assert_eq!(err.source().unwrap().to_string(), "refused");
    }
}
