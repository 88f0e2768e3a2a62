//! Stowage - an async data-access layer over pluggable database drivers.
//!
//! [`connect`] establishes a connection with bounded retry, prepares the
//! target database, and resolves with a [`Factory`] that hands out
//! generic [`Repository`] instances for typed CRUD against individual
//! tables. The driver underneath is anything implementing the traits in
//! [`driver`].

pub mod config;
pub mod db;
pub mod driver;
pub mod error;

pub use config::{ConfigError, DbConfig};
pub use db::{
    connect, Factory, JsonMapper, RecordMapper, Repository, MAX_CONNECT_RETRIES, RETRY_DELAY,
};
pub use error::{DbError, MapError, Result};
