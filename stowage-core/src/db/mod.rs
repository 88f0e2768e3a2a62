//! Database layer - connection lifecycle and repository factory.
//!
//! # Design principles
//!
//! - One explicit connection handle per [`connect`] call, no globals
//! - Bounded fixed-delay retry before giving up
//! - Database and table creation is idempotent, non-fatal, and logged
//! - Repositories share the connection behind an `Arc`

pub mod repo;

pub use repo::*;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::DbConfig;
use crate::driver::{Connection, Created, Driver};
use crate::error::{DbError, Result};

/// Retries after the initial attempt before [`connect`] gives up
pub const MAX_CONNECT_RETRIES: u32 = 10;

/// Delay between connection attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Connect to the database server and prepare the target database.
///
/// Failed attempts are retried every 10 seconds, up to
/// [`MAX_CONNECT_RETRIES`] times after the first try. On success the
/// target database is created if absent and selected as the working
/// database; only then is the factory handed out.
///
/// # Errors
///
/// [`DbError::Connection`] carrying the last driver error once the retry
/// budget is exhausted.
pub async fn connect<D: Driver>(driver: &D, config: &DbConfig) -> Result<Factory<D::Conn>> {
    let mut conn = connect_with_retry(driver, config).await?;
    info!(host = %config.host, port = config.port, "database connection established");

    match conn.db_create(&config.db_name).await {
        Ok(Created::New) => info!(db = %config.db_name, "database created"),
        Ok(Created::Existing) => {}
        Err(err) => warn!(db = %config.db_name, error = %err, "database creation failed"),
    }
    conn.db_use(&config.db_name);

    Ok(Factory {
        conn: Arc::new(conn),
    })
}

async fn connect_with_retry<D: Driver>(driver: &D, config: &DbConfig) -> Result<D::Conn> {
    let mut failures = 0;
    loop {
        match driver.connect(&config.host, config.port).await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                failures += 1;
                if failures > MAX_CONNECT_RETRIES {
                    error!(
                        attempts = failures,
                        error = %err,
                        "could not connect to database server, giving up"
                    );
                    return Err(DbError::Connection {
                        attempts: failures,
                        source: err,
                    });
                }
                error!(
                    attempt = failures,
                    error = %err,
                    "failed to connect to database server, will retry in {}s",
                    RETRY_DELAY.as_secs()
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Hands out repositories bound to one shared connection
#[derive(Debug)]
pub struct Factory<C> {
    conn: Arc<C>,
}

impl<C: Connection> Factory<C> {
    /// Ensure `table` exists and build a repository over it.
    ///
    /// Creation is idempotent and the call never fails: a hard creation
    /// failure is logged and the repository is handed out anyway, unlike
    /// CRUD operations, which report their errors.
    pub async fn repository<M>(&self, table: impl Into<String>, mapper: M) -> Repository<C, M>
    where
        M: RecordMapper,
    {
        let table = table.into();
        match self.conn.table_create(&table).await {
            Ok(Created::New) => info!(table = %table, "table created"),
            Ok(Created::Existing) => {}
            Err(err) => warn!(table = %table, error = %err, "table creation failed"),
        }
        Repository::new(Arc::clone(&self.conn), table, mapper)
    }
}
