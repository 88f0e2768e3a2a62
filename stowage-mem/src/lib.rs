//! In-memory driver backend.
//!
//! Implements the stowage driver boundary against process-local state,
//! for tests and demos. A [`MemDriver`] owns one server's worth of
//! databases; cloning it shares that state, so several connections can
//! reach the same data while separate drivers stay isolated.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use stowage_core::driver::{
    Connection, Created, Cursor, Driver, DriverError, InsertSummary, Record, WriteSummary,
};

/// Database every fresh server starts with
pub const DEFAULT_DB: &str = "test";

type Table = BTreeMap<String, Record>;
type Database = HashMap<String, Table>;
type State = Arc<Mutex<HashMap<String, Database>>>;

/// Process-local database server
#[derive(Clone, Debug)]
pub struct MemDriver {
    state: State,
}

impl MemDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for MemDriver {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert(DEFAULT_DB.to_string(), Database::new());
        Self {
            state: Arc::new(Mutex::new(databases)),
        }
    }
}

#[async_trait]
impl Driver for MemDriver {
    type Conn = MemConnection;

    async fn connect(&self, _host: &str, _port: u16) -> Result<MemConnection, DriverError> {
        Ok(MemConnection {
            state: Arc::clone(&self.state),
            db: DEFAULT_DB.to_string(),
        })
    }
}

/// Connection to a [`MemDriver`] server, starting on [`DEFAULT_DB`]
#[derive(Debug)]
pub struct MemConnection {
    state: State,
    db: String,
}

#[async_trait]
impl Connection for MemConnection {
    type Cursor = MemCursor;

    async fn db_create(&self, name: &str) -> Result<Created, DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.contains_key(name) {
            return Ok(Created::Existing);
        }
        state.insert(name.to_string(), Database::new());
        Ok(Created::New)
    }

    fn db_use(&mut self, name: &str) {
        self.db = name.to_string();
    }

    async fn table_create(&self, name: &str) -> Result<Created, DriverError> {
        let mut state = self.state.lock().unwrap();
        let database = database_mut(&mut state, &self.db)?;
        if database.contains_key(name) {
            return Ok(Created::Existing);
        }
        database.insert(name.to_string(), Table::new());
        Ok(Created::New)
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<InsertSummary, DriverError> {
        let mut state = self.state.lock().unwrap();
        let rows = table_mut(&mut state, &self.db, table)?;

        let mut summary = InsertSummary {
            inserted: 1,
            generated_keys: Vec::new(),
        };

        let id = match record.get("id") {
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                summary.generated_keys.push(id.clone());
                id
            }
            Some(Value::String(id)) => {
                if rows.contains_key(id) {
                    return Err(DriverError::new(format!(
                        "Duplicate primary key `{id}` in table `{table}`"
                    )));
                }
                id.clone()
            }
            Some(_) => return Err(DriverError::new("primary keys must be strings")),
        };

        rows.insert(id, record);
        Ok(summary)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Record>, DriverError> {
        let state = self.state.lock().unwrap();
        let rows = table_ref(&state, &self.db, table)?;
        Ok(rows.get(id).cloned())
    }

    async fn update(&self, table: &str, record: Record) -> Result<WriteSummary, DriverError> {
        let mut state = self.state.lock().unwrap();
        let rows = table_mut(&mut state, &self.db, table)?;

        let id = match record.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => return Err(DriverError::new("update requires a string id")),
        };

        let mut summary = WriteSummary::default();
        match rows.get_mut(&id) {
            Some(existing) => {
                // Top-level merge, the way document stores apply updates.
                let mut merged = existing.clone();
                for (key, value) in &record {
                    merged.insert(key.clone(), value.clone());
                }
                if *existing == merged {
                    summary.unchanged = 1;
                } else {
                    *existing = merged;
                    summary.replaced = 1;
                }
            }
            None => summary.skipped = 1,
        }
        Ok(summary)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<WriteSummary, DriverError> {
        let mut state = self.state.lock().unwrap();
        let rows = table_mut(&mut state, &self.db, table)?;

        let mut summary = WriteSummary::default();
        if rows.remove(id).is_some() {
            summary.deleted = 1;
        } else {
            summary.skipped = 1;
        }
        Ok(summary)
    }

    async fn query(&self, table: &str) -> Result<MemCursor, DriverError> {
        let state = self.state.lock().unwrap();
        let rows = table_ref(&state, &self.db, table)?;
        Ok(MemCursor {
            records: rows.values().cloned().collect(),
        })
    }
}

/// Snapshot of a table taken when the query ran
#[derive(Debug)]
pub struct MemCursor {
    records: Vec<Record>,
}

#[async_trait]
impl Cursor for MemCursor {
    async fn collect(self) -> Result<Vec<Record>, DriverError> {
        Ok(self.records)
    }
}

// ============================================================================
// Lookup helpers
// ============================================================================

fn database_mut<'a>(
    state: &'a mut HashMap<String, Database>,
    db: &str,
) -> Result<&'a mut Database, DriverError> {
    state
        .get_mut(db)
        .ok_or_else(|| DriverError::new(format!("Database `{db}` does not exist")))
}

fn table_mut<'a>(
    state: &'a mut HashMap<String, Database>,
    db: &str,
    table: &str,
) -> Result<&'a mut Table, DriverError> {
    database_mut(state, db)?
        .get_mut(table)
        .ok_or_else(|| DriverError::new(format!("Table `{db}.{table}` does not exist")))
}

fn table_ref<'a>(
    state: &'a HashMap<String, Database>,
    db: &str,
    table: &str,
) -> Result<&'a Table, DriverError> {
    state
        .get(db)
        .ok_or_else(|| DriverError::new(format!("Database `{db}` does not exist")))?
        .get(table)
        .ok_or_else(|| DriverError::new(format!("Table `{db}.{table}` does not exist")))
}
