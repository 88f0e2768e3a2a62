//! Generic repository over one table.
//!
//! A [`Repository`] pairs the shared driver connection with a table name
//! and a [`RecordMapper`] that converts raw records into domain objects
//! and back. [`JsonMapper`] covers any serde-capable type.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::driver::{Connection, Cursor, DriverError, Record, WriteSummary};
use crate::error::{DbError, MapError};

/// Converts raw driver records to domain objects and back
pub trait RecordMapper: Send + Sync {
    type Entity: Send;

    /// Build a domain object from a raw record
    fn map(&self, record: Record) -> Result<Self::Entity, MapError>;

    /// Flatten a domain object into its attribute record
    fn unmap(&self, entity: &Self::Entity) -> Result<Record, MapError>;
}

/// Maps any serde type through its JSON representation.
///
/// `Option` id fields serialize as `null`; the repository treats a null
/// id as absent, so plain `Option<String>` ids work without serde
/// attributes.
#[derive(Debug)]
pub struct JsonMapper<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> JsonMapper<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for JsonMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordMapper for JsonMapper<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    type Entity = T;

    fn map(&self, record: Record) -> Result<T, MapError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    fn unmap(&self, entity: &T) -> Result<Record, MapError> {
        match serde_json::to_value(entity)? {
            Value::Object(record) => Ok(record),
            _ => Err(MapError::new("entity did not serialize to a JSON object")),
        }
    }
}

/// Typed CRUD operations over one table
#[derive(Debug)]
pub struct Repository<C, M> {
    conn: Arc<C>,
    table: String,
    mapper: M,
}

impl<C, M> Repository<C, M>
where
    C: Connection,
    M: RecordMapper,
{
    pub(crate) fn new(conn: Arc<C>, table: String, mapper: M) -> Self {
        Self {
            conn,
            table,
            mapper,
        }
    }

    /// Insert `entity` and return it with the server-assigned id set.
    ///
    /// The driver must acknowledge exactly one generated key; any other
    /// count is reported as [`DbError::GeneratedKeys`], distinct from a
    /// driver rejection.
    pub async fn insert(&self, entity: M::Entity) -> Result<M::Entity, DbError> {
        let mut record = self.unmap(&entity)?;
        // A null id means "let the server assign one"; the driver expects
        // the key to be missing entirely in that case.
        if matches!(record.get("id"), Some(Value::Null)) {
            record.remove("id");
        }

        let summary = self
            .conn
            .insert(&self.table, record.clone())
            .await
            .map_err(|err| self.driver_failure("insert", err))?;

        match summary.generated_keys.as_slice() {
            [id] => {
                record.insert("id".into(), Value::String(id.clone()));
                self.map(record)
            }
            keys => {
                error!(
                    table = %self.table,
                    count = keys.len(),
                    "insert acknowledged an unexpected number of generated keys"
                );
                Err(DbError::GeneratedKeys {
                    table: self.table.clone(),
                    count: keys.len(),
                })
            }
        }
    }

    /// Fetch the record with `id` and map it.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] when no record carries that id.
    pub async fn get(&self, id: &str) -> Result<M::Entity, DbError> {
        let record = self
            .conn
            .get(&self.table, id)
            .await
            .map_err(|err| self.driver_failure("get", err))?
            .ok_or_else(|| DbError::not_found(&self.table, id))?;
        self.map(record)
    }

    /// Write `entity` over the stored record sharing its id.
    ///
    /// Resolves with the caller's entity, not the stored result; fetch
    /// again for server state. Driver failures propagate.
    pub async fn update(&self, entity: M::Entity) -> Result<M::Entity, DbError> {
        let record = self.unmap(&entity)?;
        let has_id = matches!(record.get("id"), Some(id) if !id.is_null());
        if !has_id {
            return Err(DbError::missing_id(&self.table));
        }

        self.conn
            .update(&self.table, record)
            .await
            .map_err(|err| self.driver_failure("update", err))?;
        Ok(entity)
    }

    /// Delete the record with `id`, returning the driver's summary as is.
    pub async fn delete(&self, id: &str) -> Result<WriteSummary, DbError> {
        self.conn
            .delete(&self.table, id)
            .await
            .map_err(|err| self.driver_failure("delete", err))
    }

    /// Fetch every record in the table, mapped in driver order.
    pub async fn all(&self) -> Result<Vec<M::Entity>, DbError> {
        let cursor = self
            .conn
            .query(&self.table)
            .await
            .map_err(|err| self.driver_failure("query", err))?;
        let records = cursor
            .collect()
            .await
            .map_err(|err| self.driver_failure("cursor", err))?;
        self.map_records(records)
    }

    /// Map raw records with this repository's mapper, preserving order.
    ///
    /// For callers running their own queries through [`Self::connection`].
    pub fn map_records(&self, records: Vec<Record>) -> Result<Vec<M::Entity>, DbError> {
        records.into_iter().map(|record| self.map(record)).collect()
    }

    /// The table this repository operates on
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The shared connection, for raw driver access
    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    fn map(&self, record: Record) -> Result<M::Entity, DbError> {
        self.mapper
            .map(record)
            .map_err(|err| DbError::map(&self.table, err))
    }

    fn unmap(&self, entity: &M::Entity) -> Result<Record, DbError> {
        self.mapper
            .unmap(entity)
            .map_err(|err| DbError::map(&self.table, err))
    }

    /// Log a driver failure before it becomes part of the result.
    fn driver_failure(&self, op: &'static str, err: DriverError) -> DbError {
        error!(table = %self.table, op, error = %err, "driver operation failed");
        DbError::driver(&self.table, op, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: Option<String>,
        name: String,
    }

    #[test]
    fn json_mapper_round_trips_a_struct() {
        let mapper = JsonMapper::<Widget>::new();
        let widget = Widget {
            id: Some("w-1".into()),
            name: "a".into(),
        };

        let record = mapper.unmap(&widget).unwrap();
        assert_eq!(record.get("name"), Some(&Value::String("a".into())));

        let back = mapper.map(record).unwrap();
        assert_eq!(back, widget);
    }

    #[test]
    fn json_mapper_serializes_absent_ids_as_null() {
        let mapper = JsonMapper::<Widget>::new();
        let record = mapper
            .unmap(&Widget {
                id: None,
                name: "a".into(),
            })
            .unwrap();

        assert_eq!(record.get("id"), Some(&Value::Null));
    }

    #[test]
    fn json_mapper_rejects_non_object_entities() {
        let mapper = JsonMapper::<String>::new();
        let err = mapper.unmap(&"plain".to_string()).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn json_mapper_reports_shape_mismatches() {
        let mapper = JsonMapper::<Widget>::new();
        let mut record = Record::new();
        record.insert("name".into(), Value::Bool(true));

        assert!(mapper.map(record).is_err());
    }
}
