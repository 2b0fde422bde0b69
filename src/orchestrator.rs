//! The six entity operations.
//!
//! Every call runs `decode -> [validate] -> resolve scopes -> execute -> map`
//! to completion and hands back either a value or exactly one [`ErrorRecord`].
//! Engine calls are independent round trips; nothing here wraps them in a
//! transaction.

use crate::api::{
    CreateRequest, DeleteRequest, ErrorRecord, Payload, PatchRequest, ReadRequest, SearchRequest,
    UpdateRequest,
};
use crate::core::{Row, StoreError, type_name};
use crate::entity::{Entity, FilterRequest, Record};
use crate::query::{Query, apply_scopes, compose_scopes, key_value};
use crate::storage::{StorageEngine, TableSchema};
use crate::validate::Validate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One entity bound to one engine.
pub struct Orchestrator<E: Entity> {
    entity: Arc<E>,
    engine: Arc<dyn StorageEngine>,
    timeout: Option<Duration>,
}

impl<E: Entity> Clone for Orchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            entity: Arc::clone(&self.entity),
            engine: Arc::clone(&self.engine),
            timeout: self.timeout,
        }
    }
}

impl<E: Entity> Orchestrator<E> {
    pub fn new(engine: Arc<dyn StorageEngine>, entity: E) -> Self {
        Self {
            entity: Arc::new(entity),
            engine,
            timeout: None,
        }
    }

    /// Deadline applied to each engine round trip.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    fn table(&self) -> &str {
        self.entity.name()
    }

    /// Column names and types derived from the blank instance.
    pub fn schema(&self) -> Result<TableSchema, ErrorRecord> {
        let blank = to_row(&self.entity.new_instance())?;
        Ok(TableSchema::from_sample(
            self.table(),
            E::Record::primary_key(),
            &blank,
        ))
    }

    pub async fn migrate(&self) -> Result<(), ErrorRecord> {
        let schema = self.schema()?;
        self.run(self.engine.ensure_table(schema)).await
    }

    pub async fn create(&self, request: CreateRequest) -> Result<E::Record, ErrorRecord> {
        let record = self.decode(&request.entity)?;
        record.validate()?;

        let row = to_row(&record)?;
        let stored = self.run(self.engine.insert(self.table(), row)).await?;
        from_row(stored)
    }

    /// Not-found and excluded-by-filter are the same `GENERIC` failure.
    pub async fn read(&self, request: ReadRequest) -> Result<E::Record, ErrorRecord> {
        let query = self.scoped(self.by_key(&request.id), &request.filters);
        let row = self.run(self.engine.find_first(self.table(), &query)).await?;
        from_row(row)
    }

    /// Full replace. The envelope id wins over any key inside the payload.
    pub async fn update(&self, request: UpdateRequest) -> Result<E::Record, ErrorRecord> {
        let record = self.decode(&request.entity)?;
        record.validate()?;

        let mut row = to_row(&record)?;
        row.insert(E::Record::primary_key().to_string(), key_value(&request.id));

        let query = self.scoped(self.by_key(&request.id), &request.filters);
        let stored = self
            .run(self.engine.replace(self.table(), &query, row))
            .await?
            .ok_or_else(|| ErrorRecord::from(StoreError::NotFound))?;
        from_row(stored)
    }

    /// Deleting nothing is not an error.
    pub async fn delete(&self, request: DeleteRequest) -> Result<(), ErrorRecord> {
        let query = self.scoped(self.by_key(&request.id), &request.filters);
        let affected = self.run(self.engine.delete(self.table(), &query)).await?;
        debug!(entity = self.table(), id = %request.id, affected, "delete executed");
        Ok(())
    }

    pub async fn search(&self, request: SearchRequest) -> Result<Vec<E::Record>, ErrorRecord> {
        let mut query = Query::new().offset(request.skip);
        if request.take > 0 {
            query = query.limit(request.take);
        }
        for (field, value) in request.where_eq {
            query = query.eq(field, value);
        }
        let query = self.scoped(query, &request.filters);

        let rows = self.run(self.engine.find(self.table(), &query)).await?;
        let mut collection = self.entity.new_collection();
        collection.reserve(rows.len());
        for row in rows {
            collection.push(from_row(row)?);
        }
        Ok(collection)
    }

    /// Unscoped partial write, then a scoped read-back.
    ///
    /// The two steps are separate round trips: a concurrent writer may land
    /// in between, and a row the filters exclude is written but then reported
    /// as not found. No structural validation runs here.
    pub async fn patch(&self, request: PatchRequest) -> Result<E::Record, ErrorRecord> {
        let affected = self
            .run(
                self.engine
                    .update_fields(self.table(), &self.by_key(&request.id), &request.data),
            )
            .await?;
        debug!(entity = self.table(), id = %request.id, affected, "patch written");

        let query = self.scoped(self.by_key(&request.id), &request.filters);
        let row = self.run(self.engine.find_first(self.table(), &query)).await?;
        from_row(row)
    }

    fn by_key(&self, id: &str) -> Query {
        Query::by_key(E::Record::primary_key(), id)
    }

    fn scoped(&self, query: Query, filters: &FilterRequest) -> Query {
        let scopes = compose_scopes(filters, self.entity.filters());
        debug!(
            entity = self.table(),
            requested = filters.len(),
            applied = scopes.len(),
            "resolved filter scopes"
        );
        apply_scopes(query, &scopes)
    }

    /// Decodes the payload on top of a blank instance, so absent fields keep
    /// the instance defaults.
    fn decode(&self, payload: &Payload) -> Result<E::Record, ErrorRecord> {
        let incoming: Value =
            serde_json::from_slice(payload.as_bytes()).map_err(ErrorRecord::decode)?;
        let fields = match incoming {
            Value::Object(fields) => fields,
            other => {
                return Err(ErrorRecord::decode(format!(
                    "expected a JSON object for '{}', got {}",
                    self.table(),
                    type_name(&other)
                )));
            }
        };

        let mut merged = to_row(&self.entity.new_instance())?;
        merged.extend(fields);
        serde_json::from_value(Value::Object(merged)).map_err(ErrorRecord::decode)
    }

    async fn run<T>(
        &self,
        call: impl Future<Output = crate::core::Result<T>>,
    ) -> Result<T, ErrorRecord> {
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(StoreError::Timeout(limit.as_millis()))),
            None => call.await,
        };
        outcome.map_err(ErrorRecord::from)
    }
}

fn to_row<R: Serialize>(record: &R) -> Result<Row, ErrorRecord> {
    match serde_json::to_value(record).map_err(ErrorRecord::generic)? {
        Value::Object(row) => Ok(row),
        other => Err(ErrorRecord::generic(format!(
            "record must serialize to an object, got {}",
            type_name(&other)
        ))),
    }
}

fn from_row<R: DeserializeOwned>(row: Row) -> Result<R, ErrorRecord> {
    serde_json::from_value(Value::Object(row)).map_err(ErrorRecord::generic)
}
