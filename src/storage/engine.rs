use super::table::TableSchema;
use crate::core::{Result, Row, StoreError};
use crate::query::Query;
use async_trait::async_trait;

/// Storage engine boundary - allows pluggable backends.
///
/// Each method is one round trip. Implementations own their concurrency
/// control; callers never hold state between calls.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Creates the table or widens its column set. Idempotent.
    async fn ensure_table(&self, schema: TableSchema) -> Result<()>;

    /// Inserts a row and returns it as stored, engine-assigned key included.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Returns every row matching `query`, honouring ordering and pagination.
    async fn find(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    /// First row matching `query`, or [`StoreError::NotFound`].
    async fn find_first(&self, table: &str, query: &Query) -> Result<Row> {
        let query = query.clone().limit(1);
        self.find(table, &query)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    /// Replaces the first row matching `query` with `row`.
    ///
    /// Returns the stored row, or `None` when nothing matched.
    async fn replace(&self, table: &str, query: &Query, row: Row) -> Result<Option<Row>>;

    /// Merges `fields` into every row matching `query`; returns the affected count.
    async fn update_fields(&self, table: &str, query: &Query, fields: &Row) -> Result<u64>;

    /// Deletes every row matching `query`; returns the affected count.
    async fn delete(&self, table: &str, query: &Query) -> Result<u64>;
}
