use super::{StorageEngine, Table, TableSchema};
use crate::core::{Result, Row, StoreError};
use crate::query::Query;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reference in-process engine.
///
/// Each table sits behind its own lock; the outer map is only locked to
/// resolve or create tables, so operations on different tables never contend.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    pub async fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn schema(&self, table: &str) -> Result<TableSchema> {
        let handle = self.table(table).await?;
        let table = handle.read().await;
        Ok(table.schema().clone())
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        let handle = self.table(table).await?;
        let table = handle.read().await;
        Ok(table.row_count())
    }
}

#[async_trait]
impl StorageEngine for MemoryStore {
    async fn ensure_table(&self, schema: TableSchema) -> Result<()> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.get(schema.name()) {
            let mut table = existing.write().await;
            if table.schema().primary_key() != schema.primary_key() {
                return Err(StoreError::ConstraintViolation(format!(
                    "Table '{}' already uses primary key '{}'",
                    schema.name(),
                    table.schema().primary_key()
                )));
            }
            table.widen(schema);
            return Ok(());
        }

        let name = schema.name().to_string();
        tables.insert(name, Arc::new(RwLock::new(Table::new(schema))));
        Ok(())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let handle = self.table(table).await?;
        let mut table = handle.write().await;
        table.insert(row)
    }

    async fn find(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let handle = self.table(table).await?;
        let table = handle.read().await;
        table.select(query)
    }

    async fn replace(&self, table: &str, query: &Query, row: Row) -> Result<Option<Row>> {
        let handle = self.table(table).await?;
        let mut table = handle.write().await;
        table.replace(query, row)
    }

    async fn update_fields(&self, table: &str, query: &Query, fields: &Row) -> Result<u64> {
        let handle = self.table(table).await?;
        let mut table = handle.write().await;
        table.update_fields(query, fields)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<u64> {
        let handle = self.table(table).await?;
        let mut table = handle.write().await;
        table.delete(query)
    }
}
