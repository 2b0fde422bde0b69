use crate::core::{Result, Row, StoreError, compare, type_name, values_equal};
use crate::query::{Direction, Query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// JSON shape a column accepts. NULL is accepted by every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Any,
    Boolean,
    Integer,
    Float,
    Text,
    Array,
    Object,
}

impl ColumnType {
    /// Type implied by a sample value; NULL samples give `Any`.
    pub fn of(sample: &Value) -> Self {
        match sample {
            Value::Null => ColumnType::Any,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Number(n) if n.is_f64() => ColumnType::Float,
            Value::Number(_) => ColumnType::Integer,
            Value::String(_) => ColumnType::Text,
            Value::Array(_) => ColumnType::Array,
            Value::Object(_) => ColumnType::Object,
        }
    }

    pub fn is_compatible(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ColumnType::Any, _) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ColumnType::Float, Value::Number(_)) => true,
            (ColumnType::Text, Value::String(_)) => true,
            (ColumnType::Array, Value::Array(_)) => true,
            (ColumnType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Any => "ANY",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Array => "ARRAY",
            ColumnType::Object => "OBJECT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if !self.column_type.is_compatible(value) {
            return Err(StoreError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.column_type,
                type_name(value)
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    primary_key: String,
    columns: Vec<Column>,
}

impl TableSchema {
    /// Untyped schema: every column accepts any value.
    ///
    /// The primary key is always part of the column set.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>, columns: Vec<String>) -> Self {
        let columns = columns
            .into_iter()
            .map(|column| Column::new(column, ColumnType::Any))
            .collect();
        Self::with_columns(name, primary_key, columns)
    }

    /// Schema whose column set and types follow a sample row.
    pub fn from_sample(name: impl Into<String>, primary_key: impl Into<String>, sample: &Row) -> Self {
        let columns = sample
            .iter()
            .map(|(column, value)| Column::new(column.clone(), ColumnType::of(value)))
            .collect();
        Self::with_columns(name, primary_key, columns)
    }

    pub fn with_columns(
        name: impl Into<String>,
        primary_key: impl Into<String>,
        columns: Vec<Column>,
    ) -> Self {
        let primary_key = primary_key.into();
        let mut schema = Self {
            name: name.into(),
            primary_key: primary_key.clone(),
            columns: Vec::new(),
        };
        let key_type = columns
            .iter()
            .find(|c| c.name == primary_key)
            .map_or(ColumnType::Any, Column::column_type);
        schema.widen(std::iter::once(Column::new(primary_key, key_type)).chain(columns));
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column(column).is_some()
    }

    /// Adds columns not yet known; existing columns keep their position.
    /// An untyped column takes the type of a typed redeclaration.
    pub fn widen(&mut self, columns: impl IntoIterator<Item = Column>) {
        for column in columns {
            match self.columns.iter_mut().find(|c| c.name == column.name) {
                Some(existing) if existing.column_type == ColumnType::Any => {
                    existing.column_type = column.column_type;
                }
                Some(_) => {}
                None => self.columns.push(column),
            }
        }
    }
}

/// Rows of one table in insertion order.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<usize, Row>,
    next_row_id: usize,
    next_key: i64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 0,
            next_key: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn widen(&mut self, schema: TableSchema) {
        self.schema.widen(schema.columns);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn insert(&mut self, row: Row) -> Result<Row> {
        let mut row = self.complete_row(row)?;
        let pk = self.schema.primary_key.clone();

        if is_blank_key(row.get(&pk)) {
            row.insert(pk, Value::from(self.next_key));
            self.next_key += 1;
        } else {
            let key = row.get(&pk).cloned().unwrap_or(Value::Null);
            self.ensure_key_free(&key, None)?;
            self.observe_key(&key);
        }

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    pub fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let mut matched: Vec<&Row> = self
            .matching_ids(query)?
            .into_iter()
            .filter_map(|id| self.rows.get(&id))
            .collect();

        if !query.order_by.is_empty() {
            let mut failure = None;
            matched.sort_by(|a, b| {
                for order in &query.order_by {
                    let left = a.get(&order.field).unwrap_or(&Value::Null);
                    let right = b.get(&order.field).unwrap_or(&Value::Null);
                    let ordering = match compare(left, right) {
                        Ok(ordering) => ordering,
                        Err(err) => {
                            failure.get_or_insert(err);
                            Ordering::Equal
                        }
                    };
                    let ordering = match order.direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            if let Some(err) = failure {
                return Err(err);
            }
        }

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    pub fn replace(&mut self, query: &Query, row: Row) -> Result<Option<Row>> {
        let mut row = self.complete_row(row)?;
        let Some(id) = self.matching_ids(query)?.into_iter().next() else {
            return Ok(None);
        };

        let pk = self.schema.primary_key.clone();
        let current_key = self.rows.get(&id).and_then(|r| r.get(&pk)).cloned();
        if is_blank_key(row.get(&pk)) {
            row.insert(pk, current_key.unwrap_or(Value::Null));
        } else {
            let key = row.get(&pk).cloned().unwrap_or(Value::Null);
            self.ensure_key_free(&key, Some(id))?;
            self.observe_key(&key);
        }

        self.rows.insert(id, row.clone());
        Ok(Some(row))
    }

    pub fn update_fields(&mut self, query: &Query, fields: &Row) -> Result<u64> {
        self.check_columns(fields.keys().map(String::as_str))?;
        self.check_types(fields)?;
        let ids = self.matching_ids(query)?;
        let pk = self.schema.primary_key.clone();

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(current) = self.rows.get(&id) else {
                continue;
            };
            let mut merged = current.clone();
            for (column, value) in fields {
                merged.insert(column.clone(), value.clone());
            }
            if let Some(key) = fields.get(&pk) {
                if is_blank_key(Some(key)) {
                    return Err(StoreError::ConstraintViolation(format!(
                        "Column '{pk}' cannot be blank"
                    )));
                }
                self.ensure_key_free(key, Some(id))?;
            }
            updated.push((id, merged));
        }

        if fields.contains_key(&pk) && updated.len() > 1 {
            return Err(StoreError::ConstraintViolation(format!(
                "Unique constraint violation: {} rows would share one '{pk}'",
                updated.len()
            )));
        }

        let affected = updated.len() as u64;
        for (id, row) in updated {
            if let Some(key) = row.get(&pk).cloned() {
                self.observe_key(&key);
            }
            self.rows.insert(id, row);
        }
        Ok(affected)
    }

    pub fn delete(&mut self, query: &Query) -> Result<u64> {
        let ids = self.matching_ids(query)?;
        let mut affected = 0;
        for id in ids {
            if self.rows.remove(&id).is_some() {
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn matching_ids(&self, query: &Query) -> Result<Vec<usize>> {
        self.check_columns(query.referenced_fields())?;

        let mut ids = Vec::new();
        for (id, row) in &self.rows {
            if query.matches(row)? {
                ids.push(*id);
            }
        }
        Ok(ids)
    }

    fn check_columns<'a>(&self, mut fields: impl Iterator<Item = &'a str>) -> Result<()> {
        match fields.find(|field| !self.schema.has_column(field)) {
            Some(field) => Err(StoreError::ColumnNotFound(
                field.to_string(),
                self.schema.name.clone(),
            )),
            None => Ok(()),
        }
    }

    /// Values must fit their column's type; nothing is coerced.
    fn check_types(&self, row: &Row) -> Result<()> {
        for (field, value) in row {
            if let Some(column) = self.schema.column(field) {
                column.validate(value)?;
            }
        }
        Ok(())
    }

    /// Rejects unknown columns and mistyped values, fills missing columns with NULL.
    fn complete_row(&self, row: Row) -> Result<Row> {
        self.check_columns(row.keys().map(String::as_str))?;
        self.check_types(&row)?;

        let mut complete = row;
        for column in &self.schema.columns {
            complete.entry(column.name.clone()).or_insert(Value::Null);
        }
        Ok(complete)
    }

    fn ensure_key_free(&self, key: &Value, except: Option<usize>) -> Result<()> {
        let pk = &self.schema.primary_key;
        let taken = self.rows.iter().any(|(id, row)| {
            Some(*id) != except && row.get(pk).is_some_and(|existing| values_equal(existing, key))
        });

        if taken {
            return Err(StoreError::ConstraintViolation(format!(
                "Unique constraint violation: Column '{pk}' already contains value {key}"
            )));
        }
        Ok(())
    }

    /// Keeps the key sequence ahead of explicitly supplied integer keys.
    fn observe_key(&mut self, key: &Value) {
        if let Some(key) = key.as_i64()
            && key >= self.next_key
        {
            self.next_key = key + 1;
        }
    }
}

fn is_blank_key(key: Option<&Value>) -> bool {
    match key {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_i64() == Some(0) || n.as_u64() == Some(0),
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Condition;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::new("people", "id", vec!["name".into(), "age".into()])
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn schema_always_contains_primary_key() {
        let schema = TableSchema::new("t", "key", vec!["a".into(), "key".into()]);
        assert_eq!(schema.column_names(), ["key", "a"]);
    }

    #[test]
    fn sample_rows_type_the_columns() {
        let sample = row(json!({"id": 0, "name": "", "score": 0.0, "tags": [], "note": null}));
        let schema = TableSchema::from_sample("t", "id", &sample);

        assert_eq!(schema.column("id").map(Column::column_type), Some(ColumnType::Integer));
        assert_eq!(schema.column("name").map(Column::column_type), Some(ColumnType::Text));
        assert_eq!(schema.column("score").map(Column::column_type), Some(ColumnType::Float));
        assert_eq!(schema.column("tags").map(Column::column_type), Some(ColumnType::Array));
        assert_eq!(schema.column("note").map(Column::column_type), Some(ColumnType::Any));
    }

    #[test]
    fn mistyped_writes_leave_rows_untouched() {
        let sample = row(json!({"id": 0, "name": "", "age": 0}));
        let mut table = Table::new(TableSchema::from_sample("people", "id", &sample));
        table.insert(row(json!({"name": "a", "age": 1}))).unwrap();

        let err = table
            .insert(row(json!({"name": "b", "age": "old"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));

        let err = table
            .update_fields(&Query::by_key("id", "1"), &row(json!({"age": "old"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));

        let err = table
            .replace(&Query::by_key("id", "1"), row(json!({"name": 7})))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));

        let rows = table.select(&Query::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["age"], json!(1));
        assert_eq!(rows[0]["name"], json!("a"));

        table
            .update_fields(&Query::by_key("id", "1"), &row(json!({"age": null})))
            .unwrap();
    }

    #[test]
    fn sorting_incompatible_values_is_an_error() {
        let mut table = Table::new(schema());
        table.insert(row(json!({"name": "a", "age": 3}))).unwrap();
        table.insert(row(json!({"name": "b", "age": "x"}))).unwrap();

        let err = table
            .select(&Query::new().order_by("age", Direction::Asc))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));
    }

    #[test]
    fn insert_assigns_sequential_keys_and_fills_nulls() {
        let mut table = Table::new(schema());
        let first = table.insert(row(json!({"id": 0, "name": "a"}))).unwrap();
        let second = table.insert(row(json!({"name": "b", "age": 3}))).unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(first["age"], Value::Null);
        assert_eq!(second["id"], json!(2));
    }

    #[test]
    fn explicit_keys_advance_the_sequence_and_must_be_unique() {
        let mut table = Table::new(schema());
        table.insert(row(json!({"id": 10, "name": "a"}))).unwrap();
        let next = table.insert(row(json!({"name": "b"}))).unwrap();
        assert_eq!(next["id"], json!(11));

        let err = table.insert(row(json!({"id": 10}))).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let mut table = Table::new(schema());
        let err = table.insert(row(json!({"nope": 1}))).unwrap_err();
        assert_eq!(err, StoreError::ColumnNotFound("nope".into(), "people".into()));

        let err = table
            .select(&Query::new().filter(Condition::eq("nope", 1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnNotFound(_, _)));
    }

    #[test]
    fn select_orders_then_paginates() {
        let mut table = Table::new(schema());
        for (name, age) in [("a", 30), ("b", 10), ("c", 20)] {
            table.insert(row(json!({"name": name, "age": age}))).unwrap();
        }

        let rows = table
            .select(&Query::new().order_by("age", Direction::Desc).offset(1).limit(1))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("c"));
    }

    #[test]
    fn update_fields_cannot_duplicate_keys() {
        let mut table = Table::new(schema());
        table.insert(row(json!({"name": "a"}))).unwrap();
        table.insert(row(json!({"name": "b"}))).unwrap();

        let err = table
            .update_fields(&Query::by_key("id", "2"), &row(json!({"id": 1})))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let affected = table
            .update_fields(&Query::by_key("id", "2"), &row(json!({"age": 5})))
            .unwrap();
        assert_eq!(affected, 1);
    }
}
