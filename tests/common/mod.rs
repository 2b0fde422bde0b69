#![allow(dead_code)]

use scopedcrud::query::{Condition, Direction, Query};
use scopedcrud::{
    CreateRequest, EntityDescriptor, MemoryStore, NamedFilter, Orchestrator, Payload, Record, Row,
    StorageEngine, Validate, ValidationErrors, Validator,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

impl Validate for Test {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("name", &self.name)
            .max_len("name", &self.name, 32)
            .min("age", self.age, 0)
            .finish()
    }
}

impl Record for Test {}

pub type TestEntity = EntityDescriptor<Test>;

/// `min`: age at least `params["age"]`.
pub fn min_filter() -> NamedFilter {
    NamedFilter::new("min", |params| {
        let age = params.get("age").cloned();
        move |query: Query| match &age {
            Some(age) => query.filter(Condition::gte("age", age.clone())),
            None => query,
        }
    })
}

pub fn test_entity() -> TestEntity {
    EntityDescriptor::new("test")
        .with_filter(min_filter())
        .with_filter(NamedFilter::new("named", |params| {
            let name = params.get("name").cloned().unwrap_or_default();
            move |query: Query| query.filter(Condition::eq("name", name.clone()))
        }))
        .with_filter(NamedFilter::new("by_age", |_| {
            |query: Query| query.order_by("age", Direction::Asc)
        }))
        .with_filter(NamedFilter::new("by_name", |_| {
            |query: Query| query.order_by("name", Direction::Asc)
        }))
}

pub async fn orchestrator_on(engine: Arc<dyn StorageEngine>) -> Orchestrator<TestEntity> {
    let orchestrator = Orchestrator::new(engine, test_entity());
    orchestrator.migrate().await.unwrap();
    orchestrator
}

pub async fn orchestrator() -> Orchestrator<TestEntity> {
    orchestrator_on(Arc::new(MemoryStore::new())).await
}

pub fn payload(value: Value) -> Payload {
    Payload::json(&value).unwrap()
}

pub fn fields(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub async fn seed(orchestrator: &Orchestrator<TestEntity>, name: &str, age: i32) -> Test {
    orchestrator
        .create(CreateRequest::new(payload(
            serde_json::json!({"name": name, "age": age}),
        )))
        .await
        .unwrap()
}
