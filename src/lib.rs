//! Entity persistence behind six uniform operations.
//!
//! An [`Orchestrator`] serves Create, Read, Update, Delete, Search and Patch
//! for one [`Entity`] over any [`StorageEngine`], narrowing each call by the
//! named filters the request asks for. [`Registry`] routes envelopes to
//! orchestrators by entity name and operation.

pub mod api;
pub mod config;
pub mod core;
pub mod entity;
pub mod orchestrator;
pub mod query;
pub mod storage;
pub mod transport;
pub mod validate;

// Re-export main types for convenience
pub use api::{
    CreateRequest, DeleteRequest, ErrorKind, ErrorRecord, PatchRequest, Payload, ReadRequest,
    SearchRequest, UpdateRequest,
};
pub use config::GatewayConfig;
pub use crate::core::{Row, StoreError};
pub use entity::{Entity, EntityDescriptor, FilterParams, FilterRequest, FilterSet, NamedFilter, Record};
pub use orchestrator::Orchestrator;
pub use query::{Condition, Direction, Query, Scope};
pub use storage::{MemoryStore, StorageEngine, TableSchema};
pub use transport::{Dispatch, EntityHandler, Operation, Registry};
pub use validate::{Validate, ValidationErrors, Validator};
