//! Binding entities to a message transport.
//!
//! Each registered entity becomes one [`Dispatch`] module answering the
//! operation names `create | read | update | delete | search | patch`.
//! Messages are addressed by subject `"{prefix}.{entity}.{operation}"`.

pub mod http;

use crate::api::ErrorRecord;
use crate::config::GatewayConfig;
use crate::entity::Entity;
use crate::orchestrator::Orchestrator;
use crate::storage::StorageEngine;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Search,
    Patch,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Search,
        Operation::Patch,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Search => "search",
            Operation::Patch => "patch",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| RouteError::UnknownOperation(s.to_string()))
    }
}

/// Addressing failures; these happen before any entity handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no entity registered as '{0}'")]
    UnknownEntity(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("subject '{0}' does not address an entity operation")]
    BadSubject(String),
}

impl From<RouteError> for ErrorRecord {
    fn from(err: RouteError) -> Self {
        ErrorRecord::generic(err)
    }
}

/// One entity's handler set, type-erased for the registry.
#[async_trait]
pub trait Dispatch: Send + Sync {
    fn entity_name(&self) -> &str;

    async fn migrate(&self) -> Result<(), ErrorRecord>;

    /// Decodes the JSON envelope in `body`, runs `operation`, encodes the result.
    async fn dispatch(&self, operation: Operation, body: &[u8]) -> Result<Value, ErrorRecord>;
}

/// Envelope decoding and result encoding around an [`Orchestrator`].
pub struct EntityHandler<E: Entity> {
    orchestrator: Orchestrator<E>,
}

impl<E: Entity> EntityHandler<E> {
    pub fn new(orchestrator: Orchestrator<E>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator<E> {
        &self.orchestrator
    }

    async fn execute(&self, operation: Operation, body: &[u8]) -> Result<Value, ErrorRecord> {
        let orchestrator = &self.orchestrator;
        match operation {
            Operation::Create => encode(orchestrator.create(envelope(body)?).await?),
            Operation::Read => encode(orchestrator.read(envelope(body)?).await?),
            Operation::Update => encode(orchestrator.update(envelope(body)?).await?),
            Operation::Delete => {
                orchestrator.delete(envelope(body)?).await?;
                Ok(Value::Null)
            }
            Operation::Search => encode(orchestrator.search(envelope(body)?).await?),
            Operation::Patch => encode(orchestrator.patch(envelope(body)?).await?),
        }
    }
}

#[async_trait]
impl<E: Entity> Dispatch for EntityHandler<E> {
    fn entity_name(&self) -> &str {
        self.orchestrator.entity().name()
    }

    async fn migrate(&self) -> Result<(), ErrorRecord> {
        self.orchestrator.migrate().await
    }

    async fn dispatch(&self, operation: Operation, body: &[u8]) -> Result<Value, ErrorRecord> {
        let outcome = self.execute(operation, body).await;
        if let Err(err) = &outcome {
            error!(
                entity = self.entity_name(),
                method = operation.as_str(),
                code = err.code(),
                error = %err,
                "operation failed"
            );
        }
        outcome
    }
}

fn envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, ErrorRecord> {
    serde_json::from_slice(body).map_err(ErrorRecord::decode)
}

fn encode<T: Serialize>(value: T) -> Result<Value, ErrorRecord> {
    serde_json::to_value(value).map_err(ErrorRecord::generic)
}

/// Entry point: one module per entity, addressed by name.
pub struct Registry {
    prefix: String,
    timeout: Option<Duration>,
    modules: BTreeMap<String, Arc<dyn Dispatch>>,
}

impl Registry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            timeout: None,
            modules: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.prefix.clone()).with_timeout(config.operation_timeout)
    }

    /// Deadline handed to every orchestrator registered afterwards.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Binds `entity` to `engine`. Entities without a name are skipped and
    /// `false` is returned.
    pub fn register<E: Entity>(&mut self, engine: Arc<dyn StorageEngine>, entity: E) -> bool {
        if entity.name().is_empty() {
            warn!("skipping entity with an empty name");
            return false;
        }

        let orchestrator = Orchestrator::new(engine, entity).with_timeout(self.timeout);
        self.mount(Arc::new(EntityHandler::new(orchestrator)))
    }

    /// Adds a prebuilt module. A module with the same name is replaced.
    pub fn mount(&mut self, module: Arc<dyn Dispatch>) -> bool {
        let name = module.entity_name().to_string();
        if name.is_empty() {
            warn!("skipping module with an empty entity name");
            return false;
        }

        if self.modules.insert(name.clone(), module).is_some() {
            warn!(entity = %name, "entity registered twice, replacing earlier module");
        }
        info!(entity = %name, prefix = %self.prefix, "registered entity");
        true
    }

    pub fn module(&self, entity: &str) -> Option<Arc<dyn Dispatch>> {
        self.modules.get(entity).cloned()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Creates or widens the table of every registered entity.
    pub async fn migrate_all(&self) -> Result<(), ErrorRecord> {
        for module in self.modules.values() {
            module.migrate().await?;
        }
        Ok(())
    }

    pub fn subject(&self, entity: &str, operation: Operation) -> String {
        if self.prefix.is_empty() {
            format!("{entity}.{operation}")
        } else {
            format!("{}.{entity}.{operation}", self.prefix)
        }
    }

    pub async fn dispatch(
        &self,
        entity: &str,
        operation: Operation,
        body: &[u8],
    ) -> Result<Value, ErrorRecord> {
        let module = self
            .module(entity)
            .ok_or_else(|| RouteError::UnknownEntity(entity.to_string()))?;
        module.dispatch(operation, body).await
    }

    /// Routes a message addressed by subject.
    pub async fn handle_message(&self, subject: &str, body: &[u8]) -> Result<Value, ErrorRecord> {
        let (entity, operation) = self.parse_subject(subject)?;
        self.dispatch(entity, operation, body).await
    }

    fn parse_subject<'a>(&self, subject: &'a str) -> Result<(&'a str, Operation), RouteError> {
        let bad = || RouteError::BadSubject(subject.to_string());

        let rest = if self.prefix.is_empty() {
            subject
        } else {
            subject
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .ok_or_else(bad)?
        };

        let (entity, operation) = rest.rsplit_once('.').ok_or_else(bad)?;
        if entity.is_empty() {
            return Err(bad());
        }
        Ok((entity, operation.parse()?))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .field("entities", &self.entity_names())
            .finish()
    }
}
