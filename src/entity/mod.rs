//! Capability contracts every exposed domain type satisfies.

pub mod filter;

pub use filter::{FilterParams, FilterRequest, FilterSet, NamedFilter};

use crate::validate::Validate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// A persistable domain record.
pub trait Record:
    Serialize + DeserializeOwned + Validate + Default + Send + Sync + 'static
{
    /// Column holding the engine-assigned identifier.
    fn primary_key() -> &'static str {
        "id"
    }
}

/// Describes one domain type to the orchestrator.
///
/// Implementations are built once at wiring time and never change afterwards.
pub trait Entity: Send + Sync + 'static {
    type Record: Record;

    /// Stable identifier, also used as the table name. Empty disables registration.
    fn name(&self) -> &str;

    /// Blank record that payloads are decoded onto.
    fn new_instance(&self) -> Self::Record {
        Self::Record::default()
    }

    /// Empty container for search results.
    fn new_collection(&self) -> Vec<Self::Record> {
        Vec::new()
    }

    fn filters(&self) -> &FilterSet;
}

/// Ready-made [`Entity`] for a record type plus its declared filters.
pub struct EntityDescriptor<R> {
    name: String,
    filters: FilterSet,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> EntityDescriptor<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: FilterSet::new(),
            _record: PhantomData,
        }
    }

    pub fn with_filter(mut self, filter: NamedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = NamedFilter>) -> Self {
        for filter in filters {
            self.filters.push(filter);
        }
        self
    }
}

impl<R: Record> Entity for EntityDescriptor<R> {
    type Record = R;

    fn name(&self) -> &str {
        &self.name
    }

    fn filters(&self) -> &FilterSet {
        &self.filters
    }
}

impl<R> fmt::Debug for EntityDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("filters", &self.filters.names())
            .finish()
    }
}
