//! Named, client-invocable filters and the per-entity registry holding them.

use crate::query::{BoxedScope, Scope};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Raw parameters of one filter invocation.
pub type FilterParams = HashMap<String, String>;

/// Filter name to its parameters, as sent by a client.
pub type FilterRequest = HashMap<String, FilterParams>;

type ScopeBuilder = dyn Fn(&FilterParams) -> BoxedScope + Send + Sync;

/// A name bound to a scope builder.
///
/// The builder receives the parameters by shared reference and is free to
/// ignore keys it does not understand.
#[derive(Clone)]
pub struct NamedFilter {
    name: String,
    builder: Arc<ScopeBuilder>,
}

impl NamedFilter {
    pub fn new<F, S>(name: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&FilterParams) -> S + Send + Sync + 'static,
        S: Scope + 'static,
    {
        Self {
            name: name.into(),
            builder: Arc::new(move |params: &FilterParams| Box::new(builder(params)) as BoxedScope),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self, params: &FilterParams) -> BoxedScope {
        (self.builder)(params)
    }
}

impl fmt::Debug for NamedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered filter registry with a name index, built once at wiring time.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<NamedFilter>,
    index: HashMap<String, usize>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `filter`. A filter with an already registered name replaces
    /// the earlier one but keeps its position.
    pub fn push(&mut self, filter: NamedFilter) {
        if let Some(&position) = self.index.get(filter.name()) {
            warn!(filter = filter.name(), "filter registered twice, replacing earlier definition");
            self.filters[position] = filter;
            return;
        }

        self.index.insert(filter.name().to_string(), self.filters.len());
        self.filters.push(filter);
    }

    pub fn get(&self, name: &str) -> Option<&NamedFilter> {
        self.index.get(name).map(|&position| &self.filters[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedFilter> {
        self.filters.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(NamedFilter::name).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FromIterator<NamedFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = NamedFilter>>(iter: I) -> Self {
        let mut set = Self::new();
        for filter in iter {
            set.push(filter);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Condition, Query};

    fn marker(name: &'static str, value: i64) -> NamedFilter {
        NamedFilter::new(name, move |_: &FilterParams| {
            move |query: Query| query.filter(Condition::eq("marker", value))
        })
    }

    #[test]
    fn keeps_registration_order() {
        let set = FilterSet::from_iter([marker("b", 1), marker("a", 2), marker("c", 3)]);
        assert_eq!(set.names(), vec!["b", "a", "c"]);
        assert!(set.contains("a"));
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn duplicate_name_replaces_in_place() {
        let set = FilterSet::from_iter([marker("a", 1), marker("b", 2), marker("a", 3)]);
        assert_eq!(set.names(), vec!["a", "b"]);

        let scope = set.get("a").map(|f| f.build(&FilterParams::new()));
        let query = scope.map(|s| s.apply(Query::new())).unwrap_or_default();
        assert_eq!(query.conditions, vec![Condition::eq("marker", 3)]);
    }
}
