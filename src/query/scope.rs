//! Composable query constraints produced by named filters.

use super::Query;
use crate::entity::filter::{FilterRequest, FilterSet};

/// A query transform. Scopes are folded left to right onto a base query and
/// may only narrow it.
pub trait Scope: Send + Sync {
    fn apply(&self, query: Query) -> Query;
}

impl<F> Scope for F
where
    F: Fn(Query) -> Query + Send + Sync,
{
    fn apply(&self, query: Query) -> Query {
        self(query)
    }
}

pub type BoxedScope = Box<dyn Scope>;

/// Resolves the scopes a request asks for.
///
/// Walks `filters` in declaration order and builds a scope for every filter
/// the request names. Names the entity does not declare are ignored, and an
/// entity with no filters short-circuits without looking at the request.
pub fn compose_scopes(request: &FilterRequest, filters: &FilterSet) -> Vec<BoxedScope> {
    if filters.is_empty() {
        return Vec::new();
    }

    filters
        .iter()
        .filter_map(|filter| request.get(filter.name()).map(|params| filter.build(params)))
        .collect()
}

pub fn apply_scopes(query: Query, scopes: &[BoxedScope]) -> Query {
    scopes.iter().fold(query, |query, scope| scope.apply(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::filter::{FilterParams, NamedFilter};
    use crate::query::Condition;
    use std::collections::HashMap;

    fn tagging(tag: &'static str) -> NamedFilter {
        NamedFilter::new(tag, move |_params: &FilterParams| {
            move |query: Query| query.filter(Condition::eq("tag", tag))
        })
    }

    fn request(names: &[&str]) -> FilterRequest {
        names
            .iter()
            .map(|name| (name.to_string(), FilterParams::new()))
            .collect()
    }

    #[test]
    fn no_declared_filters_is_a_noop() {
        let scopes = compose_scopes(&request(&["a", "b"]), &FilterSet::new());
        assert!(scopes.is_empty());
    }

    #[test]
    fn unknown_names_are_dropped() {
        let filters = FilterSet::from_iter([tagging("a")]);
        let scopes = compose_scopes(&request(&["zzz"]), &filters);
        assert!(scopes.is_empty());
    }

    #[test]
    fn scopes_follow_declaration_order() {
        let filters = FilterSet::from_iter([tagging("first"), tagging("second"), tagging("third")]);

        let mut req = HashMap::new();
        req.insert("third".to_string(), FilterParams::new());
        req.insert("first".to_string(), FilterParams::new());

        let query = apply_scopes(Query::new(), &compose_scopes(&req, &filters));
        let tags: Vec<_> = query.conditions.iter().map(|c| c.value.clone()).collect();
        assert_eq!(tags, vec!["first", "third"]);
    }

    #[test]
    fn params_are_passed_through_untouched() {
        let filters = FilterSet::from_iter([NamedFilter::new("min", |params: &FilterParams| {
            let min = params.get("age").cloned();
            move |query: Query| match &min {
                Some(min) => query.filter(Condition::gt("age", min.clone())),
                None => query,
            }
        })]);

        let mut req = FilterRequest::new();
        req.insert(
            "min".to_string(),
            HashMap::from([("age".to_string(), "44".to_string())]),
        );

        let query = apply_scopes(Query::new(), &compose_scopes(&req, &filters));
        assert_eq!(query.conditions, vec![Condition::gt("age", "44")]);
        assert_eq!(req["min"]["age"], "44");
    }
}
