//! Request envelopes, one per operation.

use crate::core::Row;
use crate::entity::{FilterParams, FilterRequest};
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::BTreeMap;

/// Raw entity bytes, decoded only once the orchestrator knows the record type.
///
/// Inside a JSON envelope the payload is an embedded JSON value, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Serializes `value` into a payload.
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_vec(value).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self(raw.get().as_bytes().to_vec()))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: Box<RawValue> = serde_json::from_slice(&self.0).map_err(ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

/// Accepts identifiers sent either as strings or as bare numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// Envelope keys also accept their capitalized forms ("ID", "Entity", ...).

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(alias = "Entity")]
    pub entity: Payload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadRequest {
    #[serde(alias = "ID", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "Filters")]
    pub filters: FilterRequest,
}

/// Full replace of the row identified by `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(alias = "ID", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "Entity")]
    pub entity: Payload,
    #[serde(default, alias = "Filters")]
    pub filters: FilterRequest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(alias = "ID", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "Filters")]
    pub filters: FilterRequest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "Skip")]
    pub skip: usize,
    /// Zero means no limit.
    #[serde(default, alias = "Take")]
    pub take: usize,
    /// Exact-match constraints, column to value.
    #[serde(default, rename = "where", alias = "Where")]
    pub where_eq: BTreeMap<String, Value>,
    #[serde(default, alias = "Filters")]
    pub filters: FilterRequest,
}

/// Partial update: only the columns in `data` change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(alias = "ID", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "Data")]
    pub data: Row,
    #[serde(default, alias = "Filters")]
    pub filters: FilterRequest,
}

impl CreateRequest {
    pub fn new(entity: impl Into<Payload>) -> Self {
        Self {
            entity: entity.into(),
        }
    }
}

impl ReadRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl UpdateRequest {
    pub fn new(id: impl Into<String>, entity: impl Into<Payload>) -> Self {
        Self {
            id: id.into(),
            entity: entity.into(),
            filters: FilterRequest::new(),
        }
    }
}

impl DeleteRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl SearchRequest {
    pub fn new(skip: usize, take: usize) -> Self {
        Self {
            skip,
            take,
            ..Self::default()
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_eq.insert(field.into(), value.into());
        self
    }
}

impl PatchRequest {
    pub fn new(id: impl Into<String>, data: Row) -> Self {
        Self {
            id: id.into(),
            data,
            filters: FilterRequest::new(),
        }
    }
}

macro_rules! filterable {
    ($($request:ty),* $(,)?) => {
        $(
            impl $request {
                /// Asks for the named filter with the given parameters.
                pub fn with_filter<K, V>(
                    mut self,
                    name: impl Into<String>,
                    params: impl IntoIterator<Item = (K, V)>,
                ) -> Self
                where
                    K: Into<String>,
                    V: Into<String>,
                {
                    let params: FilterParams = params
                        .into_iter()
                        .map(|(k, v)| (k.into(), v.into()))
                        .collect();
                    self.filters.insert(name.into(), params);
                    self
                }
            }
        )*
    };
}

filterable!(ReadRequest, UpdateRequest, DeleteRequest, SearchRequest, PatchRequest);
