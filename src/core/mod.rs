pub mod error;
pub mod value;

pub use error::{Result, StoreError};
pub use value::{compare, type_name, values_equal};

/// A stored document: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;
