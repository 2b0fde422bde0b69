//! The error taxonomy every operation reports through.

use crate::core::StoreError;
use crate::validate::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of failure kinds. Only the code is a stable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The payload could not be parsed into the record's shape.
    Decode,
    /// The payload parsed but broke a structural rule. Create/Update only.
    Validation,
    /// Everything else: not found, constraint violations, engine failures.
    Generic,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Decode => "DECODE",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Generic => "GENERIC",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `{code, message}` - the only error shape that leaves the crate boundary.
///
/// `message` is diagnostic text and may embed engine output; do not parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ErrorRecord {
    #[serde(rename = "code")]
    kind: ErrorKind,
    message: String,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Decode, err.to_string())
    }

    pub fn validation(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Validation, err.to_string())
    }

    pub fn generic(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Generic, err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for ErrorRecord {
    fn from(err: StoreError) -> Self {
        Self::generic(err)
    }
}

impl From<ValidationErrors> for ErrorRecord {
    fn from(err: ValidationErrors) -> Self {
        Self::validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_code_and_message() {
        let record = ErrorRecord::validation("field 'name' failed 'required'");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"code": "VALIDATION", "message": "field 'name' failed 'required'"})
        );
    }

    #[test]
    fn engine_errors_are_generic() {
        let record = ErrorRecord::from(StoreError::NotFound);
        assert_eq!(record.kind(), ErrorKind::Generic);
        assert_eq!(record.code(), "GENERIC");
        assert_eq!(record.message(), "record not found");
    }

    #[test]
    fn round_trips_through_json() {
        let parsed: ErrorRecord =
            serde_json::from_value(json!({"code": "DECODE", "message": "bad"})).unwrap();
        assert_eq!(parsed, ErrorRecord::decode("bad"));
    }
}
