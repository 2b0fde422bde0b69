use crate::core::{Result, StoreError};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Compares two stored values.
///
/// Filter parameters reach the engine as strings, so numeric text is coerced
/// against numbers and `"true"`/`"false"` against booleans. NULL sorts last.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Greater),
        (_, Value::Null) => Ok(Ordering::Less),

        (Value::Number(a), Value::Number(b)) => Ok(compare_numbers(a, b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),

        (Value::Number(a), Value::String(b)) => compare_number_text(a, b, left, right),
        (Value::String(a), Value::Number(b)) => {
            compare_number_text(b, a, right, left).map(Ordering::reverse)
        }

        (Value::Bool(a), Value::String(b)) => parse_bool(b)
            .map(|b| a.cmp(&b))
            .ok_or_else(|| mismatch(left, right)),
        (Value::String(a), Value::Bool(b)) => parse_bool(a)
            .map(|a| a.cmp(b))
            .ok_or_else(|| mismatch(left, right)),

        _ => Err(mismatch(left, right)),
    }
}

/// Equality with the same coercions as [`compare`]; incompatible types are unequal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    left == right || matches!(compare(left, right), Ok(Ordering::Equal))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOLEAN",
        Value::Number(n) if n.is_f64() => "FLOAT",
        Value::Number(_) => "INTEGER",
        Value::String(_) => "TEXT",
        Value::Array(_) => "ARRAY",
        Value::Object(_) => "OBJECT",
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.cmp(&b);
    }
    compare_floats(to_f64(a), to_f64(b))
}

fn compare_number_text(number: &Number, text: &str, left: &Value, right: &Value) -> Result<Ordering> {
    let text = text.trim();
    if let (Some(a), Ok(b)) = (number.as_i64(), text.parse::<i64>()) {
        return Ok(a.cmp(&b));
    }
    text.parse::<f64>()
        .map(|b| compare_floats(to_f64(number), b))
        .map_err(|_| mismatch(left, right))
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn to_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        t if t.eq_ignore_ascii_case("true") || t == "1" => Some(true),
        t if t.eq_ignore_ascii_case("false") || t == "0" => Some(false),
        _ => None,
    }
}

fn mismatch(left: &Value, right: &Value) -> StoreError {
    StoreError::TypeMismatch(format!(
        "Cannot compare incompatible types: {} and {}",
        type_name(left),
        type_name(right)
    ))
}
