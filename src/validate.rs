//! Structural validation for decoded records.
//!
//! Records implement [`Validate`], usually by running a [`Validator`] over
//! their fields. Violations are collected rather than short-circuited so a
//! client sees every broken rule at once.

use std::fmt;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// One broken rule on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' failed '{}': {}", self.field, self.rule, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, rule: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            rule,
            message: message.into(),
        });
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// True when `field` broke `rule`.
    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.rule == rule)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.violations {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Values that can be checked by the `required` rule.
///
/// Mirrors zero-value semantics: empty text, zero numbers, `None` and empty
/// collections are all absent.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        self.as_str().is_present()
    }
}

impl<T> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Presence + ?Sized> Presence for &T {
    fn is_present(&self) -> bool {
        (**self).is_present()
    }
}

macro_rules! numeric_presence {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Presence for $ty {
                fn is_present(&self) -> bool {
                    *self != (0 as $ty)
                }
            }
        )*
    };
}

numeric_presence!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Rule runner accumulating violations.
///
/// ```ignore
/// let mut v = Validator::new();
/// v.required("name", &self.name).max_len("name", &self.name, 32);
/// v.min("age", self.age, 0);
/// v.finish()
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<T: Presence + ?Sized>(&mut self, field: &str, value: &T) -> &mut Self {
        if !value.is_present() {
            self.errors.add(field, "required", "value is required");
        }
        self
    }

    pub fn min<T: PartialOrd + fmt::Display>(&mut self, field: &str, value: T, bound: T) -> &mut Self {
        if value < bound {
            self.errors
                .add(field, "min", format!("{value} is less than {bound}"));
        }
        self
    }

    pub fn max<T: PartialOrd + fmt::Display>(&mut self, field: &str, value: T, bound: T) -> &mut Self {
        if value > bound {
            self.errors
                .add(field, "max", format!("{value} is greater than {bound}"));
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, bound: usize) -> &mut Self {
        let len = value.chars().count();
        if len < bound {
            self.errors
                .add(field, "min_len", format!("length {len} is less than {bound}"));
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, bound: usize) -> &mut Self {
        let len = value.chars().count();
        if len > bound {
            self.errors
                .add(field, "max_len", format!("length {len} exceeds {bound}"));
        }
        self
    }

    /// Custom rule: records a violation when `ok` is false.
    pub fn check(
        &mut self,
        field: &str,
        rule: &'static str,
        ok: bool,
        message: impl Into<String>,
    ) -> &mut Self {
        if !ok {
            self.errors.add(field, rule, message);
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation() {
        let name = String::new();
        let age = -1;

        let err = Validator::new()
            .required("name", &name)
            .required("age", &age)
            .min("age", age, 0)
            .finish()
            .unwrap_err();

        assert_eq!(err.violations().len(), 3);
        assert!(err.has("name", "required"));
        assert!(err.has("age", "min"));
        assert_eq!(
            err.to_string(),
            "field 'name' failed 'required': value is required; \
             field 'age' failed 'required': value is required; \
             field 'age' failed 'min': -1 is less than 0"
        );
    }

    #[test]
    fn zero_values_are_absent() {
        assert!(!0_i32.is_present());
        assert!(!"  ".is_present());
        assert!(!None::<u8>.is_present());
        assert!(42_i64.is_present());
        assert!(vec![1].is_present());
    }

    #[test]
    fn length_rules_count_chars() {
        let mut v = Validator::new();
        v.max_len("name", "åäö", 3).min_len("name", "åäö", 2);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.max_len("name", "abcd", 3);
        assert!(v.finish().unwrap_err().has("name", "max_len"));
    }
}
