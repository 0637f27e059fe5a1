use std::fmt;

/// A single validation rule that a field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text must be non-empty after trimming.
    Required,
    /// Number must be greater than or equal to the bound.
    Min(i64),
    /// Text must be one of the listed values.
    OneOf(&'static [&'static str]),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => f.write_str("required"),
            Rule::Min(bound) => write!(f, "min={bound}"),
            Rule::OneOf(allowed) => write!(f, "oneof={}", allowed.join(" ")),
        }
    }
}

/// A field that failed one of its rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}' failed on the '{rule}' rule")]
pub struct ValidationError {
    pub field: &'static str,
    pub rule: Rule,
}

/// Types whose values can be checked before they are persisted.
pub trait Validate {
    /// Returns the first failing field, if any.
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError {
            field,
            rule: Rule::Required,
        });
    }
    Ok(())
}

pub(crate) fn min(field: &'static str, value: i64, bound: i64) -> Result<(), ValidationError> {
    if value < bound {
        return Err(ValidationError {
            field,
            rule: Rule::Min(bound),
        });
    }
    Ok(())
}

pub(crate) fn one_of(
    field: &'static str,
    value: &str,
    allowed: &'static [&'static str],
) -> Result<(), ValidationError> {
    if !allowed.contains(&value) {
        return Err(ValidationError {
            field,
            rule: Rule::OneOf(allowed),
        });
    }
    Ok(())
}
