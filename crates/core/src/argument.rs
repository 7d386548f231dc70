//! Named, typed configuration values for components and adapters.

use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The type of an [`ArgumentValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Double,
    Integer,
    Boolean,
    Text,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentKind::Double => "double",
            ArgumentKind::Integer => "integer",
            ArgumentKind::Boolean => "boolean",
            ArgumentKind::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum ArgumentValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
}

impl ArgumentValue {
    #[must_use]
    pub fn kind(&self) -> ArgumentKind {
        match self {
            ArgumentValue::Double(_) => ArgumentKind::Double,
            ArgumentValue::Integer(_) => ArgumentKind::Integer,
            ArgumentValue::Boolean(_) => ArgumentKind::Boolean,
            ArgumentValue::Text(_) => ArgumentKind::Text,
        }
    }

    /// Returns the value as a double, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgumentValue::Double(value) => Some(*value),
            ArgumentValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgumentValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgumentValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Double(value) => write!(f, "{value}"),
            ArgumentValue::Integer(value) => write!(f, "{value}"),
            ArgumentValue::Boolean(value) => write!(f, "{value}"),
            ArgumentValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        ArgumentValue::Double(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Integer(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Boolean(value)
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Text(value.to_owned())
    }
}

/// Errors that can occur when reading or changing arguments.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("argument `{id}` is read-only")]
    ReadOnly { id: String },

    #[error("argument `{id}` expects a {expected} value, got {found}")]
    TypeMismatch {
        id: String,
        expected: ArgumentKind,
        found: ArgumentKind,
    },

    #[error("`{value}` is not a possible value for argument `{id}`")]
    NotPossible { id: String, value: String },

    #[error("no argument with id `{id}`")]
    Unknown { id: String },
}

/// A named, typed value with a default and optional restrictions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Argument {
    id: String,
    caption: String,
    description: String,
    value: ArgumentValue,
    default: ArgumentValue,
    read_only: bool,
    optional: bool,
    possible_values: Vec<ArgumentValue>,
}

impl Argument {
    /// Creates a writable argument holding its default value.
    #[must_use]
    pub fn new(id: impl Into<String>, default: impl Into<ArgumentValue>) -> Self {
        let id = id.into();
        let default = default.into();
        Self {
            caption: id.clone(),
            id,
            description: String::new(),
            value: default.clone(),
            default,
            read_only: false,
            optional: false,
            possible_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restricts the argument to a fixed set of values.
    #[must_use]
    pub fn with_possible_values(mut self, values: Vec<ArgumentValue>) -> Self {
        self.possible_values = values;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn caption(&self) -> &str {
        &self.caption
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn value(&self) -> &ArgumentValue {
        &self.value
    }

    #[must_use]
    pub fn default_value(&self) -> &ArgumentValue {
        &self.default
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn possible_values(&self) -> &[ArgumentValue] {
        &self.possible_values
    }

    /// Changes the value.
    ///
    /// Integers are widened when the argument holds doubles.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the value unchanged, if the argument is
    /// read-only, the type differs, or the value is not one of the possible
    /// values.
    pub fn set_value(&mut self, value: impl Into<ArgumentValue>) -> Result<(), ArgumentError> {
        if self.read_only {
            return Err(ArgumentError::ReadOnly {
                id: self.id.clone(),
            });
        }
        let value = match (self.default.kind(), value.into()) {
            (ArgumentKind::Double, integer @ ArgumentValue::Integer(_)) => {
                integer.as_f64().map_or(integer, ArgumentValue::Double)
            }
            (_, value) => value,
        };
        if value.kind() != self.default.kind() {
            return Err(ArgumentError::TypeMismatch {
                id: self.id.clone(),
                expected: self.default.kind(),
                found: value.kind(),
            });
        }
        if !self.possible_values.is_empty() && !self.possible_values.contains(&value) {
            return Err(ArgumentError::NotPossible {
                id: self.id.clone(),
                value: value.to_string(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Restores the default value, ignoring the read-only flag.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }
}

/// Returns the argument with `id`.
///
/// # Errors
///
/// Returns [`ArgumentError::Unknown`] if no argument has that id.
pub fn find<'a>(arguments: &'a [Argument], id: &str) -> Result<&'a Argument, ArgumentError> {
    arguments
        .iter()
        .find(|argument| argument.id == id)
        .ok_or_else(|| ArgumentError::Unknown { id: id.to_owned() })
}

/// Sets the value of the argument with `id`.
///
/// # Errors
///
/// Returns an error if no argument has that id, or the value is rejected.
pub fn set(
    arguments: &mut [Argument],
    id: &str,
    value: impl Into<ArgumentValue>,
) -> Result<(), ArgumentError> {
    arguments
        .iter_mut()
        .find(|argument| argument.id == id)
        .ok_or_else(|| ArgumentError::Unknown { id: id.to_owned() })?
        .set_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_updates() {
        let mut argument = Argument::new("A", 1.0).with_caption("Scale");
        assert_eq!(argument.value(), &ArgumentValue::Double(1.0));
        assert_eq!(argument.caption(), "Scale");

        argument.set_value(2.5).unwrap();
        assert_eq!(argument.value().as_f64(), Some(2.5));

        argument.reset();
        assert_eq!(argument.value(), argument.default_value());
    }

    #[test]
    fn integers_widen_to_doubles() {
        let mut argument = Argument::new("B", 0.0);
        argument.set_value(3_i64).unwrap();
        assert_eq!(argument.value(), &ArgumentValue::Double(3.0));
    }

    #[test]
    fn read_only_rejects_changes() {
        let mut argument = Argument::new("A", 1.0).read_only();
        assert_eq!(
            argument.set_value(2.0),
            Err(ArgumentError::ReadOnly { id: "A".into() })
        );
        assert_eq!(argument.value().as_f64(), Some(1.0));
    }

    #[test]
    fn type_mismatch() {
        let mut argument = Argument::new("Extrapolate", true);
        let err = argument.set_value("yes").unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument `Extrapolate` expects a boolean value, got text"
        );
    }

    #[test]
    fn possible_values() {
        let mut argument = Argument::new("Method", "nearest")
            .with_possible_values(vec!["nearest".into(), "linear".into()]);
        argument.set_value("linear").unwrap();
        assert!(matches!(
            argument.set_value("cubic"),
            Err(ArgumentError::NotPossible { .. })
        ));
        assert_eq!(argument.value().as_str(), Some("linear"));
    }

    #[test]
    fn lookup_by_id() {
        let mut arguments = vec![Argument::new("A", 1.0), Argument::new("B", 0.0)];
        set(&mut arguments, "B", 4.0).unwrap();
        assert_eq!(find(&arguments, "B").unwrap().value().as_f64(), Some(4.0));
        assert_eq!(
            find(&arguments, "C"),
            Err(ArgumentError::Unknown { id: "C".into() })
        );
    }
}
