// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative property descriptors.
//!
//! A [`PropertySchema`] is attached to a property when its set is built and
//! never changes afterwards. It fixes the kind and element count, carries the
//! default value and the presentation extras (enum labels, bounds, step,
//! precision) and marks event properties.

use crate::error::GraphError;
use crate::value::{Scalar, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Immutable descriptor of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Human readable name, used to build the property path
    pub name: String,
    /// Value kind
    pub kind: ValueKind,
    /// Number of elements (1 for scalars)
    pub element_count: usize,
    /// Default value
    pub default: Value,
    /// Enum labels (number properties only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Lower bound hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Step hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Display precision hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Event properties carry no persistent value and fire on `set()`
    #[serde(default)]
    pub event: bool,
}

impl PropertySchema {
    /// Create a schema from its parts
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        element_count: usize,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            element_count,
            default: default.into(),
            options: None,
            min: None,
            max: None,
            step: None,
            precision: None,
            event: false,
        }
    }

    /// Number property
    pub fn number(name: impl Into<String>, default: f64) -> Self {
        Self::new(name, ValueKind::Number, 1, default)
    }

    /// Boolean property
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ValueKind::Boolean, 1, default)
    }

    /// String property
    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        let default: String = default.into();
        Self::new(name, ValueKind::String, 1, default)
    }

    /// Object property, initially `null`
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Object, 1, serde_json::Value::Null)
    }

    /// Number vector; the element count is the length of the default
    pub fn vector(name: impl Into<String>, default: impl Into<Vec<f64>>) -> Self {
        let default: Vec<f64> = default.into();
        let count = default.len();
        let value = Value::from_elements(default.into_iter().map(Scalar::Number).collect());
        Self::new(name, ValueKind::Number, count, value)
    }

    /// String array; the element count is the length of the default
    pub fn strings<S: Into<String>>(name: impl Into<String>, default: Vec<S>) -> Self {
        let default: Vec<Scalar> = default
            .into_iter()
            .map(|s| Scalar::String(s.into()))
            .collect();
        let count = default.len();
        Self::new(name, ValueKind::String, count, Value::from_elements(default))
    }

    /// Enum property: a number indexing into `options`
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        default: usize,
    ) -> Self {
        let mut schema = Self::number(name, default as f64);
        schema.options = Some(options.into_iter().map(Into::into).collect());
        schema
    }

    /// Event property
    pub fn event(name: impl Into<String>) -> Self {
        let mut schema = Self::number(name, 0.0);
        schema.event = true;
        schema
    }

    /// Set the bounds hint
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Set the step hint
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set the precision hint
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Get the enum labels, if any
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    /// Check if this is a multi-element property
    pub fn is_array(&self) -> bool {
        self.element_count > 1
    }

    /// Look up the label for an enum index
    pub fn option_label(&self, index: usize) -> Option<&str> {
        self.options.as_ref()?.get(index).map(String::as_str)
    }

    /// Property path segment: the human name with whitespace removed
    pub fn path_segment(&self) -> String {
        self.name.split_whitespace().collect()
    }

    /// Validate internal consistency
    pub fn validate(&self) -> Result<(), GraphError> {
        let invalid = |reason: String| GraphError::InvalidSchema {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if self.element_count == 0 {
            return Err(invalid("element count must be at least 1".to_string()));
        }
        self.default
            .check(self.kind, self.element_count)
            .map_err(|reason| invalid(format!("default value: {reason}")))?;

        if let Some(options) = &self.options {
            if self.kind != ValueKind::Number {
                return Err(invalid("options require a number property".to_string()));
            }
            if options.is_empty() {
                return Err(invalid("options list is empty".to_string()));
            }
            let in_range = self.default.elements().all(|s| match s {
                Scalar::Number(n) => *n >= 0.0 && (*n as usize) < options.len(),
                _ => false,
            });
            if !in_range {
                return Err(invalid("default is not a valid option index".to_string()));
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(invalid(format!("min {min} exceeds max {max}")));
            }
        }

        Ok(())
    }
}
