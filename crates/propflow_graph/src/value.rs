// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value kinds, property values and the conversions applied across links.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Floating point number (also used for enums and events)
    Number,
    /// Boolean flag
    Boolean,
    /// Text
    String,
    /// Opaque structured data
    Object,
}

impl ValueKind {
    /// Get the display name of this kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Object => "object",
        }
    }

    /// Check if values of this kind can be converted to another kind
    pub fn can_convert_to(&self, other: ValueKind) -> bool {
        if *self == other {
            return true;
        }

        // Objects only travel to objects; the primitive kinds convert freely
        !matches!(self, Self::Object) && !matches!(other, Self::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single element of a property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// Number
    Number(f64),
    /// Boolean
    Boolean(bool),
    /// String
    String(String),
    /// Object (JSON-shaped, `Null` when unset)
    Object(serde_json::Value),
}

impl Scalar {
    /// Get the kind of this scalar
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::String(_) => ValueKind::String,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Get the number, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the object, if this is an object
    pub fn as_object(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The zero value of a kind
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Number => Self::Number(0.0),
            ValueKind::Boolean => Self::Boolean(false),
            ValueKind::String => Self::String(String::new()),
            ValueKind::Object => Self::Object(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(o) => write!(f, "{o}"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<serde_json::Value> for Scalar {
    fn from(value: serde_json::Value) -> Self {
        Self::Object(value)
    }
}

/// The value held by a property: one scalar, or a fixed-length array of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Single element
    Scalar(Scalar),
    /// Multiple elements (vectors, colors, matrices)
    Array(Vec<Scalar>),
}

impl Value {
    /// Build a value of `kind` holding `count` zero elements
    pub fn zeroed(kind: ValueKind, count: usize) -> Self {
        if count == 1 {
            Self::Scalar(Scalar::zero(kind))
        } else {
            Self::Array(vec![Scalar::zero(kind); count])
        }
    }

    /// Build a value from elements, collapsing a single element to a scalar
    pub fn from_elements(mut items: Vec<Scalar>) -> Self {
        if items.len() == 1 {
            if let Some(only) = items.pop() {
                return Self::Scalar(only);
            }
        }
        Self::Array(items)
    }

    /// Number of elements carried by this value
    pub fn element_count(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Array(items) => items.len(),
        }
    }

    /// Get an element by index; index 0 of a scalar is the scalar itself
    pub fn element(&self, index: usize) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) if index == 0 => Some(s),
            Self::Scalar(_) => None,
            Self::Array(items) => items.get(index),
        }
    }

    pub(crate) fn element_mut(&mut self, index: usize) -> Option<&mut Scalar> {
        match self {
            Self::Scalar(s) if index == 0 => Some(s),
            Self::Scalar(_) => None,
            Self::Array(items) => items.get_mut(index),
        }
    }

    /// Iterate over all elements
    pub fn elements(&self) -> impl Iterator<Item = &Scalar> {
        let items: &[Scalar] = match self {
            Self::Scalar(s) => std::slice::from_ref(s),
            Self::Array(items) => items,
        };
        items.iter()
    }

    /// Get the scalar, if this value has a single element
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Array(_) => None,
        }
    }

    /// Get the number, if this is a single number
    pub fn as_number(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_number)
    }

    /// Get the boolean, if this is a single boolean
    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    /// Get the string, if this is a single string
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Collect all elements as numbers, if every element is a number
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        self.elements().map(Scalar::as_number).collect()
    }

    /// Collect all elements as strings, if every element is a string
    pub fn as_strings(&self) -> Option<Vec<String>> {
        self.elements()
            .map(|s| s.as_str().map(str::to_string))
            .collect()
    }

    /// Check that this value fits a property of `kind` with `count` elements
    pub fn check(&self, kind: ValueKind, count: usize) -> Result<(), String> {
        match self {
            Self::Scalar(_) if count != 1 => {
                return Err(format!("expected {count} elements, got a single value"));
            }
            Self::Array(items) if count == 1 || items.len() != count => {
                return Err(format!("expected {count} elements, got {}", items.len()));
            }
            _ => {}
        }

        match self.elements().find(|s| s.kind() != kind) {
            Some(wrong) => Err(format!("expected {kind} elements, found {}", wrong.kind())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_scalar_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

impl_scalar_value!(Scalar, f64, bool, &str, String, serde_json::Value);

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Error produced when a value cannot be converted across a link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// Text could not be parsed as a number
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// Text could not be parsed as a boolean
    #[error("'{0}' is not a boolean")]
    NotABoolean(String),

    /// No rule exists between the two kinds
    #[error("no conversion from {from} to {to}")]
    Unsupported {
        /// Source kind
        from: ValueKind,
        /// Destination kind
        to: ValueKind,
    },
}

/// Enum labels attached to either end of a conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionHints<'a> {
    /// Labels of the source property, if it is an enum
    pub source_options: Option<&'a [String]>,
    /// Labels of the destination property, if it is an enum
    pub dest_options: Option<&'a [String]>,
}

/// Convert one scalar to the destination kind
pub fn convert_scalar(
    value: &Scalar,
    to: ValueKind,
    hints: ConversionHints<'_>,
) -> Result<Scalar, ConversionError> {
    if value.kind() == to {
        return Ok(value.clone());
    }

    match (value, to) {
        (Scalar::Number(n), ValueKind::Boolean) => Ok(Scalar::Boolean(*n != 0.0 && !n.is_nan())),
        (Scalar::Boolean(b), ValueKind::Number) => Ok(Scalar::Number(if *b { 1.0 } else { 0.0 })),
        (Scalar::Number(n), ValueKind::String) => {
            let label = hints
                .source_options
                .and_then(|options| option_index(*n).and_then(|i| options.get(i)));
            Ok(Scalar::String(match label {
                Some(label) => label.clone(),
                None => format_number(*n),
            }))
        }
        (Scalar::String(s), ValueKind::Number) => {
            if let Some(i) = hints
                .dest_options
                .and_then(|options| options.iter().position(|o| o == s))
            {
                return Ok(Scalar::Number(i as f64));
            }
            let text = s.trim();
            if text.is_empty() {
                return Ok(Scalar::Number(0.0));
            }
            text.parse::<f64>()
                .map(Scalar::Number)
                .map_err(|_| ConversionError::NotANumber(s.clone()))
        }
        (Scalar::Boolean(b), ValueKind::String) => Ok(Scalar::String(b.to_string())),
        (Scalar::String(s), ValueKind::Boolean) => match s.trim() {
            "true" | "1" => Ok(Scalar::Boolean(true)),
            "false" | "0" | "" => Ok(Scalar::Boolean(false)),
            _ => Err(ConversionError::NotABoolean(s.clone())),
        },
        _ => Err(ConversionError::Unsupported {
            from: value.kind(),
            to,
        }),
    }
}

/// Convert a whole value element by element
pub fn convert_value(
    value: &Value,
    to: ValueKind,
    hints: ConversionHints<'_>,
) -> Result<Value, ConversionError> {
    match value {
        Value::Scalar(s) => convert_scalar(s, to, hints).map(Value::Scalar),
        Value::Array(items) => items
            .iter()
            .map(|s| convert_scalar(s, to, hints))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

fn option_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

/// Render a number the way a script runtime would (`13`, `11.1`, `Infinity`)
pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    format!("{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(value: impl Into<Scalar>, to: ValueKind) -> Result<Scalar, ConversionError> {
        convert_scalar(&value.into(), to, ConversionHints::default())
    }

    #[test]
    fn test_kind_compatibility() {
        assert!(ValueKind::String.can_convert_to(ValueKind::Number));
        assert!(ValueKind::Number.can_convert_to(ValueKind::Boolean));
        assert!(ValueKind::Object.can_convert_to(ValueKind::Object));
        assert!(!ValueKind::Object.can_convert_to(ValueKind::Number));
        assert!(!ValueKind::Boolean.can_convert_to(ValueKind::Object));
    }

    #[test]
    fn test_string_number_conversion() {
        assert_eq!(convert("11.1", ValueKind::Number), Ok(Scalar::Number(11.1)));
        assert_eq!(convert(13.0, ValueKind::String), Ok(Scalar::from("13")));
        assert_eq!(convert(0.5, ValueKind::String), Ok(Scalar::from("0.5")));
        assert_eq!(
            convert("abc", ValueKind::Number),
            Err(ConversionError::NotANumber("abc".to_string()))
        );
    }

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(convert("", ValueKind::Number), Ok(Scalar::Number(0.0)));
        assert_eq!(convert("  ", ValueKind::Number), Ok(Scalar::Number(0.0)));
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(convert(2.0, ValueKind::Boolean), Ok(Scalar::Boolean(true)));
        assert_eq!(convert(0.0, ValueKind::Boolean), Ok(Scalar::Boolean(false)));
        assert_eq!(convert(f64::NAN, ValueKind::Boolean), Ok(Scalar::Boolean(false)));
        assert_eq!(convert(true, ValueKind::Number), Ok(Scalar::Number(1.0)));
        assert_eq!(convert(false, ValueKind::String), Ok(Scalar::from("false")));
        assert_eq!(convert("true", ValueKind::Boolean), Ok(Scalar::Boolean(true)));
        assert!(convert("maybe", ValueKind::Boolean).is_err());
    }

    #[test]
    fn test_object_has_no_rules() {
        let result = convert(serde_json::json!({ "a": 1 }), ValueKind::Number);
        assert!(matches!(result, Err(ConversionError::Unsupported { .. })));
    }

    #[test]
    fn test_enum_labels() {
        let options = vec!["Off".to_string(), "Low".to_string(), "High".to_string()];
        let to_label = ConversionHints {
            source_options: Some(options.as_slice()),
            dest_options: None,
        };
        let from_label = ConversionHints {
            source_options: None,
            dest_options: Some(options.as_slice()),
        };

        let label = convert_scalar(&Scalar::Number(2.0), ValueKind::String, to_label);
        assert_eq!(label, Ok(Scalar::from("High")));

        let index = convert_scalar(&Scalar::from("Low"), ValueKind::Number, from_label);
        assert_eq!(index, Ok(Scalar::Number(1.0)));

        // Unknown labels still parse as numbers
        let index = convert_scalar(&Scalar::from("2"), ValueKind::Number, from_label);
        assert_eq!(index, Ok(Scalar::Number(2.0)));
    }

    #[test]
    fn test_array_conversion() {
        let value = Value::from(vec!["11.1", "22.2"]);
        let converted = convert_value(&value, ValueKind::Number, ConversionHints::default());
        assert_eq!(converted, Ok(Value::from([11.1, 22.2])));
    }

    #[test]
    fn test_value_check() {
        assert!(Value::from([1.0, 2.0, 3.0]).check(ValueKind::Number, 3).is_ok());
        assert!(Value::from([1.0, 2.0]).check(ValueKind::Number, 3).is_err());
        assert!(Value::from(1.0).check(ValueKind::Number, 2).is_err());
        assert!(Value::from("x").check(ValueKind::Number, 1).is_err());
        assert!(Value::from(vec![1.0]).check(ValueKind::Number, 1).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from([1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
    }
}
