#![forbid(unsafe_code)]

//! Primitive values and upstream parameter shapes.

use std::fmt;

/// A primitive value published for an output key.
///
/// "Unset" is expressed as `Option<Value>::None` by every API that carries a
/// value, never as a variant here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(_) | Value::Text(_) => None,
        }
    }

    /// Interpret the value as a boolean flag.
    ///
    /// Numbers are true when non-zero; text is true only for `"true"`.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Stable handle of one remote parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParamId(pub u64);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParamId {
    fn from(v: u64) -> Self {
        ParamId(v)
    }
}

impl From<ParamId> for Value {
    fn from(id: ParamId) -> Self {
        Value::Int(i64::try_from(id.0).unwrap_or(i64::MAX))
    }
}

/// Declared shape of a remote parameter.
///
/// Composite shapes expand into sibling output keys: a choice backs `key`
/// and `key_text`, a range backs `key`, `key_min` and `key_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    Scalar,
    Choice,
    Range,
}

impl ParamShape {
    /// Suffixes of the derived sibling keys this shape expands into.
    #[must_use]
    pub fn sibling_suffixes(self) -> &'static [&'static str] {
        match self {
            ParamShape::Scalar => &[],
            ParamShape::Choice => &["_text"],
            ParamShape::Range => &["_min", "_max"],
        }
    }

    /// Number of output keys one descriptor of this shape expands into.
    #[must_use]
    pub fn family_size(self) -> usize {
        1 + self.sibling_suffixes().len()
    }
}

/// A value as delivered for one remote parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Single value; `None` when the remote reported nothing usable.
    Scalar(Option<Value>),
    /// Selected option: index plus display text.
    Choice { index: i64, text: String },
    /// Bounded number.
    Range { value: f64, min: f64, max: f64 },
}

impl ParamValue {
    #[must_use]
    pub fn shape(&self) -> ParamShape {
        match self {
            ParamValue::Scalar(_) => ParamShape::Scalar,
            ParamValue::Choice { .. } => ParamShape::Choice,
            ParamValue::Range { .. } => ParamShape::Range,
        }
    }

    /// The value mirrored by the un-suffixed key: the index of a choice, the
    /// current value of a range.
    #[must_use]
    pub fn primary(&self) -> Option<Value> {
        match self {
            ParamValue::Scalar(v) => v.clone(),
            ParamValue::Choice { index, .. } => Some(Value::Int(*index)),
            ParamValue::Range { value, .. } => Some(Value::Float(*value)),
        }
    }

    /// Boolean reading of [`primary`](Self::primary); unset reads as false.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        self.primary().is_some_and(|v| v.as_flag())
    }
}
