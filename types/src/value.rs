//! Dynamic values carried through promise chains.
//!
//! Fulfillment values, rejection reasons, and progress payloads are all
//! [`Value`]s. A value may itself be a [`Thenable`](crate::Thenable), which is
//! how handlers hand back a promise for the engine to adopt.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::thenable::{Thenable, ThenableRef};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Anything exposing the `then` capability. Compared by identity.
    Thenable(ThenableRef),
}

/// A value did not have the shape a caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl Value {
    /// Wrap a thenable so it can travel as a value.
    pub fn thenable(thenable: impl Thenable + 'static) -> Self {
        Self::Thenable(Rc::new(thenable))
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Thenable(_) => "thenable",
        }
    }

    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub const fn is_thenable(&self) -> bool {
        matches!(self, Self::Thenable(_))
    }

    #[must_use]
    pub fn as_thenable(&self) -> Option<&ThenableRef> {
        match self {
            Self::Thenable(thenable) => Some(thenable),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            Self::Number(number) => Ok(*number),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(flag) => Ok(*flag),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Self::String(text) => Ok(text),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ValueError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>, ValueError> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(other.mismatch("map")),
        }
    }

    /// Convert to JSON. Returns `None` if the value holds a thenable or a
    /// non-finite number, neither of which JSON can represent.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(flag) => serde_json::Value::Bool(*flag),
            Self::Number(number) => {
                serde_json::Number::from_f64(*number).map(serde_json::Value::Number)?
            }
            Self::String(text) => serde_json::Value::String(text.clone()),
            Self::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Self::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Self::Thenable(_) => return None,
        })
    }

    /// Render for logs, capped at `max` characters (minimum 3).
    #[must_use]
    pub fn preview(&self, max: usize) -> String {
        let max = max.max(3);
        let rendered = self.to_string();
        if rendered.chars().count() <= max {
            return rendered;
        }
        let head: String = rendered.chars().take(max - 3).collect();
        format!("{head}...")
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Thenable(a), Self::Thenable(b)) => {
                Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            Self::Number(number) => f.debug_tuple("Number").field(number).finish(),
            Self::String(text) => f.debug_tuple("String").field(text).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Thenable(thenable) => write!(f, "Thenable({:p})", Rc::as_ptr(thenable)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::String(text) => f.write_str(text),
            Self::Thenable(_) => f.write_str("[thenable]"),
            Self::List(_) | Self::Map(_) => self.fmt_nested(f),
        }
    }
}

impl Value {
    /// JSON layout for collections. Numbers and thenables render as they do
    /// at the top level; strings are quoted.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined | Self::Null => f.write_str("null"),
            Self::String(text) => {
                let quoted = serde_json::to_string(text).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    let key = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "{key}:")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Self::Bool(_) | Self::Number(_) | Self::Thenable(_) => fmt::Display::fmt(self, f),
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Undefined
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<ThenableRef> for Value {
    fn from(value: ThenableRef) -> Self {
        Self::Thenable(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => {
                number.as_f64().map_or(Self::Null, Self::Number)
            }
            serde_json::Value::String(text) => Self::String(text),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// A failed accessor becomes a rejection reason, so handlers can use `?`.
impl From<ValueError> for Value {
    fn from(error: ValueError) -> Self {
        Self::String(error.to_string())
    }
}

/// The input shape accepted by `all`: ordered or keyed.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Collection {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Map(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for Collection {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Collection {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl TryFrom<Value> for Collection {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::List(items) => Ok(Self::List(items)),
            Value::Map(entries) => Ok(Self::Map(entries)),
            other => Err(other.mismatch("list or map")),
        }
    }
}
