//! Runtime values and their declared types.
//!
//! Ports declare a [`ValueType`]; contexts hold [`Value`]s. The engine itself
//! never interprets values beyond the checks made by
//! [`TypeValidator`](crate::validator::TypeValidator).

use core::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// ValueType
// ─────────────────────────────────────────────────────────────────────────────

/// The declared type of a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Accepts every value.
    Any,
    /// The absence of a meaningful value.
    Null,
    /// A boolean.
    Bool,
    /// A signed integer.
    Int,
    /// A floating point number.
    Float,
    /// Either [`Int`](Self::Int) or [`Float`](Self::Float).
    Number,
    /// A UTF-8 string.
    Text,
    /// An ordered collection whose elements have the inner type.
    List(Box<ValueType>),
}

impl ValueType {
    /// Shorthand for `ValueType::List(Box::new(inner))`.
    #[must_use]
    pub fn list_of(inner: ValueType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Returns `true` if a port declaring `self` may feed a slot declaring `target`.
    ///
    /// `Any` accepts everything, `Number` accepts both numeric types, and
    /// lists are covariant in their element type.
    #[must_use]
    pub fn is_assignable_to(&self, target: &ValueType) -> bool {
        match (self, target) {
            (_, ValueType::Any) => true,
            (ValueType::Int | ValueType::Float | ValueType::Number, ValueType::Number) => true,
            (ValueType::List(source), ValueType::List(target)) => source.is_assignable_to(target),
            (source, target) => source == target,
        }
    }

    /// Returns the element type if this is a list type.
    #[must_use]
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Null => write!(f, "null"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Number => write!(f, "number"),
            ValueType::Text => write!(f, "text"),
            ValueType::List(inner) => write!(f, "list<{}>", inner),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A value flowing through the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A UTF-8 string.
    Text(String),
    /// An ordered collection.
    List(Vec<Value>),
}

impl Value {
    /// Infers the most specific type describing this value.
    ///
    /// Lists report their common element type, ignoring `Null` entries:
    /// homogeneous lists keep it, mixed numeric lists widen to `Number`,
    /// anything else (including the empty list) becomes `Any`.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::List(items) => ValueType::list_of(common_type(items)),
        }
    }

    /// Returns `true` if this value can be stored in a slot of type `ty`.
    ///
    /// Unlike comparing [`value_type`](Self::value_type) results, this checks
    /// list elements one by one, so an empty list conforms to every list type.
    /// A `Null` element stands for a missing entry and conforms to any element
    /// type.
    #[must_use]
    pub fn conforms_to(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (_, ValueType::Any) => true,
            (Value::List(items), ValueType::List(inner)) => items
                .iter()
                .all(|item| item.is_null() || item.conforms_to(inner)),
            (Value::List(_), _) => false,
            (value, ty) => value.value_type().is_assignable_to(ty),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list payload.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// The element type of a list, ignoring `Null` entries.
fn common_type(items: &[Value]) -> ValueType {
    let mut types = items
        .iter()
        .filter(|item| !item.is_null())
        .map(Value::value_type);
    let Some(first) = types.next() else {
        return ValueType::Any;
    };
    let mut numeric = matches!(first, ValueType::Int | ValueType::Float);
    let mut uniform = true;
    for ty in types {
        uniform &= ty == first;
        numeric &= matches!(ty, ValueType::Int | ValueType::Float);
    }
    if uniform {
        first
    } else if numeric {
        ValueType::Number
    } else {
        ValueType::Any
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}
