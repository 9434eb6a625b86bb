//! Type validators attached to input ports.
//!
//! A validator answers two questions:
//!
//! - [`accepts_type`](TypeValidator::accepts_type): may a port declaring this
//!   type be linked here? Checked once, when a link is created.
//! - [`accepts_value`](TypeValidator::accepts_value): may this runtime value be
//!   stored here? Checked by the processor before every operation.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueType};

/// Acceptance rule for an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeValidator {
    /// Accepts anything assignable to one of the listed types.
    Class(Vec<ValueType>),
    /// Accepts if any child accepts. A `None` child accepts everything.
    Composite(Vec<Option<TypeValidator>>),
    /// Accepts a collection whose every element satisfies the inner validator.
    Collection(Box<TypeValidator>),
}

impl TypeValidator {
    /// A class validator for a single type.
    #[must_use]
    pub fn of(ty: ValueType) -> Self {
        Self::Class(vec![ty])
    }

    /// A validator that accepts every type and value.
    #[must_use]
    pub fn any() -> Self {
        Self::Composite(vec![None])
    }

    /// A collection validator wrapping `inner`.
    #[must_use]
    pub fn collection_of(inner: TypeValidator) -> Self {
        Self::Collection(Box::new(inner))
    }

    /// Static check against a source port's declared type.
    #[must_use]
    pub fn accepts_type(&self, ty: &ValueType) -> bool {
        match self {
            TypeValidator::Class(types) => types.iter().any(|target| ty.is_assignable_to(target)),
            TypeValidator::Composite(children) => children
                .iter()
                .any(|child| child.as_ref().is_none_or(|child| child.accepts_type(ty))),
            TypeValidator::Collection(inner) => ty
                .element_type()
                .is_some_and(|element| inner.accepts_type(element)),
        }
    }

    /// Dynamic check against a runtime value.
    #[must_use]
    pub fn accepts_value(&self, value: &Value) -> bool {
        match self {
            TypeValidator::Class(types) => types.iter().any(|target| value.conforms_to(target)),
            TypeValidator::Composite(children) => children
                .iter()
                .any(|child| child.as_ref().is_none_or(|child| child.accepts_value(value))),
            TypeValidator::Collection(inner) => value.as_list().is_some_and(|items| {
                items
                    .iter()
                    .all(|item| item.is_null() || inner.accepts_value(item))
            }),
        }
    }
}

impl fmt::Display for TypeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeValidator::Class(types) => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                Ok(())
            }
            TypeValidator::Composite(children) => {
                write!(f, "any of (")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match child {
                        Some(child) => write!(f, "{}", child)?,
                        None => write!(f, "*")?,
                    }
                }
                write!(f, ")")
            }
            TypeValidator::Collection(inner) => write!(f, "collection of ({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_accepts_assignable_types() {
        let validator = TypeValidator::Class(vec![ValueType::Number, ValueType::Text]);
        assert!(validator.accepts_type(&ValueType::Int));
        assert!(validator.accepts_type(&ValueType::Text));
        assert!(!validator.accepts_type(&ValueType::Bool));
    }

    #[test]
    fn composite_is_an_or() {
        let validator = TypeValidator::Composite(vec![
            Some(TypeValidator::of(ValueType::Int)),
            Some(TypeValidator::of(ValueType::Bool)),
        ]);
        assert!(validator.accepts_type(&ValueType::Bool));
        assert!(!validator.accepts_type(&ValueType::Text));
        assert!(validator.accepts_value(&Value::Int(4)));
        assert!(!validator.accepts_value(&Value::from("x")));
    }

    #[test]
    fn composite_with_null_child_accepts_everything() {
        let validator =
            TypeValidator::Composite(vec![Some(TypeValidator::of(ValueType::Int)), None]);
        assert!(validator.accepts_type(&ValueType::Text));
        assert!(validator.accepts_value(&Value::from("x")));
        assert!(TypeValidator::any().accepts_value(&Value::Null));
    }

    #[test]
    fn empty_composite_accepts_nothing() {
        let validator = TypeValidator::Composite(Vec::new());
        assert!(!validator.accepts_type(&ValueType::Int));
    }

    #[test]
    fn collection_checks_every_element() {
        let validator = TypeValidator::collection_of(TypeValidator::of(ValueType::Int));
        assert!(validator.accepts_type(&ValueType::list_of(ValueType::Int)));
        assert!(!validator.accepts_type(&ValueType::Int));
        assert!(validator.accepts_value(&Value::from(vec![1_i64, 2, 3])));
        assert!(!validator.accepts_value(&Value::List(vec![Value::Int(1), Value::from("x")])));
        assert!(validator.accepts_value(&Value::List(Vec::new())));
        assert!(!validator.accepts_value(&Value::Int(1)));
        assert!(validator.accepts_value(&Value::List(vec![Value::Int(1), Value::Null])));
    }

    #[test]
    fn display_describes_rule() {
        let validator = TypeValidator::Composite(vec![
            Some(TypeValidator::Class(vec![ValueType::Int, ValueType::Float])),
            None,
        ]);
        assert_eq!(validator.to_string(), "any of (int | float, *)");
        assert_eq!(
            TypeValidator::collection_of(TypeValidator::of(ValueType::Text)).to_string(),
            "collection of (text)"
        );
    }
}
