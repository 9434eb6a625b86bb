//! Node ports.
//!
//! Every node owns an ordered set of input and output [`Field`]s. Keys are
//! unique per node and direction; [`Ports`] enforces that on insertion.

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::validator::TypeValidator;
use crate::value::{Value, ValueType};

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Receives values from links.
    Input,
    /// Produces values for links.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// The key of a port, unique within its node and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(Arc<str>);

impl FieldKey {
    /// Creates a key.
    #[must_use]
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Errors raised when editing a node's ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A port with this key already exists in that direction.
    #[error("duplicate {direction} key: {key}")]
    DuplicateKey {
        /// Side of the node.
        direction: Direction,
        /// The clashing key.
        key: FieldKey,
    },
    /// No port with this key exists in that direction.
    #[error("{direction} field not found: {key}")]
    NotFound {
        /// Side of the node.
        direction: Direction,
        /// The missing key.
        key: FieldKey,
    },
    /// The edit is not permitted for this port.
    #[error("illegal operation: {0}")]
    IllegalOperation(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Field
// ─────────────────────────────────────────────────────────────────────────────

/// A single input or output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    key: FieldKey,
    direction: Direction,
    description: String,
    value_type: ValueType,
    optional: bool,
    fixed: bool,
    multi: bool,
    validator: Option<TypeValidator>,
    default: Option<Value>,
}

impl Field {
    /// Creates an input port accepting `value_type`.
    #[must_use]
    pub fn input(key: impl Into<FieldKey>, value_type: ValueType) -> Self {
        let validator = TypeValidator::of(value_type.clone());
        Self {
            key: key.into(),
            direction: Direction::Input,
            description: String::new(),
            value_type,
            optional: false,
            fixed: false,
            multi: false,
            validator: Some(validator),
            default: None,
        }
    }

    /// Creates an output port producing `value_type`.
    #[must_use]
    pub fn output(key: impl Into<FieldKey>, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Output,
            description: String::new(),
            value_type,
            optional: false,
            fixed: false,
            multi: false,
            validator: None,
            default: None,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the port as optional: a missing value is not an error.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the port as fixed: it can never be removed from its node.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Sets the fixed flag explicitly.
    #[must_use]
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Allows more than one incoming link. Values arrive as a list in link order.
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Replaces the acceptance rule of an input port.
    #[must_use]
    pub fn with_validator(mut self, validator: TypeValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Sets the value used when an unlinked input has nothing seeded.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns a copy of this field under a different key.
    #[must_use]
    pub fn rekeyed(&self, key: impl Into<FieldKey>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Returns a copy of this field with a different declared type.
    #[must_use]
    pub fn retyped(&self, value_type: ValueType) -> Self {
        Self {
            value_type,
            ..self.clone()
        }
    }

    /// Returns the port key.
    #[must_use]
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    /// Returns the side of the node this port sits on.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared type.
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Returns `true` if a missing value is acceptable.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns `true` if the port may not be removed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Returns `true` if the port accepts several incoming links.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Returns the attached validator, if any.
    #[must_use]
    pub fn validator(&self) -> Option<&TypeValidator> {
        self.validator.as_ref()
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Static check used at link creation.
    ///
    /// Uses the validator when present, otherwise plain assignability to the
    /// declared type. A multi-input port is checked per incoming link.
    #[must_use]
    pub fn accepts_type(&self, source: &ValueType) -> bool {
        match &self.validator {
            Some(validator) => validator.accepts_type(source),
            None => source.is_assignable_to(&self.value_type),
        }
    }

    /// Dynamic check used before a value is stored for an operation.
    #[must_use]
    pub fn accepts_value(&self, value: &Value) -> bool {
        match &self.validator {
            Some(validator) => validator.accepts_value(value),
            None => value.conforms_to(&self.value_type),
        }
    }

    /// Describes what this port accepts, for error messages.
    #[must_use]
    pub fn expectation(&self) -> String {
        match &self.validator {
            Some(validator) => validator.to_string(),
            None => self.value_type.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────────────────────────────────────

/// The ordered input and output ports of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ports {
    inputs: Vec<Field>,
    outputs: Vec<Field>,
}

impl Ports {
    /// Creates an empty port set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a port on the side given by [`Field::direction`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::DuplicateKey`] if the key is already taken on that side.
    pub fn add(&mut self, field: Field) -> Result<&mut Self, FieldError> {
        let direction = field.direction();
        if self.contains(direction, field.key().as_str()) {
            return Err(FieldError::DuplicateKey {
                direction,
                key: field.key().clone(),
            });
        }
        self.side_mut(direction).push(field);
        Ok(self)
    }

    /// Removes a port, preserving the order of the remaining ones.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::NotFound`] for an unknown key and
    /// [`FieldError::IllegalOperation`] for a fixed port.
    pub fn remove(&mut self, direction: Direction, key: &str) -> Result<Field, FieldError> {
        let side = self.side_mut(direction);
        let Some(index) = side.iter().position(|field| field.key().as_str() == key) else {
            return Err(FieldError::NotFound {
                direction,
                key: FieldKey::new(key),
            });
        };
        if side[index].is_fixed() {
            return Err(FieldError::IllegalOperation(format!(
                "{} field '{}' is fixed and cannot be removed",
                direction, key
            )));
        }
        Ok(side.remove(index))
    }

    /// Looks up a port.
    #[must_use]
    pub fn get(&self, direction: Direction, key: &str) -> Option<&Field> {
        self.side(direction)
            .iter()
            .find(|field| field.key().as_str() == key)
    }

    /// Returns `true` if the key is taken on that side.
    #[must_use]
    pub fn contains(&self, direction: Direction, key: &str) -> bool {
        self.get(direction, key).is_some()
    }

    /// Returns the ports on one side, in insertion order.
    #[must_use]
    pub fn side(&self, direction: Direction) -> &[Field] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Returns the input ports in insertion order.
    #[must_use]
    pub fn inputs(&self) -> &[Field] {
        &self.inputs
    }

    /// Returns the output ports in insertion order.
    #[must_use]
    pub fn outputs(&self) -> &[Field] {
        &self.outputs
    }

    /// Returns the total number of ports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    /// Returns `true` if the node has no ports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn side_mut(&mut self, direction: Direction) -> &mut Vec<Field> {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_defaults_to_class_validator() {
        let field = Field::input("x", ValueType::Number);
        assert_eq!(
            field.validator(),
            Some(&TypeValidator::of(ValueType::Number))
        );
        assert!(field.accepts_type(&ValueType::Int));
        assert!(!field.accepts_type(&ValueType::Text));
    }

    #[test]
    fn output_has_no_validator() {
        let field = Field::output("y", ValueType::Int);
        assert!(field.validator().is_none());
        assert!(field.accepts_value(&Value::Int(1)));
        assert!(!field.accepts_value(&Value::from("1")));
    }

    #[test]
    fn same_key_allowed_on_both_sides() {
        let mut ports = Ports::new();
        ports.add(Field::input("x", ValueType::Int)).unwrap();
        ports.add(Field::output("x", ValueType::Int)).unwrap();
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut ports = Ports::new();
        ports.add(Field::input("x", ValueType::Int)).unwrap();
        let err = ports.add(Field::input("x", ValueType::Text)).unwrap_err();
        assert_eq!(
            err,
            FieldError::DuplicateKey {
                direction: Direction::Input,
                key: FieldKey::new("x"),
            }
        );
        assert_eq!(ports.inputs().len(), 1);
        assert_eq!(ports.inputs()[0].value_type(), &ValueType::Int);
    }

    #[test]
    fn fixed_field_cannot_be_removed() {
        let mut ports = Ports::new();
        ports.add(Field::input("x", ValueType::Int).fixed()).unwrap();
        let err = ports.remove(Direction::Input, "x").unwrap_err();
        assert!(matches!(err, FieldError::IllegalOperation(_)));
        assert!(ports.contains(Direction::Input, "x"));
    }

    #[test]
    fn remove_preserves_order() {
        let mut ports = Ports::new();
        for key in ["a", "b", "c"] {
            ports.add(Field::output(key, ValueType::Int)).unwrap();
        }
        ports.remove(Direction::Output, "b").unwrap();
        let keys: Vec<_> = ports.outputs().iter().map(|f| f.key().as_str()).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn remove_unknown_key() {
        let mut ports = Ports::new();
        assert!(matches!(
            ports.remove(Direction::Input, "nope"),
            Err(FieldError::NotFound { .. })
        ));
    }

    #[test]
    fn rekeyed_keeps_attributes() {
        let field = Field::input("x", ValueType::Int)
            .optional()
            .with_description("first operand");
        let copy = field.rekeyed("x_2");
        assert_eq!(copy.key().as_str(), "x_2");
        assert!(copy.is_optional());
        assert_eq!(copy.description(), "first operand");
    }
}
