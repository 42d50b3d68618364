//! Tri-state view of wire payload values.
//!
//! JSON collapses "key missing" and "key present with null" into a single
//! observable `null` once a payload has been read into a typed structure.
//! The Superset API distinguishes the two: an absent key means "server did
//! not send this field", an explicit null means "this field is null". Field
//! omission rules depend on telling them apart.

use serde_json::{Map, Value};

/// The three states a field can be in inside a wire payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState<'a> {
    /// The key is not present in the payload.
    Absent,
    /// The key is present with an explicit JSON null.
    Null,
    /// The key is present with a real value.
    Present(&'a Value),
}

impl<'a> FieldState<'a> {
    /// Probes `payload` for `key` without mutating it.
    pub fn of(payload: &'a Map<String, Value>, key: &str) -> Self {
        match payload.get(key) {
            None => FieldState::Absent,
            Some(Value::Null) => FieldState::Null,
            Some(value) => FieldState::Present(value),
        }
    }

    /// True unless the state is [`FieldState::Present`].
    ///
    /// Absent and explicit-null fields both resolve to the field default
    /// when one exists; only present values participate in nested entity
    /// construction.
    pub fn is_missing(&self) -> bool {
        !matches!(self, FieldState::Present(_))
    }

    /// The contained value, if present.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            FieldState::Present(value) => Some(value),
            _ => None,
        }
    }
}
