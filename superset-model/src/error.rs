//! Error types for the entity model.

use serde_json::Value;
use thiserror::Error;

/// A schema was declared incorrectly.
///
/// Raised while building a [`Schema`](crate::Schema), before any entity is
/// constructed. Configuration errors are fatal: a schema that fails to build
/// can never produce or consume payloads.
#[derive(Debug, Clone, Error)]
#[error("invalid schema configuration: {message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A wire payload could not be converted into an entity graph.
///
/// This is the single error type `from_wire` surfaces: any lower-level
/// failure is wrapped here together with the schema name, the offending
/// field, and the payload fragment that triggered it.
#[derive(Debug, Clone, Error)]
#[error("failed to deserialize `{schema}` field `{field}`: {reason}")]
pub struct DeserializationError {
    /// Name of the schema being deserialized.
    pub schema: &'static str,
    /// Field that triggered the failure, or `"<payload>"` for whole-payload
    /// problems.
    pub field: String,
    /// Human-readable cause.
    pub reason: String,
    /// The payload fragment being processed when the failure occurred.
    pub payload: Value,
}

impl DeserializationError {
    pub fn new(
        schema: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            schema,
            field: field.into(),
            reason: reason.into(),
            payload,
        }
    }
}

/// A business-rule violation detected while serializing an entity.
///
/// Carries the failure message plus a remediation hint so callers can build
/// a precise message without inspecting internals.
#[derive(Debug, Clone, Error)]
#[error("{message} (hint: {solution})")]
pub struct ValidationError {
    pub message: String,
    pub solution: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            solution: solution.into(),
        }
    }
}
