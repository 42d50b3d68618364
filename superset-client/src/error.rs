//! Error types for the HTTP layer and collection operations.

use serde_json::Value;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to a Superset server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response that carried no structured error body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Rejected request with a `message` error body.
    #[error("bad request ({status}): {message}")]
    BadRequest { status: u16, message: String },

    /// Rejected request with an `errors` error body (Superset's structured
    /// multi-error shape).
    #[error("bad request ({status}): {errors}")]
    ComplexBadRequest { status: u16, errors: Value },

    /// Transport failure (connect, timeout, malformed response body).
    #[error("network error: {0}")]
    Network(String),

    /// Login, token or CSRF acquisition failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A lookup matched no object.
    #[error("no matching object")]
    NotFound,

    /// An exactly-one lookup matched more than one object.
    #[error("query matched more than one object")]
    MultipleFound,

    /// Export response with a content type the client cannot persist.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// A response that should carry a `result` (or `id`, or `count`) did not.
    #[error("response carried no result")]
    MissingResult,

    /// Payload failed to deserialize into an entity.
    #[error(transparent)]
    Deserialization(#[from] superset_model::DeserializationError),

    /// Entity failed its schema validator on the way out.
    #[error(transparent)]
    Validation(#[from] superset_model::ValidationError),

    /// JSON encoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML encoding error (export re-dump).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Local file I/O error (export/import).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
