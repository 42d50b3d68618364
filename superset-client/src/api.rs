//! The HTTP collaborator contract.
//!
//! Collection operations talk to the server only through this trait, so
//! tests and alternative transports can stand in for the real client.
//! Implementations map non-2xx responses to [`ClientError`]; consumers
//! never see raw status handling.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientResult;

/// A response body kept as raw bytes, for endpoints that return archives
/// or other non-JSON payloads.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The `Content-Type` header, empty when the server sent none.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One bundle import request: the file part plus its form fields.
#[derive(Debug, Clone)]
pub struct ImportForm {
    pub file_name: String,
    /// MIME type of the file part, derived from the file extension.
    pub mime: String,
    pub bytes: Vec<u8>,
    /// JSON text mapping `databases/{name}.yaml` to connection passwords;
    /// `{}` when none are supplied.
    pub passwords: String,
    pub overwrite: bool,
}

/// Authenticated access to a Superset REST API.
///
/// Paths are relative to the `api/v1` base; query pairs are appended as-is.
#[async_trait]
pub trait SupersetApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value>;

    /// GET returning the raw body and content type, for export downloads.
    async fn get_raw(&self, path: &str, query: &[(String, String)]) -> ClientResult<RawResponse>;

    async fn post(&self, path: &str, body: &Value) -> ClientResult<Value>;

    /// Multipart POST for bundle imports.
    async fn post_import(&self, path: &str, form: ImportForm) -> ClientResult<Value>;

    async fn put(&self, path: &str, body: &Value) -> ClientResult<Value>;

    async fn delete(&self, path: &str) -> ClientResult<Value>;

    /// Paginated listing: GET with the rendered `q` parameter.
    async fn find(&self, path: &str, q: &str) -> ClientResult<Value> {
        self.get(path, &[("q".to_string(), q.to_string())]).await
    }
}
