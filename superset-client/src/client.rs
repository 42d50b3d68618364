//! The concrete reqwest-based client: JWT login, CSRF, bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::{ImportForm, RawResponse, SupersetApi};
use crate::error::{ClientError, ClientResult};

/// Status codes worth retrying: rate limiting and transient server faults.
const RETRY_STATUS: [u16; 6] = [429, 500, 502, 503, 504, 520];

/// Connection settings for a Superset server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `https://superset.example.org`.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Auth provider passed to `security/login`.
    pub provider: String,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    pub timeout: Duration,
    /// Extra attempts after the first, for retryable failures.
    pub retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff: Duration,
    /// Fetch a CSRF token after login and attach it to mutating calls.
    pub fetch_csrf: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            provider: "db".to_string(),
            verify_tls: true,
            timeout: Duration::from_secs(60),
            retries: 3,
            backoff: Duration::from_millis(500),
            fetch_csrf: true,
        }
    }
}

impl ClientConfig {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    csrf_token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    provider: &'a str,
    refresh: bool,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CsrfResponse {
    result: String,
}

/// The request body, kept rebuildable so attempts can be retried.
enum Payload {
    None,
    Json(Value),
    Import(ImportForm),
}

/// Joins URL segments without doubling or dropping slashes.
pub fn join_urls(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Authenticated HTTP access to one Superset server.
///
/// The JWT is acquired lazily on the first request and re-acquired once on
/// a 401. Mutating calls carry the CSRF token when one was fetched.
pub struct SupersetClient {
    config: ClientConfig,
    http: Client,
    session: RwLock<Option<Session>>,
}

impl SupersetClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            session: RwLock::new(None),
        })
    }

    /// A client seeded with an existing JWT, skipping the login flow.
    pub fn with_access_token(host: &str, access_token: &str) -> ClientResult<Self> {
        let mut config = ClientConfig::new(host, "", "");
        config.fetch_csrf = false;
        let mut client = Self::new(config)?;
        client.session = RwLock::new(Some(Session {
            access_token: access_token.to_string(),
            csrf_token: None,
        }));
        Ok(client)
    }

    /// The `api/v1` root this client talks to.
    pub fn base_url(&self) -> String {
        join_urls(&self.config.host, "api/v1")
    }

    fn url(&self, path: &str) -> String {
        join_urls(&self.base_url(), path)
    }

    /// The cached access token, logging in when there is none.
    async fn access_token(&self) -> ClientResult<String> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.access_token.clone());
        }
        self.login().await
    }

    /// POST `security/login` and cache the issued JWT (plus the CSRF token
    /// when configured).
    async fn login(&self) -> ClientResult<String> {
        if self.config.username.is_empty() {
            return Err(ClientError::Auth(
                "no credentials configured and no access token set".to_string(),
            ));
        }

        debug!(host = %self.config.host, username = %self.config.username, "logging in");
        let response = self
            .http
            .post(self.url("security/login"))
            .json(&LoginRequest {
                username: &self.config.username,
                password: &self.config.password,
                provider: &self.config.provider,
                refresh: true,
            })
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("login request failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!("login failed: {body}")));
        }

        let LoginResponse { access_token } = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(format!("failed to parse login response: {e}")))?;

        let csrf_token = if self.config.fetch_csrf {
            Some(self.fetch_csrf_token(&access_token).await?)
        } else {
            None
        };

        *self.session.write().await = Some(Session {
            access_token: access_token.clone(),
            csrf_token,
        });
        Ok(access_token)
    }

    async fn fetch_csrf_token(&self, access_token: &str) -> ClientResult<String> {
        let response = self
            .http
            .get(self.url("security/csrf_token"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("CSRF token request failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!("CSRF token fetch failed: {body}")));
        }

        let CsrfResponse { result } = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(format!("failed to parse CSRF response: {e}")))?;
        Ok(result)
    }

    /// Sends one request with auth, CSRF, 401 re-login and bounded retry
    /// with exponential backoff on retryable statuses.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: Payload,
    ) -> ClientResult<Response> {
        let url = self.url(path);
        let mutating = matches!(method, Method::POST | Method::PUT | Method::DELETE);
        let mut attempt: u32 = 0;
        let mut reauthenticated = false;

        loop {
            let access_token = self.access_token().await?;
            let csrf_token = self
                .session
                .read()
                .await
                .as_ref()
                .and_then(|s| s.csrf_token.clone());

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&access_token);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if mutating {
                if let Some(csrf) = csrf_token {
                    builder = builder
                        .header("X-CSRFToken", csrf)
                        .header(header::REFERER, &url);
                }
            }
            builder = match &payload {
                Payload::None => builder,
                Payload::Json(body) => builder.json(body),
                Payload::Import(form) => builder
                    .header(header::ACCEPT, "application/json")
                    .multipart(build_import_form(form)?),
            };

            debug!(%method, %url, attempt, "sending request");
            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) if attempt < self.config.retries => {
                    warn!(%url, %err, "request failed, retrying");
                    tokio::time::sleep(self.backoff_delay(attempt, None)).await;
                    attempt += 1;
                    continue;
                }
                Err(err) => return Err(ClientError::Network(err.to_string())),
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED
                && !reauthenticated
                && !self.config.username.is_empty()
            {
                debug!(%url, "token rejected, re-authenticating");
                *self.session.write().await = None;
                reauthenticated = true;
                continue;
            }
            if RETRY_STATUS.contains(&status.as_u16()) && attempt < self.config.retries {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                warn!(%url, status = status.as_u16(), "retryable response, backing off");
                tokio::time::sleep(self.backoff_delay(attempt, retry_after)).await;
                attempt += 1;
                continue;
            }
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), body));
        }
    }

    fn backoff_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        match retry_after {
            Some(secs) => Duration::from_secs(secs),
            None => self.config.backoff * 2u32.saturating_pow(attempt),
        }
    }

    async fn decode(response: Response) -> ClientResult<Value> {
        response
            .json()
            .await
            .map_err(|e| ClientError::Network(format!("failed to decode response body: {e}")))
    }
}

/// Maps a non-2xx body onto the error taxonomy: structured `errors` first,
/// then a flat `message`, then the raw body.
fn map_error(status: u16, body: String) -> ClientError {
    if let Ok(value) = serde_json::from_str::<Value>(&body) {
        if let Some(errors) = value.get("errors") {
            return ClientError::ComplexBadRequest {
                status,
                errors: errors.clone(),
            };
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return ClientError::BadRequest {
                status,
                message: message.to_string(),
            };
        }
    }
    ClientError::Http { status, body }
}

fn build_import_form(form: &ImportForm) -> ClientResult<multipart::Form> {
    let file = multipart::Part::bytes(form.bytes.clone())
        .file_name(form.file_name.clone())
        .mime_str(&form.mime)
        .map_err(|e| ClientError::Network(format!("invalid import MIME type: {e}")))?;
    Ok(multipart::Form::new()
        .part("formData", file)
        .text("overwrite", form.overwrite.to_string())
        .text("passwords", form.passwords.clone()))
}

#[async_trait]
impl SupersetApi for SupersetClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        let response = self.request(Method::GET, path, query, Payload::None).await?;
        Self::decode(response).await
    }

    async fn get_raw(&self, path: &str, query: &[(String, String)]) -> ClientResult<RawResponse> {
        let response = self.request(Method::GET, path, query, Payload::None).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("failed to read response body: {e}")))?;
        Ok(RawResponse {
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        let response = self
            .request(Method::POST, path, &[], Payload::Json(body.clone()))
            .await?;
        Self::decode(response).await
    }

    async fn post_import(&self, path: &str, form: ImportForm) -> ClientResult<Value> {
        let response = self
            .request(Method::POST, path, &[], Payload::Import(form))
            .await?;
        Self::decode(response).await
    }

    async fn put(&self, path: &str, body: &Value) -> ClientResult<Value> {
        let response = self
            .request(Method::PUT, path, &[], Payload::Json(body.clone()))
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> ClientResult<Value> {
        let response = self
            .request(Method::DELETE, path, &[], Payload::None)
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_urls_normalizes_slashes() {
        assert_eq!(join_urls("http://host/", "/api/v1"), "http://host/api/v1");
        assert_eq!(join_urls("http://host", "api/v1"), "http://host/api/v1");
        assert_eq!(join_urls("http://host/api/v1", "chart/1"), "http://host/api/v1/chart/1");
    }

    #[test]
    fn error_body_with_errors_field_is_complex() {
        let err = map_error(422, r#"{"errors": [{"message": "boom"}]}"#.to_string());
        assert!(matches!(err, ClientError::ComplexBadRequest { status: 422, .. }));
    }

    #[test]
    fn error_body_with_message_is_bad_request() {
        let err = map_error(400, r#"{"message": "Not a valid chart"}"#.to_string());
        match err {
            ClientError::BadRequest { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Not a valid chart");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_body_stays_raw() {
        let err = map_error(502, "<html>bad gateway</html>".to_string());
        assert!(matches!(err, ClientError::Http { status: 502, .. }));
    }
}
