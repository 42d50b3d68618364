//! Async client for the Superset REST API.
//!
//! The layers, bottom up:
//! - [`SupersetApi`]: the HTTP collaborator contract; everything above it
//!   is transport-agnostic and testable against a mock server.
//! - [`SupersetClient`]: the reqwest implementation, with JWT login via
//!   `security/login`, CSRF tokens on mutating calls, and bounded retry
//!   with exponential backoff on 429/5xx.
//! - [`QueryFilter`]: listing queries rendered into the `q` parameter.
//! - [`SchemaRegistry`]: discriminator-tag dispatch to schema variants.
//! - [`Collection`]: per-endpoint operations (get, find, find_one, add,
//!   save, refresh, delete, count, export, import_file).
//!
//! Entity schemas themselves live in `superset-model`; the concrete
//! Superset endpoint declarations live in `superset-entities`.

mod api;
mod client;
mod collection;
mod error;
mod filter;
mod registry;

pub use api::{ImportForm, RawResponse, SupersetApi};
pub use client::{join_urls, ClientConfig, SupersetClient};
pub use collection::Collection;
pub use error::{ClientError, ClientResult};
pub use filter::{FilterOperator, QueryFilter};
pub use registry::SchemaRegistry;
