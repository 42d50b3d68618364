//! Schema-driven entity model for the Superset REST wire format.
//!
//! Superset's API speaks loosely-typed JSON: fields may be absent, null, or
//! present; some carry whole JSON documents as strings; lists mix raw column
//! names with structured metrics. This crate provides the round-trip engine
//! under every API entity:
//! - [`FieldState`]: tri-state view of a payload key (absent / null / present)
//! - [`Field`] / [`FieldDescriptor`]: per-attribute metadata covering nested
//!   schema, default, container shape, wire-omission policy, JSON-text encoding
//! - [`Schema`]: the ordered descriptor set of one entity type, with
//!   inheritance, a discriminator convention, and a validation hook
//! - [`Entity`]: a live instance, with `from_wire`, `to_tree`, `to_wire`,
//!   extra-field preservation, equality and hashing
//!
//! HTTP access and concrete endpoint schemas live in `superset-client` and
//! `superset-entities`.

mod entity;
mod error;
mod field;
mod schema;
mod tri;

pub use entity::{canonical_text, Entity, FieldValue};
pub use error::{ConfigurationError, DeserializationError, ValidationError};
pub use field::{ContainerShape, DefaultFn, DefaultSpec, Field, FieldDescriptor, SchemaRef, WirePolicy};
pub use schema::{Schema, SchemaBuilder, Validator};
pub use tri::FieldState;
