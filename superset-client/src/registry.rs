//! Discriminator-based schema dispatch for polymorphic endpoints.

use std::collections::HashMap;

use serde_json::Value;
use superset_model::Schema;

/// Maps a discriminator tag (e.g. a chart's `viz_type`) to the schema
/// variant that decodes it.
///
/// Variants are registered explicitly at startup. Payloads with an unknown
/// or missing tag resolve to the default schema, so new server-side types
/// degrade to the generic representation instead of failing.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    default: &'static Schema,
    variants: HashMap<&'static str, &'static Schema>,
}

impl SchemaRegistry {
    pub fn new(default: &'static Schema) -> Self {
        Self {
            default,
            variants: HashMap::new(),
        }
    }

    pub fn register(mut self, tag: &'static str, schema: &'static Schema) -> Self {
        self.variants.insert(tag, schema);
        self
    }

    pub fn default_schema(&self) -> &'static Schema {
        self.default
    }

    /// Picks the schema for one raw payload by reading the default schema's
    /// discriminator field.
    pub fn resolve(&self, payload: &Value) -> &'static Schema {
        let Some(field) = self.default.discriminator() else {
            return self.default;
        };
        payload
            .get(field)
            .and_then(Value::as_str)
            .and_then(|tag| self.variants.get(tag).copied())
            .unwrap_or(self.default)
    }
}
