//! Field descriptors: per-attribute metadata driving the JSON round-trip.

use serde_json::Value;

use crate::error::ConfigurationError;
use crate::schema::Schema;

/// Late-bound reference to another schema, so schemas can reference each
/// other (including cycles) from static declarations.
pub type SchemaRef = fn() -> &'static Schema;

/// Factory producing a fresh default value per instance.
///
/// Container defaults must go through a factory so no two entities ever
/// share one literal.
pub type DefaultFn = fn() -> Value;

/// How a field's nested schema applies to its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    /// A single value (possibly a single nested entity).
    Scalar,
    /// A list whose object elements are nested entities; non-object
    /// elements pass through unchanged.
    List,
    /// A mapping whose keys are nested entities, carried as JSON text.
    ObjectKeys,
    /// A mapping whose values are nested entities.
    ObjectValues,
}

/// When a field appears in serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirePolicy {
    /// Always emitted; missing values become explicit nulls.
    Always,
    /// Dropped when the value is absent and the field has no default.
    OmitAbsent,
    /// Dropped when the value equals the field default.
    OmitDefault,
    /// Never emitted; the field is internal-only (e.g. server-issued ids
    /// on create payloads).
    Never,
}

/// The default of a declared field.
#[derive(Debug, Clone)]
pub enum DefaultSpec {
    /// No default; the field is required on direct construction.
    Required,
    /// A fixed default value.
    Value(Value),
    /// A per-instance factory.
    Factory(DefaultFn),
}

impl DefaultSpec {
    /// Produces the default wire value, if one is declared.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultSpec::Required => None,
            DefaultSpec::Value(value) => Some(value.clone()),
            DefaultSpec::Factory(factory) => Some(factory()),
        }
    }
}

/// Static metadata for one declared attribute of a schema.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    nested: Option<SchemaRef>,
    default: DefaultSpec,
    shape: ContainerShape,
    policy: WirePolicy,
    json_encoded: bool,
}

impl FieldDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The nested schema, resolved.
    pub fn nested(&self) -> Option<&'static Schema> {
        self.nested.map(|schema| schema())
    }

    pub fn default(&self) -> &DefaultSpec {
        &self.default
    }

    pub fn shape(&self) -> ContainerShape {
        self.shape
    }

    pub fn policy(&self) -> WirePolicy {
        self.policy
    }

    /// Whether the wire value is a JSON document carried as a string.
    pub fn json_encoded(&self) -> bool {
        self.json_encoded
    }
}

/// Builder for one [`FieldDescriptor`].
///
/// Shorthand constructors cover the common Superset field flavors; the
/// builder is finalized by [`SchemaBuilder::build`](crate::SchemaBuilder),
/// which rejects a field declaring both a default value and a default
/// factory.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    nested: Option<SchemaRef>,
    default_value: Option<Value>,
    default_factory: Option<DefaultFn>,
    shape: ContainerShape,
    policy: WirePolicy,
    json_encoded: bool,
}

impl Field {
    /// A required field with no default.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            nested: None,
            default_value: None,
            default_factory: None,
            shape: ContainerShape::Scalar,
            policy: WirePolicy::Always,
            json_encoded: false,
        }
    }

    /// Shorthand for a string field with a fixed default.
    pub fn string(name: &'static str, default: &str) -> Self {
        Self::new(name).default_value(Value::String(default.to_string()))
    }

    /// Shorthand for a boolean field with a fixed default.
    pub fn boolean(name: &'static str, default: bool) -> Self {
        Self::new(name).default_value(Value::Bool(default))
    }

    /// Shorthand for an integer field with a fixed default.
    pub fn integer(name: &'static str, default: i64) -> Self {
        Self::new(name).default_value(Value::from(default))
    }

    /// Shorthand for a field whose wire value is JSON text.
    pub fn json(name: &'static str) -> Self {
        Self::new(name).json_encoded().default_value(Value::Null)
    }

    /// Shorthand for a list field defaulting to a fresh empty list.
    pub fn list(name: &'static str) -> Self {
        let mut field = Self::new(name).default_factory(|| Value::Array(Vec::new()));
        field.shape = ContainerShape::List;
        field
    }

    /// Shorthand for an opaque mapping defaulting to a fresh empty object.
    pub fn object(name: &'static str) -> Self {
        Self::new(name).default_factory(|| Value::Object(serde_json::Map::new()))
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn default_factory(mut self, factory: DefaultFn) -> Self {
        self.default_factory = Some(factory);
        self
    }

    /// Declares the nested schema for a scalar entity field.
    pub fn nested(mut self, schema: SchemaRef) -> Self {
        self.nested = Some(schema);
        self
    }

    /// Declares a list of entities of `schema`.
    pub fn list_of(mut self, schema: SchemaRef) -> Self {
        self.nested = Some(schema);
        self.shape = ContainerShape::List;
        self
    }

    /// Declares a mapping whose values are entities of `schema`.
    pub fn map_of(mut self, schema: SchemaRef) -> Self {
        self.nested = Some(schema);
        self.shape = ContainerShape::ObjectValues;
        self
    }

    /// Declares a mapping whose keys are entities of `schema`.
    pub fn keyed_by(mut self, schema: SchemaRef) -> Self {
        self.nested = Some(schema);
        self.shape = ContainerShape::ObjectKeys;
        self
    }

    pub fn policy(mut self, policy: WirePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn json_encoded(mut self) -> Self {
        self.json_encoded = true;
        self
    }

    pub(crate) fn build(self) -> Result<FieldDescriptor, ConfigurationError> {
        let default = match (self.default_value, self.default_factory) {
            (Some(_), Some(_)) => {
                return Err(ConfigurationError::new(format!(
                    "field `{}` declares both a default value and a default factory",
                    self.name
                )));
            }
            (Some(value), None) => DefaultSpec::Value(value),
            (None, Some(factory)) => DefaultSpec::Factory(factory),
            (None, None) => DefaultSpec::Required,
        };
        Ok(FieldDescriptor {
            name: self.name,
            nested: self.nested,
            default,
            shape: self.shape,
            policy: self.policy,
            json_encoded: self.json_encoded,
        })
    }
}
