//! The entity model: schema-driven construction, wire round-trip, equality.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{DeserializationError, ValidationError};
use crate::field::{ContainerShape, FieldDescriptor, WirePolicy};
use crate::schema::Schema;
use crate::tri::FieldState;

/// The current value of one entity field.
///
/// Two-element tuples (e.g. order-by pairs) are represented as two-element
/// [`FieldValue::List`]s; the element-wise serialization rule covers them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The field was not present in the source payload and has no default.
    Absent,
    /// The field carried an explicit null and has no default.
    Null,
    /// A plain value: scalar, or an opaque tree with no nested schema.
    Value(Value),
    /// A single nested entity.
    Entity(Box<Entity>),
    /// A list mixing nested entities and pass-through values.
    List(Vec<FieldValue>),
    /// A mapping whose values are nested entities.
    Map(BTreeMap<String, FieldValue>),
    /// A mapping whose keys are nested entities.
    KeyMap(Vec<(Entity, Value)>),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(Value::String(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Value(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Value(Value::Bool(value))
    }
}

impl From<Entity> for FieldValue {
    fn from(entity: Entity) -> Self {
        FieldValue::Entity(Box::new(entity))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::List(items)
    }
}

/// A live instance of a declared schema.
///
/// Holds the current value of every schema field plus any wire keys the
/// payload carried without a matching descriptor (`extra_fields`, preserved
/// for round-trip fidelity but excluded from equality and hashing).
#[derive(Debug, Clone)]
pub struct Entity {
    schema: &'static Schema,
    values: BTreeMap<&'static str, FieldValue>,
    extra_fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with every defaulted field set to its default and
    /// every required field absent.
    pub fn new(schema: &'static Schema) -> Self {
        let mut values = BTreeMap::new();
        for descriptor in schema.fields() {
            let value = match default_field_value(schema, descriptor) {
                Ok(Some(value)) => value,
                Ok(None) => FieldValue::Absent,
                Err(err) => {
                    warn!(schema = schema.name(), field = descriptor.name(), %err,
                          "schema default failed to decode");
                    FieldValue::Null
                }
            };
            values.insert(descriptor.name(), value);
        }
        Self {
            schema,
            values,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Wire keys from the source payload that matched no descriptor.
    pub fn extra_fields(&self) -> &BTreeMap<String, Value> {
        &self.extra_fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Sets a field value. Returns false when the schema declares no such
    /// field; unknown names are never silently added.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> bool {
        match self.schema.field(name) {
            Some(descriptor) => {
                self.values.insert(descriptor.name(), value.into());
                true
            }
            None => false,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Value(value) => value.as_i64(),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Value(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The nested entity held by `name`, if any.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        match self.get(name)? {
            FieldValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        match self.values.get_mut(name)? {
            FieldValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// The nested entity held by `name`, created fresh from the field's
    /// declared schema when the slot is absent or null.
    ///
    /// Returns `None` when the field declares no nested schema.
    pub fn ensure_entity(&mut self, name: &str) -> Option<&mut Entity> {
        if !matches!(self.get(name), Some(FieldValue::Entity(_))) {
            let nested = self.schema.field(name).and_then(|d| d.nested())?;
            self.set(name, Entity::new(nested));
        }
        self.entity_mut(name)
    }

    /// Mutable access to a list field, for in-place appends.
    pub fn list_mut(&mut self, name: &str) -> Option<&mut Vec<FieldValue>> {
        match self.values.get_mut(name)? {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convenience for the server-issued integer identifier.
    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    pub fn set_id(&mut self, id: i64) -> bool {
        self.set("id", id)
    }

    /// Builds an entity from one decoded wire payload.
    ///
    /// Unknown keys land in `extra_fields`; every declared field is probed
    /// with tri-state semantics and decoded per its descriptor. Any failure
    /// is wrapped into a single [`DeserializationError`] carrying the schema
    /// name, the offending field, and the payload fragment. A partially
    /// populated entity is never returned.
    pub fn from_wire(schema: &'static Schema, payload: &Value) -> Result<Self, DeserializationError> {
        let object = payload.as_object().ok_or_else(|| {
            DeserializationError::new(
                schema.name(),
                "<payload>",
                "expected a JSON object",
                payload.clone(),
            )
        })?;

        let mut extra_fields = BTreeMap::new();
        for (key, value) in object {
            if schema.field(key).is_none() {
                extra_fields.insert(key.clone(), value.clone());
            }
        }

        let mut values = BTreeMap::new();
        for descriptor in schema.fields() {
            let value = match FieldState::of(object, descriptor.name()) {
                FieldState::Present(value) => decode_field(schema, descriptor, value)
                    .inspect_err(|err| {
                        warn!(schema = schema.name(), field = descriptor.name(), %err,
                              "payload field failed to deserialize");
                    })?,
                FieldState::Absent => default_field_value(schema, descriptor)?
                    .unwrap_or(FieldValue::Absent),
                FieldState::Null => default_field_value(schema, descriptor)?
                    .unwrap_or(FieldValue::Null),
            };
            values.insert(descriptor.name(), value);
        }

        Ok(Self {
            schema,
            values,
            extra_fields,
        })
    }

    /// Serializes to a plain JSON tree, without the JSON-text encoding step
    /// and without running the validator.
    pub fn to_tree(&self, columns: Option<&[&str]>) -> Map<String, Value> {
        self.emit(columns, false)
    }

    /// Serializes to the wire shape: omission policies applied, nested
    /// entities reduced to trees, `json_encoded` fields stringified, and
    /// the schema validator run over the result.
    pub fn to_wire(&self, columns: Option<&[&str]>) -> Result<Map<String, Value>, ValidationError> {
        let tree = self.emit(columns, true);
        self.schema.run_validator(&tree)?;
        Ok(tree)
    }

    fn emit(&self, columns: Option<&[&str]>, stringify: bool) -> Map<String, Value> {
        let mut output = Map::new();
        for descriptor in self.schema.fields() {
            if let Some(columns) = columns {
                if !columns.contains(&descriptor.name()) {
                    continue;
                }
            }
            let value = self
                .values
                .get(descriptor.name())
                .unwrap_or(&FieldValue::Absent);
            if self.should_omit(descriptor, value) {
                continue;
            }
            let mut rendered = render(value);
            if stringify && descriptor.json_encoded() {
                rendered = match serde_json::to_string(&rendered) {
                    Ok(text) => Value::String(text),
                    // Plain JSON values always re-encode; keep the tree if
                    // something pathological slips through.
                    Err(_) => rendered,
                };
            }
            output.insert(descriptor.name().to_string(), rendered);
        }
        output
    }

    fn should_omit(&self, descriptor: &FieldDescriptor, value: &FieldValue) -> bool {
        match descriptor.policy() {
            WirePolicy::Always => false,
            WirePolicy::Never => true,
            WirePolicy::OmitAbsent => matches!(value, FieldValue::Absent),
            WirePolicy::OmitDefault => {
                if matches!(value, FieldValue::Absent) {
                    return true;
                }
                match default_field_value(self.schema, descriptor) {
                    Ok(Some(default)) => *value == default,
                    _ => false,
                }
            }
        }
    }
}

impl PartialEq for Entity {
    /// Field-by-field equality over the schema fields only; `extra_fields`
    /// never participates. Instances of different schemas compare unequal
    /// instead of failing, so generic collection operations degrade
    /// gracefully.
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

// serde_json cannot represent NaN, so JSON-backed equality is reflexive.
impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name().hash(state);
        for (name, value) in &self.values {
            name.hash(state);
            canonical_text(&render(value)).hash(state);
        }
    }
}

/// Decodes one present wire value per its descriptor.
fn decode_field(
    schema: &'static Schema,
    descriptor: &FieldDescriptor,
    value: &Value,
) -> Result<FieldValue, DeserializationError> {
    let wrap = |reason: String| {
        DeserializationError::new(schema.name(), descriptor.name(), reason, value.clone())
    };

    // JSON-as-string fields are parsed first, then decoded like any tree.
    let parsed;
    let value = if descriptor.json_encoded() {
        if let Value::String(text) = value {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|err| wrap(format!("invalid embedded JSON: {err}")))?;
            &parsed
        } else {
            value
        }
    } else {
        value
    };

    match value {
        Value::Object(map) => {
            let Some(nested) = descriptor.nested() else {
                return Ok(FieldValue::Value(value.clone()));
            };
            match descriptor.shape() {
                ContainerShape::ObjectValues => {
                    let mut decoded = BTreeMap::new();
                    for (key, item) in map {
                        let entity = Entity::from_wire(nested, item)
                            .map_err(|err| wrap(format!("value `{key}`: {err}")))?;
                        decoded.insert(key.clone(), FieldValue::Entity(Box::new(entity)));
                    }
                    Ok(FieldValue::Map(decoded))
                }
                ContainerShape::ObjectKeys => {
                    let mut decoded = Vec::new();
                    for (key, item) in map {
                        let key_payload: Value = serde_json::from_str(key)
                            .map_err(|err| wrap(format!("key `{key}` is not JSON: {err}")))?;
                        let entity = Entity::from_wire(nested, &key_payload)
                            .map_err(|err| wrap(format!("key `{key}`: {err}")))?;
                        decoded.push((entity, item.clone()));
                    }
                    Ok(FieldValue::KeyMap(decoded))
                }
                _ => {
                    let entity =
                        Entity::from_wire(nested, value).map_err(|err| wrap(err.to_string()))?;
                    Ok(FieldValue::Entity(Box::new(entity)))
                }
            }
        }
        Value::Array(items) => {
            let Some(nested) = descriptor.nested() else {
                return Ok(FieldValue::Value(value.clone()));
            };
            // Mixed lists are allowed: object elements become entities,
            // anything else passes through (e.g. a raw column name next to
            // a structured metric).
            let mut decoded = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if item.is_object() {
                    let entity = Entity::from_wire(nested, item)
                        .map_err(|err| wrap(format!("element {index}: {err}")))?;
                    decoded.push(FieldValue::Entity(Box::new(entity)));
                } else {
                    decoded.push(FieldValue::Value(item.clone()));
                }
            }
            Ok(FieldValue::List(decoded))
        }
        _ => Ok(FieldValue::Value(value.clone())),
    }
}

/// The decoded default for a field, or `None` when the field is required.
fn default_field_value(
    schema: &'static Schema,
    descriptor: &FieldDescriptor,
) -> Result<Option<FieldValue>, DeserializationError> {
    match descriptor.default().produce() {
        Some(Value::Null) => Ok(Some(FieldValue::Value(Value::Null))),
        Some(value) => decode_field(schema, descriptor, &value).map(Some),
        None => Ok(None),
    }
}

/// Reduces a field value to plain JSON. Nested entities serialize with the
/// full field set; enum-like values are expected to already be primitives.
fn render(value: &FieldValue) -> Value {
    match value {
        FieldValue::Absent | FieldValue::Null => Value::Null,
        FieldValue::Value(value) => value.clone(),
        FieldValue::Entity(entity) => Value::Object(entity.to_tree(None)),
        FieldValue::List(items) => Value::Array(items.iter().map(render).collect()),
        FieldValue::Map(map) => {
            let mut output = Map::new();
            for (key, item) in map {
                output.insert(key.clone(), render(item));
            }
            Value::Object(output)
        }
        FieldValue::KeyMap(pairs) => {
            // JSON object keys are strings: a key entity is carried as its
            // canonical JSON text.
            let mut output = Map::new();
            for (key, item) in pairs {
                output.insert(canonical_text(&Value::Object(key.to_tree(None))), item.clone());
            }
            Value::Object(output)
        }
    }
}

/// Deterministic JSON text with object keys sorted at every level, so equal
/// values always produce identical text regardless of construction order.
pub fn canonical_text(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut sorted = Map::new();
                for key in keys {
                    sorted.insert(key.clone(), sort(&map[key]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value)).unwrap_or_else(|_| "null".to_string())
}
