//! Entity schemas: ordered field descriptors plus dispatch and validation
//! metadata.

use serde_json::{Map, Value};

use crate::error::{ConfigurationError, ValidationError};
use crate::field::{Field, FieldDescriptor};

/// Validation hook run over the serialized tree before `to_wire` returns it.
pub type Validator = fn(&Map<String, Value>) -> Result<(), ValidationError>;

/// The static shape of an entity type.
///
/// A schema owns the field descriptors, optionally names a discriminator
/// field (used by collection factories to pick a concrete variant during
/// deserialization), and optionally carries a validator hook.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    discriminator: Option<&'static str>,
    fields: Vec<FieldDescriptor>,
    validator: Option<Validator>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            discriminator: None,
            inherited: Vec::new(),
            declared: Vec::new(),
            validator: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn discriminator(&self) -> Option<&'static str> {
        self.discriminator
    }

    /// Looks up the descriptor for `name`.
    ///
    /// Missing descriptors are an ordinary condition: payload keys without
    /// one are treated as opaque extra fields, never as errors.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub(crate) fn run_validator(&self, tree: &Map<String, Value>) -> Result<(), ValidationError> {
        match self.validator {
            Some(validate) => validate(tree),
            None => Ok(()),
        }
    }
}

/// Builder for a [`Schema`].
///
/// `build` is where declaration errors surface: duplicate field names and
/// conflicting default specifications are [`ConfigurationError`]s, raised
/// before any entity of the schema can exist.
pub struct SchemaBuilder {
    name: &'static str,
    discriminator: Option<&'static str>,
    inherited: Vec<FieldDescriptor>,
    declared: Vec<Field>,
    validator: Option<Validator>,
}

impl SchemaBuilder {
    /// Inherits every descriptor of `parent`. A field declared afterwards
    /// under an inherited name replaces the inherited descriptor outright.
    pub fn extend(mut self, parent: &Schema) -> Self {
        self.inherited = parent.fields.clone();
        if self.discriminator.is_none() {
            self.discriminator = parent.discriminator;
        }
        if self.validator.is_none() {
            self.validator = parent.validator;
        }
        self
    }

    pub fn discriminator(mut self, field: &'static str) -> Self {
        self.discriminator = Some(field);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.declared.push(field);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<Schema, ConfigurationError> {
        let mut fields = self.inherited;
        let mut declared_names: Vec<&'static str> = Vec::new();

        for spec in self.declared {
            let descriptor = spec.build()?;
            if declared_names.contains(&descriptor.name()) {
                return Err(ConfigurationError::new(format!(
                    "schema `{}` declares field `{}` more than once",
                    self.name,
                    descriptor.name()
                )));
            }
            declared_names.push(descriptor.name());

            // Override replaces the inherited descriptor, it never merges.
            match fields.iter_mut().find(|f| f.name() == descriptor.name()) {
                Some(slot) => *slot = descriptor,
                None => fields.push(descriptor),
            }
        }

        if let Some(discriminator) = self.discriminator {
            if !fields.iter().any(|f| f.name() == discriminator) {
                return Err(ConfigurationError::new(format!(
                    "schema `{}` names discriminator `{}` but declares no such field",
                    self.name, discriminator
                )));
            }
        }

        Ok(Schema {
            name: self.name,
            discriminator: self.discriminator,
            fields,
            validator: self.validator,
        })
    }
}
