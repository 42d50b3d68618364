//! Dataset schema. Flat: no JSON-encoded members, no variants.

use std::sync::LazyLock;

use serde_json::Value;
use superset_client::SchemaRegistry;
use superset_model::{Entity, Field, Schema, WirePolicy};

static DATASET: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("dataset")
        .field(Field::new("id").policy(WirePolicy::Never))
        .field(Field::string("table_name", ""))
        .field(Field::string("schema", ""))
        .field(Field::string("description", ""))
        .field(Field::new("database_id").policy(WirePolicy::OmitAbsent))
        .field(Field::string("datasource_type", ""))
        .field(Field::string("sql", ""))
        // Server-computed column metadata; read-only.
        .field(Field::list("columns").policy(WirePolicy::Never))
        .build()
        .expect("dataset schema")
});

pub fn dataset() -> &'static Schema {
    &DATASET
}

pub fn dataset_registry() -> SchemaRegistry {
    SchemaRegistry::new(dataset())
}

/// The owning database id. GET payloads nest it under the undeclared
/// `database` object rather than a flat column.
pub fn database_id(dataset: &Entity) -> Option<i64> {
    dataset
        .get_i64("database_id")
        .or_else(|| match dataset.extra_fields().get("database") {
            Some(Value::Object(database)) => database.get("id").and_then(Value::as_i64),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn database_id_falls_back_to_the_nested_database_object() {
        let payload = json!({
            "table_name": "orders",
            "database": {"id": 2, "database_name": "examples"},
        });
        let entity = Entity::from_wire(dataset(), &payload).unwrap();
        assert_eq!(database_id(&entity), Some(2));
    }

    #[test]
    fn database_id_prefers_the_declared_column() {
        let mut entity = Entity::new(dataset());
        entity.set("database_id", 7);
        assert_eq!(database_id(&entity), Some(7));
    }
}
