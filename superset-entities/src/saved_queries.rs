//! Saved SQL Lab query schema. Flat, like datasets.

use std::sync::LazyLock;

use serde_json::Value;
use superset_client::SchemaRegistry;
use superset_model::{Entity, Field, Schema, WirePolicy};

static SAVED_QUERY: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("saved_query")
        .field(Field::new("label"))
        .field(Field::new("id").policy(WirePolicy::Never))
        .field(Field::string("description", ""))
        .field(Field::string("sql", ""))
        .field(Field::new("db_id").policy(WirePolicy::OmitAbsent))
        .field(Field::string("schema", ""))
        .build()
        .expect("saved_query schema")
});

pub fn saved_query() -> &'static Schema {
    &SAVED_QUERY
}

pub fn saved_query_registry() -> SchemaRegistry {
    SchemaRegistry::new(saved_query())
}

/// The owning database id. GET payloads nest it under the undeclared
/// `database` object rather than the flat `db_id` column.
pub fn database_id(query: &Entity) -> Option<i64> {
    query
        .get_i64("db_id")
        .or_else(|| match query.extra_fields().get("database") {
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
            "label": "weekly revenue",
            "sql": "SELECT 1",
            "database": {"id": 3, "database_name": "examples"},
        });
        let entity = Entity::from_wire(saved_query(), &payload).unwrap();
        assert_eq!(database_id(&entity), Some(3));
        assert_eq!(entity.get_str("label"), Some("weekly revenue"));
    }

    #[test]
    fn wire_output_keeps_the_server_id_internal() {
        let payload = json!({"id": 9, "label": "weekly revenue", "sql": "SELECT 1"});
        let entity = Entity::from_wire(saved_query(), &payload).unwrap();

        let body = entity.to_wire(None).unwrap();
        assert!(!body.contains_key("id"));
        assert_eq!(body["sql"], json!("SELECT 1"));
    }
}
