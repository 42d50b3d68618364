//! Database connection schema.

use std::sync::LazyLock;

use superset_client::SchemaRegistry;
use superset_model::{Field, Schema, WirePolicy};

static DATABASE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("database")
        .field(Field::new("database_name"))
        .field(Field::string("sqlalchemy_uri", ""))
        .field(Field::boolean("expose_in_sqllab", true))
        .field(Field::boolean("allow_run_async", false))
        .field(Field::boolean("allow_ctas", false))
        .field(Field::boolean("allow_cvas", false))
        .field(Field::boolean("allow_dml", false))
        // Engine parameters; carried as JSON text but schemaless.
        .field(Field::json("extra"))
        .field(Field::new("id").policy(WirePolicy::Never))
        .build()
        .expect("database schema")
});

pub fn database() -> &'static Schema {
    &DATABASE
}

pub fn database_registry() -> SchemaRegistry {
    SchemaRegistry::new(database())
}
