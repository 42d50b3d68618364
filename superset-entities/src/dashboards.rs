//! Dashboard schemas, including the JSON-encoded metadata and position
//! trees, and label-color helpers.

use std::sync::LazyLock;

use serde_json::{Map, Value};
use superset_client::SchemaRegistry;
use superset_model::{Entity, Field, FieldValue, Schema, WirePolicy};

static CROSS_FILTERS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("cross_filters")
        .field(Field::string("scope", "global"))
        .field(Field::list("chartsInScope"))
        .build()
        .expect("cross_filters schema")
});

pub fn cross_filters() -> &'static Schema {
    &CROSS_FILTERS
}

static CHART_CONFIGURATION: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("chart_configuration")
        .field(Field::new("id").policy(WirePolicy::OmitAbsent))
        .field(Field::new("crossFilters").nested(cross_filters).policy(WirePolicy::OmitAbsent))
        .build()
        .expect("chart_configuration schema")
});

/// Per-chart cross-filter configuration, keyed by chart id in the
/// metadata tree.
pub fn chart_configuration() -> &'static Schema {
    &CHART_CONFIGURATION
}

static GLOBAL_SCOPE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("global_scope")
        .field(Field::list("rootPath"))
        .field(Field::list("excluded"))
        .build()
        .expect("global_scope schema")
});

pub fn global_scope() -> &'static Schema {
    &GLOBAL_SCOPE
}

static GLOBAL_CHART_CONFIGURATION: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("global_chart_configuration")
        .field(Field::new("scope").nested(global_scope).policy(WirePolicy::OmitAbsent))
        .field(Field::list("chartsInScope"))
        .build()
        .expect("global_chart_configuration schema")
});

pub fn global_chart_configuration() -> &'static Schema {
    &GLOBAL_CHART_CONFIGURATION
}

static DASHBOARD_METADATA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("dashboard_metadata")
        .field(Field::string("color_scheme", ""))
        .field(Field::integer("refresh_frequency", 0))
        .field(Field::object("shared_label_colors"))
        .field(Field::object("expanded_slices"))
        .field(Field::object("label_colors"))
        .field(Field::list("color_scheme_domain"))
        .field(Field::list("timed_refresh_immune_slices"))
        .field(Field::boolean("cross_filters_enabled", false))
        .field(Field::object("chart_configuration").map_of(chart_configuration))
        .field(
            Field::new("global_chart_configuration")
                .nested(global_chart_configuration)
                .policy(WirePolicy::OmitAbsent),
        )
        .field(Field::json("default_filters").policy(WirePolicy::OmitDefault))
        .build()
        .expect("dashboard_metadata schema")
});

/// The `json_metadata` tree carried by a dashboard as JSON text.
pub fn dashboard_metadata() -> &'static Schema {
    &DASHBOARD_METADATA
}

static DASHBOARD: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("dashboard")
        .field(Field::new("dashboard_title"))
        .field(Field::boolean("published", false))
        .field(Field::new("id").policy(WirePolicy::Never))
        .field(Field::string("css", ""))
        .field(Field::new("slug").policy(WirePolicy::OmitAbsent))
        .field(Field::json("json_metadata").nested(dashboard_metadata))
        // Layout tree; opaque because its keys are position-generated.
        .field(Field::json("position_json"))
        .build()
        .expect("dashboard schema")
});

pub fn dashboard() -> &'static Schema {
    &DASHBOARD
}

/// The dispatch table for the `dashboard` endpoint. Dashboards have no
/// variants, so the generic schema handles everything.
pub fn dashboard_registry() -> SchemaRegistry {
    SchemaRegistry::new(dashboard())
}

/// Slice names of the charts on a dashboard. GET payloads carry them in
/// the undeclared `charts` key, so they live in the extra fields.
pub fn charts_slice_names(dashboard: &Entity) -> Vec<String> {
    match dashboard.extra_fields().get("charts") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// The label color assignments from the metadata tree.
pub fn label_colors(dashboard: &Entity) -> Map<String, Value> {
    let Some(metadata) = dashboard.entity("json_metadata") else {
        return Map::new();
    };
    match metadata.get("label_colors") {
        Some(FieldValue::Value(Value::Object(colors))) => colors.clone(),
        _ => Map::new(),
    }
}

/// Merges label colors into the metadata tree, creating it on demand.
/// Existing labels are overwritten, others are left alone.
pub fn update_label_colors(dashboard: &mut Entity, colors: &Map<String, Value>) {
    let Some(metadata) = dashboard.ensure_entity("json_metadata") else {
        return;
    };
    let mut merged = match metadata.get("label_colors") {
        Some(FieldValue::Value(Value::Object(existing))) => existing.clone(),
        _ => Map::new(),
    };
    for (label, color) in colors {
        merged.insert(label.clone(), color.clone());
    }
    metadata.set("label_colors", Value::Object(merged));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn label_colors_merge_without_dropping_existing_entries() {
        let mut board = Entity::new(dashboard());
        board.set("dashboard_title", "Sales");
        update_label_colors(&mut board, json!({"Girl": "#FF69B4"}).as_object().unwrap());
        update_label_colors(&mut board, json!({"Boy": "#ADD8E6"}).as_object().unwrap());

        let colors = label_colors(&board);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors["Girl"], json!("#FF69B4"));
    }

    #[test]
    fn slice_names_come_from_the_undeclared_charts_key() {
        let payload = json!({
            "dashboard_title": "Sales",
            "charts": ["Weekly revenue", "Top products"],
        });
        let board = Entity::from_wire(dashboard(), &payload).unwrap();
        assert_eq!(
            charts_slice_names(&board),
            vec!["Weekly revenue".to_string(), "Top products".to_string()]
        );
    }
}
