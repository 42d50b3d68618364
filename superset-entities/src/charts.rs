//! Chart schemas: the generic chart, the `pie` and `table` variants, and
//! capability helpers for building metrics, group-bys and filters.

use std::sync::LazyLock;

use serde_json::{json, Map, Value};
use superset_client::SchemaRegistry;
use superset_model::{Entity, Field, FieldValue, Schema, ValidationError, WirePolicy};

use crate::query::{adhoc_filter, adhoc_metric, custom_metric, order_pair};

static CHART_OPTIONS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("chart_options")
        .field(Field::string("viz_type", ""))
        .field(Field::new("slice_id").policy(WirePolicy::OmitAbsent))
        .field(Field::new("datasource").policy(WirePolicy::OmitAbsent))
        .field(Field::object("extra_form_data"))
        .field(Field::integer("row_limit", 100))
        .field(Field::list("adhoc_filters").list_of(adhoc_filter))
        .field(Field::list("dashboards"))
        .field(Field::list("groupby").list_of(adhoc_metric))
        .field(Field::list("metrics").list_of(adhoc_metric))
        .build()
        .expect("chart_options schema")
});

/// The generic chart options tree, also used as `form_data` inside a
/// query context.
pub fn chart_options() -> &'static Schema {
    &CHART_OPTIONS
}

static PIE_OPTIONS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("pie_options")
        .extend(&CHART_OPTIONS)
        .field(Field::string("viz_type", "pie"))
        .field(Field::string("color_scheme", "supersetColors"))
        .field(Field::boolean("show_legend", true))
        .field(Field::boolean("show_labels", true))
        .field(Field::boolean("labels_outside", true))
        .field(Field::string("label_type", "key"))
        .field(Field::string("number_format", "SMART_NUMBER"))
        .field(Field::string("date_format", "smart_date"))
        .field(Field::boolean("donut", false))
        .field(Field::integer("innerRadius", 30))
        .field(Field::integer("outerRadius", 70))
        .field(Field::integer("show_labels_threshold", 5))
        .field(Field::new("metric").nested(adhoc_metric).policy(WirePolicy::OmitAbsent))
        .field(Field::boolean("sort_by_metric", false))
        .validator(require_single_metric)
        .build()
        .expect("pie_options schema")
});

pub fn pie_options() -> &'static Schema {
    &PIE_OPTIONS
}

static TABLE_OPTIONS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("table_options")
        .extend(&CHART_OPTIONS)
        .field(Field::string("viz_type", "table"))
        .field(Field::integer("row_limit", 1000))
        .field(Field::string("query_mode", "aggregate"))
        .field(Field::integer("server_page_length", 10))
        .field(Field::boolean("order_desc", false))
        .field(Field::boolean("show_cell_bars", true))
        .field(Field::boolean("color_pn", true))
        .field(Field::string("table_timestamp_format", "smart_date"))
        .field(Field::new("include_search").policy(WirePolicy::OmitAbsent))
        .field(Field::list("percent_metrics").list_of(adhoc_metric))
        .validator(require_metric_list)
        .build()
        .expect("table_options schema")
});

pub fn table_options() -> &'static Schema {
    &TABLE_OPTIONS
}

static CHART: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("chart")
        .discriminator("viz_type")
        .field(Field::new("slice_name"))
        .field(Field::new("description").policy(WirePolicy::OmitAbsent))
        .field(Field::string("viz_type", ""))
        .field(Field::new("id").policy(WirePolicy::Never))
        .field(Field::new("cache_timeout").policy(WirePolicy::Never))
        .field(Field::new("datasource_id").policy(WirePolicy::OmitAbsent))
        .field(Field::string("datasource_type", "table"))
        .field(Field::json("params").nested(chart_options))
        .field(Field::json("query_context").nested(crate::query::query_context))
        .field(Field::list("dashboards").list_of(crate::dashboards::dashboard))
        .build()
        .expect("chart schema")
});

/// The generic chart: decodes any viz_type the registry has no variant
/// for.
pub fn chart() -> &'static Schema {
    &CHART
}

static PIE_CHART: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("pie_chart")
        .extend(&CHART)
        .field(Field::string("viz_type", "pie"))
        .field(Field::json("params").nested(pie_options))
        .validator(pie_chart_validator)
        .build()
        .expect("pie_chart schema")
});

pub fn pie_chart() -> &'static Schema {
    &PIE_CHART
}

static TABLE_CHART: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("table_chart")
        .extend(&CHART)
        .field(Field::string("viz_type", "table"))
        .field(Field::json("params").nested(table_options))
        .validator(table_chart_validator)
        .build()
        .expect("table_chart schema")
});

pub fn table_chart() -> &'static Schema {
    &TABLE_CHART
}

/// The viz_type dispatch table for the `chart` endpoint.
pub fn chart_registry() -> SchemaRegistry {
    SchemaRegistry::new(chart())
        .register("pie", pie_chart())
        .register("table", table_chart())
}

// ── Validators ───────────────────────────────────────────────────

fn require_single_metric(tree: &Map<String, Value>) -> Result<(), ValidationError> {
    match tree.get("metric") {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(ValidationError::new(
            "metric cannot be empty",
            "use add_simple_metric or add_custom_metric to set the metric",
        )),
    }
}

fn require_metric_list(tree: &Map<String, Value>) -> Result<(), ValidationError> {
    match tree.get("metrics").and_then(Value::as_array) {
        Some(metrics) if !metrics.is_empty() => Ok(()),
        _ => Err(ValidationError::new(
            "metric list must not be empty",
            "use add_simple_metric or add_custom_metric to add a metric",
        )),
    }
}

/// The emitted `params` field is already JSON text; parse it back so the
/// option checks can run at the chart level too.
fn params_tree(tree: &Map<String, Value>) -> Option<Value> {
    match tree.get("params") {
        Some(Value::String(text)) => serde_json::from_str(text).ok(),
        Some(other) => Some(other.clone()),
        None => None,
    }
}

fn pie_chart_validator(tree: &Map<String, Value>) -> Result<(), ValidationError> {
    match params_tree(tree) {
        Some(Value::Object(params)) => require_single_metric(&params),
        _ => Err(ValidationError::new(
            "chart options cannot be empty",
            "populate params before saving the chart",
        )),
    }
}

fn table_chart_validator(tree: &Map<String, Value>) -> Result<(), ValidationError> {
    match params_tree(tree) {
        Some(Value::Object(params)) => require_metric_list(&params),
        _ => Err(ValidationError::new(
            "chart options cannot be empty",
            "populate params before saving the chart",
        )),
    }
}

// ── Capability helpers ───────────────────────────────────────────

/// Sets the metric on an options tree: single-metric charts (pie) take it
/// as `metric`, list-metric charts append to `metrics`.
fn set_option_metric(options: &mut Entity, metric: FieldValue) {
    if options.schema().field("metric").is_some() {
        options.set("metric", metric);
        options.set("sort_by_metric", true);
    } else if let Some(metrics) = options.list_mut("metrics") {
        metrics.push(metric);
    } else {
        options.set("metrics", vec![metric]);
    }
}

/// Mirrors a metric into the query context: form_data plus the first
/// query object (created on demand), with an automatic order-by pair.
fn mirror_metric(chart: &mut Entity, metric: FieldValue) {
    let Some(context) = chart.ensure_entity("query_context") else {
        return;
    };
    if let Some(form_data) = context.ensure_entity("form_data") {
        set_option_metric(form_data, metric.clone());
    }
    let query_schema = context.schema().field("queries").and_then(|d| d.nested());
    if let Some(queries) = context.list_mut("queries") {
        if queries.is_empty() {
            if let Some(schema) = query_schema {
                queries.push(FieldValue::from(Entity::new(schema)));
            }
        }
        if let Some(FieldValue::Entity(first)) = queries.first_mut() {
            if let Some(metrics) = first.list_mut("metrics") {
                metrics.push(metric.clone());
            }
            if let Some(orderby) = first.list_mut("orderby") {
                orderby.push(order_pair(metric, true));
            }
        }
    }
}

/// Adds a saved metric by name, keeping params and query context in sync.
pub fn add_simple_metric(chart: &mut Entity, metric: &str) {
    if let Some(params) = chart.ensure_entity("params") {
        set_option_metric(params, FieldValue::from(metric));
    }
    mirror_metric(chart, FieldValue::from(metric));
}

/// Adds a custom metric built from a label, an optional SQL expression
/// and an optional aggregate.
pub fn add_custom_metric(
    chart: &mut Entity,
    label: &str,
    sql_expression: Option<&str>,
    aggregate: Option<&str>,
) {
    let metric = FieldValue::from(custom_metric(label, sql_expression, aggregate));
    if let Some(params) = chart.ensure_entity("params") {
        set_option_metric(params, metric.clone());
    }
    mirror_metric(chart, metric);
}

/// Adds a group-by column to params, form_data and the first query.
pub fn add_groupby(chart: &mut Entity, column: &str) {
    if let Some(params) = chart.ensure_entity("params") {
        if let Some(groupby) = params.list_mut("groupby") {
            groupby.push(FieldValue::from(column));
        }
    }
    let Some(context) = chart.ensure_entity("query_context") else {
        return;
    };
    if let Some(form_data) = context.ensure_entity("form_data") {
        if let Some(groupby) = form_data.list_mut("groupby") {
            groupby.push(FieldValue::from(column));
        }
    }
    if let Some(queries) = context.list_mut("queries") {
        if let Some(FieldValue::Entity(first)) = queries.first_mut() {
            if let Some(columns) = first.list_mut("columns") {
                columns.push(FieldValue::from(column));
            }
        }
    }
}

/// Adds a simple where-clause filter (`column operator value`) to the
/// adhoc filters and the first query.
pub fn add_simple_filter(chart: &mut Entity, column: &str, operator: &str, value: &str) {
    let mut clause = Entity::new(adhoc_filter());
    clause.set("subject", column);
    clause.set("operator", operator);
    if let Some(id) = operator_id(operator) {
        clause.set("operatorId", id);
    }
    clause.set("comparator", value);

    if let Some(params) = chart.ensure_entity("params") {
        if let Some(filters) = params.list_mut("adhoc_filters") {
            filters.push(FieldValue::from(clause.clone()));
        }
    }
    let Some(context) = chart.ensure_entity("query_context") else {
        return;
    };
    if let Some(form_data) = context.ensure_entity("form_data") {
        if let Some(filters) = form_data.list_mut("adhoc_filters") {
            filters.push(FieldValue::from(clause));
        }
    }
    if let Some(queries) = context.list_mut("queries") {
        if let Some(FieldValue::Entity(first)) = queries.first_mut() {
            if let Some(filters) = first.list_mut("filters") {
                filters.push(FieldValue::Value(json!({
                    "col": column,
                    "op": operator,
                    "val": value,
                })));
            }
        }
    }
}

fn operator_id(operator: &str) -> Option<&'static str> {
    match operator {
        "==" => Some("EQUALS"),
        "!=" => Some("NOT_EQUALS"),
        ">" => Some("GREATER_THAN"),
        ">=" => Some("GREATER_THAN_OR_EQUAL"),
        "<" => Some("LESS_THAN"),
        "<=" => Some("LESS_THAN_OR_EQUAL"),
        "LIKE" => Some("LIKE"),
        "IN" => Some("IN"),
        _ => None,
    }
}

/// Dashboard ids a chart belongs to. GET payloads carry dashboard
/// objects; locally-built charts carry plain ids. Both are handled.
pub fn dashboard_ids(chart: &Entity) -> Vec<i64> {
    match chart.get("dashboards") {
        Some(FieldValue::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                FieldValue::Value(value) => value.as_i64(),
                FieldValue::Entity(dashboard) => dashboard.id(),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
