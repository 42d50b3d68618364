//! Query sub-schemas shared by every chart type: adhoc metrics, adhoc
//! filter clauses, query objects and the query context envelope.

use std::sync::LazyLock;

use serde_json::Value;
use superset_model::{Entity, Field, FieldValue, Schema, WirePolicy};

static METRIC_COLUMN: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("metric_column")
        .field(Field::string("column_name", ""))
        .field(Field::new("id").policy(WirePolicy::OmitAbsent))
        .field(Field::new("verbose_name").policy(WirePolicy::OmitAbsent))
        .field(Field::new("description").policy(WirePolicy::OmitAbsent))
        .field(Field::new("expression").policy(WirePolicy::OmitAbsent))
        .field(Field::new("type").policy(WirePolicy::OmitAbsent))
        .field(Field::boolean("filterable", true))
        .field(Field::boolean("groupby", true))
        .field(Field::boolean("is_dttm", false))
        .build()
        .expect("metric_column schema")
});

/// Column reference inside a custom metric.
pub fn metric_column() -> &'static Schema {
    &METRIC_COLUMN
}

static ADHOC_METRIC: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("adhoc_metric")
        .field(Field::string("expressionType", "SIMPLE"))
        .field(Field::new("label").policy(WirePolicy::OmitAbsent))
        .field(Field::new("hasCustomLabel").policy(WirePolicy::OmitAbsent))
        .field(Field::new("sqlExpression").policy(WirePolicy::OmitAbsent))
        .field(Field::new("column").nested(metric_column).policy(WirePolicy::OmitAbsent))
        .field(Field::new("aggregate").policy(WirePolicy::OmitAbsent))
        .field(Field::new("optionName").policy(WirePolicy::OmitAbsent))
        .build()
        .expect("adhoc_metric schema")
});

/// A structured metric. Metric lists mix these with plain saved-metric
/// names, which pass through as strings.
pub fn adhoc_metric() -> &'static Schema {
    &ADHOC_METRIC
}

static ADHOC_FILTER: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("adhoc_filter")
        .field(Field::string("expressionType", "SIMPLE"))
        .field(Field::new("subject").policy(WirePolicy::OmitAbsent))
        .field(Field::new("operator").policy(WirePolicy::OmitAbsent))
        .field(Field::new("operatorId").policy(WirePolicy::OmitAbsent))
        .field(Field::new("comparator").policy(WirePolicy::OmitAbsent))
        .field(Field::string("clause", "WHERE"))
        .field(Field::new("sqlExpression").policy(WirePolicy::OmitAbsent))
        .field(Field::boolean("isExtra", false))
        .field(Field::boolean("isNew", false))
        .build()
        .expect("adhoc_filter schema")
});

pub fn adhoc_filter() -> &'static Schema {
    &ADHOC_FILTER
}

static DATASOURCE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("datasource")
        .field(Field::new("id"))
        .field(Field::string("type", "table"))
        .build()
        .expect("datasource schema")
});

pub fn datasource() -> &'static Schema {
    &DATASOURCE
}

static QUERY: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("query")
        .field(Field::list("metrics").list_of(adhoc_metric))
        .field(Field::list("columns").list_of(adhoc_metric))
        .field(Field::list("filters").list_of(adhoc_filter))
        // Order-by entries are two-element pairs: [metric, ascending].
        .field(Field::list("orderby").list_of(adhoc_metric))
        .field(Field::integer("row_limit", 100))
        .field(Field::new("time_range").policy(WirePolicy::OmitAbsent))
        .field(Field::object("extras"))
        .build()
        .expect("query schema")
});

/// One query object inside a query context.
pub fn query() -> &'static Schema {
    &QUERY
}

static QUERY_CONTEXT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("query_context")
        .field(Field::new("datasource").nested(datasource))
        .field(Field::list("queries").list_of(query))
        .field(Field::new("form_data").nested(crate::charts::chart_options))
        .field(Field::boolean("force", false))
        .field(Field::string("result_format", "json"))
        .field(Field::string("result_type", "full"))
        .build()
        .expect("query_context schema")
});

/// The `query_context` envelope: datasource, query objects and a copy of
/// the chart options as `form_data`.
pub fn query_context() -> &'static Schema {
    &QUERY_CONTEXT
}

/// Builds a custom metric entity. A SQL expression switches the
/// expression type to `SQL`; aggregates are upper-cased the way the
/// server expects.
pub fn custom_metric(
    label: &str,
    sql_expression: Option<&str>,
    aggregate: Option<&str>,
) -> Entity {
    let mut metric = Entity::new(adhoc_metric());
    metric.set("label", label);
    metric.set("hasCustomLabel", true);
    if let Some(sql) = sql_expression {
        metric.set("expressionType", "SQL");
        metric.set("sqlExpression", sql);
    }
    if let Some(aggregate) = aggregate {
        metric.set("aggregate", aggregate.to_ascii_uppercase());
    }
    metric
}

/// A two-element order-by pair.
pub fn order_pair(metric: impl Into<FieldValue>, ascending: bool) -> FieldValue {
    FieldValue::List(vec![metric.into(), FieldValue::Value(Value::Bool(ascending))])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn custom_metric_with_sql_switches_expression_type() {
        let metric = custom_metric("revenue", Some("SUM(price)"), Some("sum"));
        assert_eq!(metric.get_str("expressionType"), Some("SQL"));
        assert_eq!(metric.get_str("sqlExpression"), Some("SUM(price)"));
        assert_eq!(metric.get_str("aggregate"), Some("SUM"));
        assert_eq!(metric.get_bool("hasCustomLabel"), Some(true));
    }

    #[test]
    fn simple_custom_metric_stays_simple() {
        let metric = custom_metric("count of rows", None, None);
        assert_eq!(metric.get_str("expressionType"), Some("SIMPLE"));
        assert_eq!(metric.get("sqlExpression"), Some(&FieldValue::Absent));
    }

    #[test]
    fn order_pairs_render_as_two_element_arrays() {
        let pair = order_pair("count", false);
        let FieldValue::List(items) = &pair else {
            panic!("order pair should be a list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], FieldValue::Value(json!(false)));
    }

    #[test]
    fn query_context_decodes_mixed_metric_lists() {
        let payload = json!({
            "datasource": {"id": 4, "type": "table"},
            "queries": [{
                "metrics": ["count", {"expressionType": "SQL", "label": "rev"}],
                "orderby": [["count", false]],
            }],
        });
        let context = Entity::from_wire(query_context(), &payload).unwrap();
        let queries = context.get("queries").unwrap();
        let FieldValue::List(queries) = queries else {
            panic!("queries should be a list");
        };
        let FieldValue::Entity(first) = &queries[0] else {
            panic!("query should be an entity");
        };
        let FieldValue::List(metrics) = first.get("metrics").unwrap() else {
            panic!("metrics should be a list");
        };
        assert_eq!(metrics[0], FieldValue::Value(json!("count")));
        assert!(matches!(&metrics[1], FieldValue::Entity(m) if m.get_str("label") == Some("rev")));
    }
}
