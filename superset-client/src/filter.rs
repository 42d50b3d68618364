//! Listing queries: filter clauses, column selection and pagination,
//! rendered into the `q` request parameter.

use serde_json::{json, Value};

/// Comparison operators accepted by Superset listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    Like,
    ILike,
    IsNull,
    IsNotNull,
    /// Date/time range filters.
    TemporalRange,
}

impl FilterOperator {
    /// The wire token for the `opr` clause key.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "eq",
            FilterOperator::NotEquals => "ne",
            FilterOperator::GreaterThan => "gt",
            FilterOperator::GreaterThanOrEqual => "gte",
            FilterOperator::LessThan => "lt",
            FilterOperator::LessThanOrEqual => "lte",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not in",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::IsNull => "is null",
            FilterOperator::IsNotNull => "is not null",
            FilterOperator::TemporalRange => "TEMPORAL_RANGE",
        }
    }
}

/// A listing query: zero or more `{col, opr, value}` clauses plus column
/// selection and pagination.
///
/// ```
/// use superset_client::{FilterOperator, QueryFilter};
///
/// let query = QueryFilter::new()
///     .filter("slice_name", FilterOperator::Equals, "sales")
///     .column("id")
///     .column("slice_name");
/// assert!(query.to_q().contains("\"opr\":\"eq\""));
/// ```
#[derive(Debug, Clone)]
pub struct QueryFilter {
    filters: Vec<Value>,
    columns: Vec<String>,
    page_size: u64,
    page: u64,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            columns: Vec::new(),
            page_size: 100,
            page: 0,
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one filter clause.
    pub fn filter(
        mut self,
        column: &str,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(json!({
            "col": column,
            "opr": operator.as_str(),
            "value": value.into(),
        }));
        self
    }

    /// Restricts the columns returned per object.
    pub fn column(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    /// Renders the query into the JSON text carried by the `q` parameter.
    pub fn to_q(&self) -> String {
        let query = json!({
            "page_size": self.page_size,
            "page": self.page,
            "filters": self.filters,
            "columns": self.columns,
        });
        query.to_string()
    }
}
