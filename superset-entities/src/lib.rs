//! Concrete Superset entity schemas on top of the schema-driven model
//! and the typed REST client.
//!
//! Each module declares its endpoint's schemas as static values plus a
//! registry wiring up viz_type variants; [`Superset`] bundles the
//! endpoint collections over one authenticated client.

use std::sync::Arc;

use superset_client::{ClientConfig, ClientResult, Collection, SupersetApi, SupersetClient};

pub mod charts;
pub mod dashboards;
pub mod databases;
pub mod datasets;
pub mod query;
pub mod saved_queries;

/// One Superset instance: the endpoint collections share a single
/// authenticated client.
pub struct Superset {
    api: Arc<dyn SupersetApi>,
    charts: Collection,
    dashboards: Collection,
    datasets: Collection,
    databases: Collection,
    saved_queries: Collection,
}

impl Superset {
    /// Connects with username/password credentials. The login itself is
    /// deferred to the first request.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = SupersetClient::new(config)?;
        Ok(Self::from_api(Arc::new(client)))
    }

    /// Connects with a pre-issued access token.
    pub fn with_access_token(host: &str, token: &str) -> ClientResult<Self> {
        let client = SupersetClient::with_access_token(host, token)?;
        Ok(Self::from_api(Arc::new(client)))
    }

    /// Builds the collections over any transport, mock transports
    /// included.
    pub fn from_api(api: Arc<dyn SupersetApi>) -> Self {
        Self {
            charts: Collection::new(api.clone(), "chart", charts::chart_registry()),
            dashboards: Collection::new(api.clone(), "dashboard", dashboards::dashboard_registry()),
            datasets: Collection::new(api.clone(), "dataset", datasets::dataset_registry()),
            databases: Collection::new(api.clone(), "database", databases::database_registry()),
            saved_queries: Collection::new(
                api.clone(),
                "saved_query",
                saved_queries::saved_query_registry(),
            ),
            api,
        }
    }

    pub fn api(&self) -> &Arc<dyn SupersetApi> {
        &self.api
    }

    pub fn charts(&self) -> &Collection {
        &self.charts
    }

    pub fn dashboards(&self) -> &Collection {
        &self.dashboards
    }

    pub fn datasets(&self) -> &Collection {
        &self.datasets
    }

    pub fn databases(&self) -> &Collection {
        &self.databases
    }

    pub fn saved_queries(&self) -> &Collection {
        &self.saved_queries
    }
}
