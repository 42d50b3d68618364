//! Per-endpoint collection operations: fetch, search, create, update,
//! delete, export and import.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use superset_model::Entity;

use crate::api::{ImportForm, SupersetApi};
use crate::error::{ClientError, ClientResult};
use crate::filter::QueryFilter;
use crate::registry::SchemaRegistry;

/// Endpoint metadata from `_info`: which columns the server accepts on
/// create and edit.
#[derive(Debug, Clone, Default)]
struct EndpointInfo {
    add_columns: Vec<String>,
    edit_columns: Vec<String>,
}

/// All operations against one REST endpoint (`chart`, `dashboard`, ...).
///
/// Entities do not hold a reference back to their collection; operations
/// that act on an existing object take it as an argument instead.
pub struct Collection {
    api: Arc<dyn SupersetApi>,
    endpoint: String,
    registry: SchemaRegistry,
    info: OnceCell<EndpointInfo>,
}

impl Collection {
    pub fn new(api: Arc<dyn SupersetApi>, endpoint: &str, registry: SchemaRegistry) -> Self {
        Self {
            api,
            endpoint: endpoint.trim_matches('/').to_string(),
            registry,
            info: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn item_path(&self, id: i64) -> String {
        format!("{}/{id}", self.endpoint)
    }

    /// The entity's path under the API base, once it has a server id.
    pub fn url_for(&self, entity: &Entity) -> Option<String> {
        entity.id().map(|id| self.item_path(id))
    }

    /// Fetches and caches the endpoint's accepted create/edit columns.
    async fn endpoint_info(&self) -> ClientResult<&EndpointInfo> {
        self.info
            .get_or_try_init(|| async {
                let q = json!({"keys": ["add_columns", "edit_columns"]}).to_string();
                let payload = self
                    .api
                    .get(&format!("{}/_info", self.endpoint), &[("q".to_string(), q)])
                    .await?;
                Ok::<_, ClientError>(EndpointInfo {
                    add_columns: column_names(payload.get("add_columns")),
                    edit_columns: column_names(payload.get("edit_columns")),
                })
            })
            .await
    }

    /// Fetches one object by id. The server envelope is
    /// `{"result": {...}, "id": n}`; the id is injected into the entity.
    pub async fn get(&self, id: i64) -> ClientResult<Entity> {
        let payload = self.api.get(&self.item_path(id), &[]).await?;
        let result = payload.get("result").ok_or(ClientError::MissingResult)?;
        let schema = self.registry.resolve(result);
        let mut entity = Entity::from_wire(schema, result)?;
        let server_id = payload.get("id").and_then(Value::as_i64).unwrap_or(id);
        entity.set_id(server_id);
        Ok(entity)
    }

    /// Runs a listing query; every element is independently resolved to its
    /// schema variant before deserialization.
    pub async fn find(&self, query: &QueryFilter) -> ClientResult<Vec<Entity>> {
        let payload = self.api.find(&self.endpoint, &query.to_q()).await?;
        let results = payload
            .get("result")
            .and_then(Value::as_array)
            .ok_or(ClientError::MissingResult)?;
        results
            .iter()
            .map(|item| {
                let schema = self.registry.resolve(item);
                Entity::from_wire(schema, item).map_err(ClientError::from)
            })
            .collect()
    }

    /// Exactly-one lookup: [`ClientError::NotFound`] on zero matches,
    /// [`ClientError::MultipleFound`] on more than one.
    pub async fn find_one(&self, query: &QueryFilter) -> ClientResult<Entity> {
        let mut found = self.find(query).await?;
        match found.len() {
            0 => Err(ClientError::NotFound),
            1 => Ok(found.remove(0)),
            _ => Err(ClientError::MultipleFound),
        }
    }

    /// Total object count for the endpoint, read from an unfiltered
    /// listing's `count` field.
    pub async fn count(&self) -> ClientResult<u64> {
        let payload = self.api.get(&self.endpoint, &[]).await?;
        payload
            .get("count")
            .and_then(Value::as_u64)
            .ok_or(ClientError::MissingResult)
    }

    /// Creates the object remotely, restricted to the endpoint's
    /// `add_columns`. The server-issued id is written back into the entity
    /// and returned.
    pub async fn add(&self, entity: &mut Entity) -> ClientResult<i64> {
        let info = self.endpoint_info().await?;
        let mut body = entity.to_wire(column_slice(&info.add_columns).as_deref())?;
        // Server-issued identifiers never go out on create.
        body.remove("id");
        debug!(endpoint = %self.endpoint, "creating object");
        let response = self.api.post(&self.endpoint, &Value::Object(body)).await?;
        let id = response
            .get("id")
            .and_then(Value::as_i64)
            .ok_or(ClientError::MissingResult)?;
        entity.set_id(id);
        info!(endpoint = %self.endpoint, id, "created object");
        Ok(id)
    }

    /// Updates the remote object, restricted to `edit_columns`.
    pub async fn save(&self, entity: &Entity) -> ClientResult<()> {
        let id = entity.id().ok_or(ClientError::NotFound)?;
        let info = self.endpoint_info().await?;
        let mut body = entity.to_wire(column_slice(&info.edit_columns).as_deref())?;
        body.remove("id");
        self.api
            .put(&self.item_path(id), &Value::Object(body))
            .await?;
        info!(endpoint = %self.endpoint, id, "saved object");
        Ok(())
    }

    /// Re-fetches the entity from the server and replaces it in place.
    pub async fn refresh(&self, entity: &mut Entity) -> ClientResult<()> {
        let id = entity.id().ok_or(ClientError::NotFound)?;
        *entity = self.get(id).await?;
        Ok(())
    }

    /// Deletes by id. True iff the server answered `{"message": "OK"}`;
    /// HTTP failures still propagate as errors.
    pub async fn delete(&self, id: i64) -> ClientResult<bool> {
        let response = self.api.delete(&self.item_path(id)).await?;
        Ok(response.get("message").and_then(Value::as_str) == Some("OK"))
    }

    /// Exports objects to `path`. The on-disk encoding follows the server's
    /// content type: zip bundles are written verbatim, JSON is re-indented,
    /// `application/text` is parsed and re-dumped as YAML.
    pub async fn export(&self, ids: &[i64], path: &Path) -> ClientResult<()> {
        let ids_text = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let query = vec![("q".to_string(), format!("[{ids_text}]"))];
        let raw = self
            .api
            .get_raw(&format!("{}/export/", self.endpoint), &query)
            .await?;

        if raw.content_type.starts_with("application/zip") {
            tokio::fs::write(path, &raw.bytes).await?;
        } else if raw.content_type.starts_with("application/json") {
            let value: Value = serde_json::from_slice(&raw.bytes)?;
            tokio::fs::write(path, serde_json::to_string_pretty(&value)?).await?;
        } else if raw.content_type.starts_with("application/text") {
            let value: serde_yaml::Value = serde_yaml::from_slice(&raw.bytes)?;
            tokio::fs::write(path, serde_yaml::to_string(&value)?).await?;
        } else {
            return Err(ClientError::UnsupportedContentType(raw.content_type));
        }
        info!(endpoint = %self.endpoint, ?ids, path = %path.display(), "exported objects");
        Ok(())
    }

    /// Imports a bundle file (zip, json or yaml). Database connection
    /// passwords are keyed by database name and sent as
    /// `databases/{name}.yaml` entries. True iff the server answered OK.
    pub async fn import_file(
        &self,
        path: &Path,
        overwrite: bool,
        passwords: &BTreeMap<String, String>,
    ) -> ClientResult<bool> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("bundle")
            .to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "octet-stream".to_string());
        let keyed: Map<String, Value> = passwords
            .iter()
            .map(|(db, pwd)| (format!("databases/{db}.yaml"), Value::String(pwd.clone())))
            .collect();
        let passwords_json = Value::Object(keyed).to_string();

        let form = ImportForm {
            file_name,
            mime: format!("application/{extension}"),
            bytes,
            passwords: passwords_json,
            overwrite,
        };
        let response = self
            .api
            .post_import(&format!("{}/import/", self.endpoint), form)
            .await?;
        Ok(response.get("message").and_then(Value::as_str) == Some("OK"))
    }
}

/// `_info` column entries are objects with a `name`; plain strings are
/// tolerated too.
fn column_names(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// An empty column list means the server declared nothing; emit the full
/// field set instead of an empty body.
fn column_slice(columns: &[String]) -> Option<Vec<&str>> {
    if columns.is_empty() {
        None
    } else {
        Some(columns.iter().map(String::as_str).collect())
    }
}
