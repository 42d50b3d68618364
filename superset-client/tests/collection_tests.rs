use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, LazyLock};

use pretty_assertions::assert_eq;
use serde_json::json;
use superset_client::{
    ClientError, Collection, FilterOperator, QueryFilter, SchemaRegistry, SupersetApi,
    SupersetClient,
};
use superset_model::{Entity, Field, Schema, WirePolicy};
use wiremock::matchers::{
    body_json, body_string_contains, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

static CHART: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("chart")
        .discriminator("viz_type")
        .field(Field::new("id").policy(WirePolicy::Never))
        .field(Field::new("slice_name"))
        .field(Field::string("viz_type", ""))
        .field(Field::string("description", "").policy(WirePolicy::OmitDefault))
        .build()
        .expect("chart schema")
});

static PIE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("pie_chart")
        .extend(&CHART)
        .build()
        .expect("pie schema")
});

fn registry() -> SchemaRegistry {
    SchemaRegistry::new(&CHART).register("pie", &PIE)
}

async fn collection(server: &MockServer) -> Collection {
    let client = SupersetClient::with_access_token(&server.uri(), "tok").unwrap();
    let api: Arc<dyn SupersetApi> = Arc::new(client);
    Collection::new(api, "chart", registry())
}

async fn mount_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "add_columns": [{"name": "slice_name"}, {"name": "viz_type"}],
            "edit_columns": [{"name": "slice_name"}, {"name": "description"}],
        })))
        .mount(server)
        .await;
}

// ── get ─────────────────────────────────────────────────────────

#[tokio::test]
async fn get_injects_the_envelope_id_and_resolves_the_variant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"slice_name": "sales", "viz_type": "pie"},
            "id": 12,
        })))
        .mount(&server)
        .await;

    let chart = collection(&server).await.get(12).await.unwrap();
    assert_eq!(chart.schema().name(), "pie_chart");
    assert_eq!(chart.id(), Some(12));
    assert_eq!(chart.get_str("slice_name"), Some("sales"));
}

#[tokio::test]
async fn get_without_result_is_a_missing_result_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12})))
        .mount(&server)
        .await;

    let err = collection(&server).await.get(12).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingResult));
}

// ── find / find_one / count ─────────────────────────────────────

#[tokio::test]
async fn find_resolves_each_element_independently() {
    let server = MockServer::start().await;
    let query = QueryFilter::new().filter("slice_name", FilterOperator::Like, "s%");

    Mock::given(method("GET"))
        .and(path("/api/v1/chart"))
        .and(query_param("q", query.to_q()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "result": [
                {"id": 1, "slice_name": "sales", "viz_type": "pie"},
                {"id": 2, "slice_name": "stock", "viz_type": "sunburst"},
            ],
        })))
        .mount(&server)
        .await;

    let charts = collection(&server).await.find(&query).await.unwrap();
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[0].schema().name(), "pie_chart");
    assert_eq!(charts[1].schema().name(), "chart");
    assert_eq!(charts[1].id(), Some(2));
}

#[tokio::test]
async fn find_one_requires_exactly_one_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0,
            "result": [],
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "result": [
                {"id": 1, "slice_name": "a", "viz_type": "pie"},
                {"id": 2, "slice_name": "a", "viz_type": "pie"},
            ],
        })))
        .mount(&server)
        .await;

    let collection = collection(&server).await;
    let query = QueryFilter::new().filter("slice_name", FilterOperator::Equals, "a");
    assert!(matches!(
        collection.find_one(&query).await.unwrap_err(),
        ClientError::NotFound
    ));
    assert!(matches!(
        collection.find_one(&query).await.unwrap_err(),
        ClientError::MultipleFound
    ));
}

#[tokio::test]
async fn count_reads_the_listing_count() {
    let server = MockServer::start().await;
    // The count is read from an unfiltered listing, no `q` parameter.
    Mock::given(method("GET"))
        .and(path("/api/v1/chart"))
        .and(query_param_is_missing("q"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 37,
            "result": [],
        })))
        .mount(&server)
        .await;

    assert_eq!(collection(&server).await.count().await.unwrap(), 37);
}

// ── add / save / refresh / delete ───────────────────────────────

#[tokio::test]
async fn add_restricts_to_add_columns_and_writes_back_the_id() {
    let server = MockServer::start().await;
    mount_info(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chart"))
        .and(body_json(json!({"slice_name": "sales", "viz_type": "pie"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "result": {"slice_name": "sales"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collection = collection(&server).await;
    let mut chart = Entity::new(&CHART);
    chart.set("slice_name", "sales");
    chart.set("viz_type", "pie");
    chart.set_id(99);

    let id = collection.add(&mut chart).await.unwrap();
    assert_eq!(id, 7);
    assert_eq!(chart.id(), Some(7));
}

#[tokio::test]
async fn save_puts_edit_columns_to_the_item_path() {
    let server = MockServer::start().await;
    mount_info(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/chart/7"))
        .and(body_json(json!({"slice_name": "renamed", "description": "new"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"slice_name": "renamed"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collection = collection(&server).await;
    let mut chart = Entity::new(&CHART);
    chart.set_id(7);
    chart.set("slice_name", "renamed");
    chart.set("description", "new");

    collection.save(&chart).await.unwrap();
}

#[tokio::test]
async fn save_without_an_id_fails_fast() {
    let server = MockServer::start().await;
    let collection = collection(&server).await;
    let chart = Entity::new(&CHART);
    assert!(matches!(
        collection.save(&chart).await.unwrap_err(),
        ClientError::NotFound
    ));
}

#[tokio::test]
async fn refresh_replaces_the_entity_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"slice_name": "server copy", "viz_type": ""},
            "id": 7,
        })))
        .mount(&server)
        .await;

    let collection = collection(&server).await;
    let mut chart = Entity::new(&CHART);
    chart.set_id(7);
    chart.set("slice_name", "local copy");

    collection.refresh(&mut chart).await.unwrap();
    assert_eq!(chart.get_str("slice_name"), Some("server copy"));
}

#[tokio::test]
async fn delete_is_true_only_for_the_ok_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/chart/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OK"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/chart/8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Forbidden"})),
        )
        .mount(&server)
        .await;

    let collection = collection(&server).await;
    assert!(collection.delete(7).await.unwrap());
    assert!(!collection.delete(8).await.unwrap());
}

// ── export / import ─────────────────────────────────────────────

fn zip_bundle() -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut cursor);
    writer
        .start_file("chart_export/chart.yaml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"slice_name: sales\n").unwrap();
    writer.finish().unwrap();
    cursor.into_inner()
}

#[tokio::test]
async fn export_writes_zip_bundles_verbatim() {
    let server = MockServer::start().await;
    let bundle = zip_bundle();
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/export/"))
        .and(query_param("q", "[1,2]"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/zip")
                .set_body_bytes(bundle.clone()),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("charts.zip");
    collection(&server).await.export(&[1, 2], &target).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), bundle);
}

#[tokio::test]
async fn export_pretty_prints_json_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/export/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"{"slice_name":"sales","viz_type":"pie"}"#,
                "application/json; charset=utf-8",
            ),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("chart.json");
    collection(&server).await.export(&[1], &target).await.unwrap();

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["slice_name"], json!("sales"));
}

#[tokio::test]
async fn export_redumps_text_payloads_as_yaml() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/export/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("slice_name: sales\nviz_type: pie\n", "application/text"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("chart.yaml");
    collection(&server).await.export(&[1], &target).await.unwrap();

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("slice_name: sales"));
}

#[tokio::test]
async fn export_rejects_unknown_content_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chart/export/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(vec![1, 2, 3]),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("chart.bin");
    let err = collection(&server)
        .await
        .export(&[1], &target)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedContentType(_)));
}

#[tokio::test]
async fn import_file_is_true_on_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chart/import/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("charts.zip");
    std::fs::write(&bundle, zip_bundle()).unwrap();

    let mut passwords = BTreeMap::new();
    passwords.insert("examples".to_string(), "hunter2".to_string());
    let imported = collection(&server)
        .await
        .import_file(&bundle, true, &passwords)
        .await
        .unwrap();
    assert!(imported);
}

#[tokio::test]
async fn import_without_passwords_sends_an_empty_passwords_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chart/import/"))
        .and(body_string_contains("name=\"passwords\""))
        .and(body_string_contains("{}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("charts.json");
    std::fs::write(&bundle, "{}").unwrap();

    let imported = collection(&server)
        .await
        .import_file(&bundle, false, &BTreeMap::new())
        .await
        .unwrap();
    assert!(imported);
}

// ── url_for ─────────────────────────────────────────────────────

#[tokio::test]
async fn url_for_needs_a_server_id() {
    let server = MockServer::start().await;
    let collection = collection(&server).await;

    let mut chart = Entity::new(&CHART);
    assert_eq!(collection.url_for(&chart), None);
    chart.set_id(42);
    assert_eq!(collection.url_for(&chart).as_deref(), Some("chart/42"));
}
