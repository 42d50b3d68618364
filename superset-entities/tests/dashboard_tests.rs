use pretty_assertions::assert_eq;
use serde_json::json;
use superset_entities::dashboards::{charts_slice_names, dashboard, update_label_colors};
use superset_model::{Entity, FieldValue};

fn dashboard_payload() -> serde_json::Value {
    json!({
        "id": 7,
        "dashboard_title": "Demographics",
        "published": true,
        "css": "",
        "charts": ["Gender split", "Age histogram"],
        "json_metadata": "{\"color_scheme\": \"supersetColors\", \"refresh_frequency\": 30, \"label_colors\": {\"Girl\": \"#FF69B4\"}, \"chart_configuration\": {\"42\": {\"id\": 42, \"crossFilters\": {\"scope\": \"global\", \"chartsInScope\": [43]}}}}",
        "position_json": "{\"DASHBOARD_VERSION_KEY\": \"v2\", \"GRID_ID\": {\"children\": [], \"id\": \"GRID_ID\", \"type\": \"GRID\"}}",
    })
}

#[test]
fn json_metadata_decodes_into_the_metadata_tree() {
    let board = Entity::from_wire(dashboard(), &dashboard_payload()).unwrap();

    let metadata = board.entity("json_metadata").unwrap();
    assert_eq!(metadata.get_str("color_scheme"), Some("supersetColors"));
    assert_eq!(metadata.get_i64("refresh_frequency"), Some(30));

    let FieldValue::Map(configurations) = metadata.get("chart_configuration").unwrap() else {
        panic!("chart_configuration should be a value-keyed map");
    };
    let FieldValue::Entity(configuration) = &configurations["42"] else {
        panic!("configuration should be an entity");
    };
    let filters = configuration.entity("crossFilters").unwrap();
    assert_eq!(filters.get_str("scope"), Some("global"));
}

#[test]
fn position_json_stays_an_opaque_tree() {
    let board = Entity::from_wire(dashboard(), &dashboard_payload()).unwrap();

    // No nested schema: the parsed tree passes through as a plain value.
    let FieldValue::Value(position) = board.get("position_json").unwrap() else {
        panic!("position_json should be a plain value");
    };
    assert_eq!(position["DASHBOARD_VERSION_KEY"], json!("v2"));

    let body = board.to_wire(None).unwrap();
    let text = body["position_json"].as_str().unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(reparsed["GRID_ID"]["type"], json!("GRID"));
}

#[test]
fn wire_output_keeps_the_server_id_internal() {
    let board = Entity::from_wire(dashboard(), &dashboard_payload()).unwrap();
    assert_eq!(board.id(), Some(7));

    let body = board.to_wire(None).unwrap();
    assert!(!body.contains_key("id"));
    assert_eq!(body["dashboard_title"], json!("Demographics"));
}

#[test]
fn slice_names_survive_a_round_trip_in_extra_fields() {
    let board = Entity::from_wire(dashboard(), &dashboard_payload()).unwrap();
    assert_eq!(
        charts_slice_names(&board),
        vec!["Gender split".to_string(), "Age histogram".to_string()]
    );
}

#[test]
fn label_colors_can_be_set_on_a_fresh_dashboard() {
    let mut board = Entity::new(dashboard());
    board.set("dashboard_title", "Sales");
    update_label_colors(&mut board, json!({"Q1": "#3366CC"}).as_object().unwrap());

    let body = board.to_wire(None).unwrap();
    let metadata: serde_json::Value =
        serde_json::from_str(body["json_metadata"].as_str().unwrap()).unwrap();
    assert_eq!(metadata["label_colors"]["Q1"], json!("#3366CC"));
}
