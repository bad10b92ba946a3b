//! Resource listing, templates and reads

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tapmcp_core::{ConnectionSchemaRecord, Table};
use tests::fixtures::{connection, orders_connection};
use tests::{GatewayHarness, MockBackend};

fn harness() -> GatewayHarness {
    GatewayHarness::new(MockBackend::new().with_connection(orders_connection()))
}

/// Parsed schema text of a read reply
fn read_schema(reply: &Value) -> Value {
    let contents = &reply["result"]["contents"][0];
    assert_eq!(contents["mimeType"], "application/json");
    serde_json::from_str(contents["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_list_resources() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "resources/list", json!({})).await;
    let resources = reply["result"]["resources"].as_array().unwrap();

    let uris: Vec<&str> = resources.iter().map(|r| r["uri"].as_str().unwrap()).collect();
    assert_eq!(uris, vec!["tap://c1", "tap://c1/t1", "tap://c1/t2"]);

    assert_eq!(
        resources[0]["description"],
        "The datasource type of connection \"orders\" is MongoDB, which has a total of 2 tables"
    );
    assert_eq!(resources[1]["name"], "orders/orders");
    assert_eq!(
        resources[1]["description"],
        "This is a table in datasource of connection \"orders\", it has 3 fields"
    );
}

#[tokio::test]
async fn test_list_resources_skips_tables_without_id() {
    let mut conn = connection("c2", "billing", vec![]);
    conn.schema = Some(ConnectionSchemaRecord {
        tables: vec![Table {
            table_name: Some("orphan".to_string()),
            ..Default::default()
        }],
    });
    let h = GatewayHarness::new(MockBackend::new().with_connection(conn));
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "resources/list", json!({})).await;

    assert_eq!(reply["result"]["resources"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_resources_degrades_to_empty() {
    let h = harness();
    h.backend.set_listing_failing(true);
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "resources/list", json!({})).await;

    assert_eq!(reply["result"]["resources"], json!([]));
}

#[tokio::test]
async fn test_resource_templates() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/templates/list", json!({}))
        .await;

    let templates: Vec<&str> = reply["result"]["resourceTemplates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["uriTemplate"].as_str().unwrap())
        .collect();
    assert_eq!(
        templates,
        vec!["tap://{connectionId}", "tap://{connectionId}/{tableId}"]
    );
}

#[tokio::test]
async fn test_read_connection() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/read", json!({ "uri": "tap://c1" }))
        .await;
    let schema = read_schema(&reply);

    assert_eq!(reply["result"]["contents"][0]["uri"], "tap://c1");
    assert_eq!(schema["type"], "connection");
    assert_eq!(schema["id"], "c1");
    assert_eq!(schema["databaseType"], "MongoDB");
    assert_eq!(schema["tableCount"], 2);
    assert_eq!(schema["tables"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_read_table() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/read", json!({ "uri": "tap://c1/t1" }))
        .await;
    let schema = read_schema(&reply);

    assert_eq!(
        schema,
        json!({
            "type": "table",
            "id": "t1",
            "name": "orders",
            "fields": [
                { "name": "_id", "type": "OBJECT_ID", "unique": true, "primaryKey": true },
                { "name": "total", "type": "DOUBLE", "unique": false, "primaryKey": false },
                { "name": "status", "type": "STRING", "unique": false, "primaryKey": false }
            ],
            "indexes": [
                { "name": "_id_", "unique": true, "keys": ["_id"] }
            ]
        })
    );
}

#[tokio::test]
async fn test_read_missing_table_is_empty_schema() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/read", json!({ "uri": "tap://c1/t9" }))
        .await;
    let schema = read_schema(&reply);

    assert_eq!(schema["type"], "table");
    assert_eq!(schema["id"], "");
    assert_eq!(schema["name"], "Unknown table name");
}

#[tokio::test]
async fn test_read_unparseable_uri() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/read", json!({ "uri": "not-a-uri" }))
        .await;

    assert_eq!(
        read_schema(&reply),
        json!({ "type": "Unknown", "id": "", "name": "Unknown resource" })
    );
    assert_eq!(h.backend.lookup_count(), 0);
}

#[tokio::test]
async fn test_read_degrades_when_lookup_fails() {
    let h = harness();
    h.backend.set_lookup_failing(true);
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "resources/read", json!({ "uri": "tap://c1" }))
        .await;

    assert_eq!(
        read_schema(&reply),
        json!({ "type": "connection", "id": "c1", "name": "" })
    );
}
