//! Initialization, liveness and routing failures

use pretty_assertions::assert_eq;
use rmcp::model::ProtocolVersion;
use serde_json::{json, Value};
use tapmcp_core::branding;
use tests::fixtures::orders_connection;
use tests::{GatewayHarness, MockBackend};

use super::error_code;

fn harness() -> GatewayHarness {
    GatewayHarness::new(MockBackend::new().with_connection(orders_connection()))
}

#[tokio::test]
async fn test_initialize_advertises_capabilities() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(
            session.id(),
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "inspector", "version": "0.1.0" }
            }),
        )
        .await;

    let result = &reply["result"];
    assert_eq!(result["serverInfo"]["name"], branding::SERVER_NAME);
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
    assert!(result["capabilities"]["prompts"].is_object());
    assert_eq!(reply["id"], 1);
}

#[tokio::test]
async fn test_initialize_echoes_supported_protocol_version() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    for version in ["2024-11-05", "2025-03-26"] {
        let reply = h
            .rpc(
                session.id(),
                "initialize",
                json!({
                    "protocolVersion": version,
                    "capabilities": {},
                    "clientInfo": { "name": "inspector", "version": "0.1.0" }
                }),
            )
            .await;
        assert_eq!(reply["result"]["protocolVersion"], version);
    }
}

#[tokio::test]
async fn test_initialize_answers_latest_for_unknown_protocol_version() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(
            session.id(),
            "initialize",
            json!({
                "protocolVersion": "1999-01-01",
                "capabilities": {},
                "clientInfo": { "name": "inspector", "version": "0.1.0" }
            }),
        )
        .await;

    assert_eq!(
        reply["result"]["protocolVersion"],
        serde_json::to_value(ProtocolVersion::LATEST).unwrap()
    );
}

#[tokio::test]
async fn test_ping_when_backend_healthy() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "ping", Value::Null).await;

    assert_eq!(error_code(&reply), None);
    assert_eq!(reply["result"], json!({}));
}

#[tokio::test]
async fn test_ping_when_backend_unhealthy() {
    let h = harness();
    h.backend.set_healthy(false);
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "ping", Value::Null).await;

    assert_eq!(error_code(&reply), Some(-32603));
    assert_eq!(reply["error"]["message"], "TM is not healthy");
}

#[tokio::test]
async fn test_unknown_session_is_invalid_request() {
    let h = harness();

    let reply = h.rpc("not-a-session", "tools/list", json!({})).await;

    assert_eq!(error_code(&reply), Some(-32600));
    assert!(reply["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not-a-session"));
}

#[tokio::test]
async fn test_unsupported_method() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "logging/setLevel", json!({ "level": "info" }))
        .await;

    assert_eq!(error_code(&reply), Some(-32601));
}

#[tokio::test]
async fn test_notifications_get_no_reply() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);
    let message = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }))
    .unwrap();

    let reply = h.dispatcher.handle_message(session.id(), message).await;

    assert!(reply.is_none());
}

#[tokio::test]
async fn test_tools_list() {
    let h = harness();
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "tools/list", json!({})).await;

    let mut names: Vec<&str> = reply["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "aggregate",
            "count",
            "listCollections",
            "listConnections",
            "listTables",
            "query",
            "sampleData"
        ]
    );
}
