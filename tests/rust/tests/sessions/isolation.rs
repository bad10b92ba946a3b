//! Per-session state does not leak between sessions

use pretty_assertions::assert_eq;
use serde_json::json;
use tapmcp_gateway::mcp::request::{TOOL_COUNT, TOOL_QUERY};
use tests::fixtures::{connection, orders_connection};
use tests::{GatewayHarness, MockBackend};

fn harness() -> GatewayHarness {
    GatewayHarness::new(
        MockBackend::new()
            .with_connection(orders_connection())
            .with_connection(connection("c2", "billing", vec![])),
    )
}

#[tokio::test]
async fn test_sessions_track_their_own_connections() {
    let h = harness();
    let (s1, _r1) = h.open_session("token-1", &[]);
    let (s2, _r2) = h.open_session("token-2", &[]);

    h.execute(&s1, TOOL_QUERY, json!({ "connectionId": "c1", "collectionName": "orders" }))
        .await
        .unwrap();
    h.execute(&s2, TOOL_COUNT, json!({ "connectionId": "c2", "collectionName": "invoices" }))
        .await
        .unwrap();
    h.execute(&s2, TOOL_COUNT, json!({ "connectionId": "c2", "collectionName": "invoices" }))
        .await
        .unwrap();

    assert_eq!(s1.connection_ids(), vec!["c1"]);
    assert_eq!(s2.connection_ids(), vec!["c2"]);

    h.sessions.destroy(s1.id()).await;
    assert!(!h.pool.contains("c1"));
    assert!(h.pool.contains("c2"));
}

#[tokio::test]
async fn test_tag_filter_follows_session() {
    let h = harness();
    let (sales, _r1) = h.open_session("token-1", &["sales", "prod"]);
    let (all, _r2) = h.open_session("token-2", &[]);

    h.rpc(sales.id(), "resources/list", json!({})).await;
    h.rpc(all.id(), "resources/list", json!({})).await;

    assert_eq!(
        h.backend.listed_tags(),
        vec![vec!["sales".to_string(), "prod".to_string()], vec![]]
    );
}

#[tokio::test]
async fn test_destroying_one_session_keeps_the_other() {
    let h = harness();
    let (s1, _r1) = h.open_session("token-1", &[]);
    let (s2, _r2) = h.open_session("token-2", &[]);

    h.sessions.destroy(s1.id()).await;

    assert!(h.sessions.get(s2.id()).is_ok());
    assert!(!s2.is_closed());
    assert!(!s2.transport().cancellation().is_cancelled());
}
