//! Prompt listing and rendering

use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{GatewayHarness, MockBackend};

use super::error_code;

#[tokio::test]
async fn test_list_prompts() {
    let h = GatewayHarness::new(MockBackend::new());
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h.rpc(session.id(), "prompts/list", json!({})).await;

    let prompts = reply["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["name"], "analyze_table");
    let args: Vec<&str> = prompts[0]["arguments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(args, vec!["connectionId", "tableId"]);
}

#[tokio::test]
async fn test_get_prompt() {
    let h = GatewayHarness::new(MockBackend::new());
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(
            session.id(),
            "prompts/get",
            json!({
                "name": "analyze_table",
                "arguments": { "connectionId": "c1", "tableId": "t1" }
            }),
        )
        .await;

    let messages = reply["result"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert!(messages[0]["content"]["text"]
        .as_str()
        .unwrap()
        .starts_with("Please analyze the following table:\nTable name: t1"));
}

#[tokio::test]
async fn test_get_prompt_missing_argument() {
    let h = GatewayHarness::new(MockBackend::new());
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(
            session.id(),
            "prompts/get",
            json!({ "name": "analyze_table", "arguments": { "connectionId": "c1" } }),
        )
        .await;

    assert_eq!(error_code(&reply), Some(-32602));
    assert_eq!(reply["error"]["message"], "Prompt argument 'tableId' is required");
}

#[tokio::test]
async fn test_get_unknown_prompt() {
    let h = GatewayHarness::new(MockBackend::new());
    let (session, _inbound) = h.open_session("token-1", &[]);

    let reply = h
        .rpc(session.id(), "prompts/get", json!({ "name": "summarize" }))
        .await;

    assert_eq!(error_code(&reply), Some(-32602));
}
