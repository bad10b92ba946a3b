//! One-line summaries of JSON-RPC payloads

use serde_json::Value;

/// Result keys reported by item count
const LISTINGS: &[&str] = &[
    "tools",
    "resources",
    "resourceTemplates",
    "prompts",
    "contents",
    "messages",
];

/// `method` of a posted JSON-RPC message
pub fn rpc_method(body: &[u8]) -> Option<String> {
    let message: Value = serde_json::from_slice(body).ok()?;
    message.get("method")?.as_str().map(str::to_owned)
}

pub fn reply_summary(reply: &Value) -> String {
    if let Some(error) = reply.get("error") {
        return format!(
            "error {} {}",
            error["code"],
            error["message"].as_str().unwrap_or_default()
        );
    }

    let Some(result) = reply.get("result") else {
        return "no result".to_string();
    };

    if let Some(server) = result.get("serverInfo") {
        return format!(
            "initialized {} {}",
            server["name"].as_str().unwrap_or("?"),
            result["protocolVersion"].as_str().unwrap_or("?")
        );
    }

    if let Some(content) = result.get("content").and_then(Value::as_array) {
        let outcome = if result["isError"] == Value::Bool(true) {
            "failed"
        } else {
            "ok"
        };
        return format!("tool {} ({} blocks)", outcome, content.len());
    }

    LISTINGS
        .iter()
        .find_map(|key| {
            let items = result.get(*key)?.as_array()?;
            Some(format!("{} x{}", key, items.len()))
        })
        .unwrap_or_else(|| "ok".to_string())
}
