//! Protocol dispatcher tests
//!
//! Requests go in as JSON-RPC messages and replies are checked in their
//! serialized form, as a client on the stream would see them.

mod prompts;
mod protocol;
mod resources;

use serde_json::Value;

/// JSON-RPC error code of a reply, if it is an error
pub fn error_code(reply: &Value) -> Option<i64> {
    reply["error"]["code"].as_i64()
}

/// First text block of a tool result
pub fn tool_text(reply: &Value) -> &str {
    reply["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("not a text tool result: {}", reply))
}

pub fn is_tool_error(reply: &Value) -> bool {
    reply["result"]["isError"] == Value::Bool(true)
}

/// Tool result text parsed back into JSON
pub fn tool_json(reply: &Value) -> Value {
    serde_json::from_str(tool_text(reply)).expect("tool result is JSON")
}
