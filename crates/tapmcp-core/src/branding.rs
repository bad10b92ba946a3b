//! Centralized branding constants
//!
//! All product naming and well-known endpoints come from this module.
//!
//! # Usage
//!
//! ```rust
//! use tapmcp_core::branding;
//!
//! println!("App: {}", branding::DISPLAY_NAME);
//! let uri = branding::resource_uri("64f1a2", None); // "tap://64f1a2"
//! ```

/// Server name reported in the MCP initialize handshake
pub const SERVER_NAME: &str = "tapmcp-server";

/// Human readable product name
pub const DISPLAY_NAME: &str = "TapData MCP Server";

/// Short description reported to clients
pub const DESCRIPTION: &str =
    "This is an MCP-Server adapter provided by TapData for use with LLM's.";

/// URI scheme used for connection and table resources
pub const RESOURCE_SCHEME: &str = "tap";

/// Log file prefix (files are named `tapmcp.YYYY-MM-DD.log`)
pub const LOG_PREFIX: &str = "tapmcp";

/// Default port for the SSE gateway
pub const DEFAULT_GATEWAY_PORT: u16 = 3001;

/// Default base URL of the TapData management backend
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Path clients POST protocol messages to
pub const MESSAGE_ENDPOINT: &str = "/messages";

/// Build a resource URI for a connection, or for a table inside it
///
/// # Example
/// ```ignore
/// let uri = branding::resource_uri("c1", Some("t1"));
/// // Returns: "tap://c1/t1"
/// ```
pub fn resource_uri(connection_id: &str, table_id: Option<&str>) -> String {
    match table_id {
        Some(table_id) => format!("{}://{}/{}", RESOURCE_SCHEME, connection_id, table_id),
        None => format!("{}://{}", RESOURCE_SCHEME, connection_id),
    }
}

/// URL the client must POST its messages to for the given session
pub fn message_endpoint_for(session_id: &str) -> String {
    format!("{}?sessionId={}", MESSAGE_ENDPOINT, session_id)
}
