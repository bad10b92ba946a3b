//! MCP protocol handling
//!
//! Architecture:
//! - `request`: typed requests and tool-call validation
//! - `catalog`: static tool, prompt and template declarations
//! - `dispatcher`: per-session request routing
//! - `tools`: tool execution against pooled stores and the backend

pub mod catalog;
pub mod dispatcher;
pub mod request;
pub mod tools;

pub use dispatcher::{error_data, McpDispatcher};
pub use request::{coerce_object_id, McpRequest, ToolCall};
pub use tools::ToolExecutor;
