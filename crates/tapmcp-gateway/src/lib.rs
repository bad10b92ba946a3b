//! TapData MCP Gateway
//!
//! Serves TapData connections to MCP clients:
//! - SSE stream plus message endpoint, one session per authenticated stream
//! - Connection pool sharing database clients across sessions
//! - Protocol dispatch for resources, tools and prompts
//! - Request logging with trace ids

pub mod logging;
pub mod mcp;
pub mod pool;
pub mod server;
pub mod session;

pub use mcp::{McpDispatcher, McpRequest, ToolCall, ToolExecutor};
pub use pool::{ConnectionPool, DocumentStore, MongoConnector, PoolStats, StoreConnector};
pub use server::{AppState, GatewayConfig, GatewayServer};
pub use session::{Session, SessionRegistry, SessionTransport};
