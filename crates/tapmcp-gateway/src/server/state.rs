//! Shared state handed to every HTTP handler

use std::sync::Arc;
use std::time::Duration;

use tapmcp_core::BackendGateway;

use crate::mcp::McpDispatcher;
use crate::pool::ConnectionPool;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub pool: Arc<ConnectionPool>,
    pub dispatcher: Arc<McpDispatcher>,
    pub backend: Arc<dyn BackendGateway>,
    pub sse_keep_alive: Duration,
}
