//! Correlation for one HTTP request

use std::time::Instant;

use tracing::{info, info_span, Span};
use uuid::Uuid;

const TRACE_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct RequestTrace {
    id: String,
    method: String,
    path: String,
    session_id: Option<String>,
    rpc_method: Option<String>,
    started: Instant,
}

impl RequestTrace {
    pub fn begin(method: &str, path: &str, session_id: Option<String>) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(TRACE_ID_LEN);

        Self {
            id,
            method: method.to_string(),
            path: path.to_string(),
            session_id,
            rpc_method: None,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_rpc_method(&mut self, rpc_method: Option<String>) {
        self.rpc_method = rpc_method;
    }

    pub fn rpc_method(&self) -> Option<&str> {
        self.rpc_method.as_deref()
    }

    /// Leading 8 characters of the session id, or "-" outside a session
    pub fn session_label(&self) -> &str {
        match self.session_id.as_deref() {
            Some(id) => id.get(..8).unwrap_or(id),
            None => "-",
        }
    }

    /// Span carrying the trace and session into every log made while
    /// handling the request
    pub fn span(&self) -> Span {
        info_span!("http", trace = %self.id, session = %self.session_label())
    }

    pub fn received(&self) {
        match &self.rpc_method {
            Some(rpc) => info!("→ {} {} {}", self.method, self.path, rpc),
            None => info!("→ {} {}", self.method, self.path),
        }
    }

    pub fn completed(&self, status: u16) {
        info!("← {} ({}ms)", status, self.started.elapsed().as_millis());
    }
}
