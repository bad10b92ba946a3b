//! SSE stream endpoint
//!
//! `GET /sse` authenticates the client, registers a session and keeps the
//! stream open. The first event names the endpoint the client must post its
//! messages to; every reply follows as a `message` event. Dropping the
//! stream destroys the session.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use serde::Deserialize;
use tapmcp_core::branding;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::logging::reply_summary;
use crate::mcp::McpDispatcher;
use crate::session::{SessionRegistry, SessionTransport};

/// Messages queued for a session before posting blocks
const INBOUND_CAPACITY: usize = 64;
/// Replies queued for the stream before handlers block
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    #[serde(rename = "accessCode")]
    pub access_code: Option<String>,
    /// Comma-separated tag filter
    pub tags: Option<String>,
}

/// Bearer credential from the Authorization header, else the `accessCode`
/// query parameter. Other authorization schemes are ignored.
pub fn extract_access_code(headers: &HeaderMap, params: &StreamParams) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let mut parts = value.split(' ');
            match (parts.next(), parts.next()) {
                (Some("Bearer"), Some(credentials)) if !credentials.is_empty() => {
                    Some(credentials.to_string())
                }
                _ => None,
            }
        });

    bearer.or_else(|| params.access_code.clone().filter(|code| !code.is_empty()))
}

pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|tags| {
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Not authorized").into_response()
}

pub async fn sse_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<StreamParams>,
) -> Response {
    let Some(access_code) = extract_access_code(&headers, &params) else {
        warn!("[SSE] No access code; expected 'Authorization: Bearer <code>' or ?accessCode=");
        return unauthorized();
    };

    let token = match state.backend.login(&access_code).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            warn!("[SSE] Access code rejected by backend");
            return unauthorized();
        }
        Err(e) => {
            warn!("[SSE] Login failed: {:#}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("Server Error: {:#}", e))
                .into_response();
        }
    };

    let (transport, inbound) = SessionTransport::channel(INBOUND_CAPACITY);
    let cancel = transport.cancellation();
    let session = state
        .sessions
        .create(token, parse_tags(params.tags.as_deref()), transport);
    let session_id = session.id().to_string();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerJsonRpcMessage>(OUTBOUND_CAPACITY);
    tokio::spawn(run_session(
        state.dispatcher.clone(),
        session_id.clone(),
        inbound,
        cancel,
        outbound_tx,
    ));

    let guard = SessionGuard {
        sessions: state.sessions.clone(),
        session_id: session_id.clone(),
    };
    let endpoint = branding::message_endpoint_for(&session_id);

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<Event, Infallible>(Event::default().event("endpoint").data(endpoint));

        while let Some(reply) = outbound_rx.recv().await {
            match serde_json::to_value(&reply) {
                Ok(json) => {
                    debug!(session_id = %session_id, reply = %reply_summary(&json), "[SSE] Reply");
                    yield Ok(Event::default().event("message").data(json.to_string()));
                }
                Err(e) => warn!(session_id = %session_id, "[SSE] Failed to encode reply: {}", e),
            }
        }
        debug!(session_id = %session_id, "[SSE] Stream finished");
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.sse_keep_alive))
        .into_response()
}

/// Per-session task loop. Each request runs on its own task so slow tool
/// calls do not hold up the rest of the session.
async fn run_session(
    dispatcher: Arc<McpDispatcher>,
    session_id: String,
    mut inbound: mpsc::Receiver<ClientJsonRpcMessage>,
    cancel: CancellationToken,
    outbound: mpsc::Sender<ServerJsonRpcMessage>,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = inbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let dispatcher = dispatcher.clone();
        let outbound = outbound.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            if let Some(reply) = dispatcher.handle_message(&session_id, message).await {
                if outbound.send(reply).await.is_err() {
                    debug!(session_id = %session_id, "[SSE] Stream closed before reply");
                }
            }
        });
    }
    debug!(session_id = %session_id, "[SSE] Session loop stopped");
}

/// Destroys the session when the response stream is dropped
struct SessionGuard {
    sessions: Arc<SessionRegistry>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = std::mem::take(&mut self.session_id);
        info!(session_id = %session_id, "[SSE] Client disconnected");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { sessions.destroy(&session_id).await });
            }
            Err(_) => warn!(session_id = %session_id, "[SSE] No runtime to destroy session"),
        }
    }
}
