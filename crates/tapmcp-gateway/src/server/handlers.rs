//! HTTP handlers for the message and health endpoints

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rmcp::model::ClientJsonRpcMessage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Body returned when a message cannot be routed to a session
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TransportError {
    pub code: String,
    pub message: String,
}

impl TransportError {
    fn not_found() -> Self {
        Self {
            code: "NotFoundTransport".to_string(),
            message: "Not connect before sending message".to_string(),
        }
    }

    fn missing_session_id() -> Self {
        Self {
            code: "InvalidRequest".to_string(),
            message: "Required parameter sessionId".to_string(),
        }
    }
}

/// Accept one client message for a session. Replies arrive on the stream.
pub async fn post_message(
    State(state): State<AppState>,
    Query(params): Query<MessageParams>,
    body: Bytes,
) -> Response {
    let Some(session_id) = params.session_id else {
        return (StatusCode::OK, Json(TransportError::missing_session_id())).into_response();
    };

    let session = match state.sessions.get(&session_id) {
        Ok(session) => session,
        Err(_) => {
            debug!(session_id = %session_id, "[Messages] Unknown session");
            return (StatusCode::OK, Json(TransportError::not_found())).into_response();
        }
    };

    let message: ClientJsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(session_id = %session_id, "[Messages] Invalid message: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e)).into_response();
        }
    };

    match session.transport().deliver(&session_id, message).await {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(_) => (StatusCode::OK, Json(TransportError::not_found())).into_response(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Live session ids
    pub transport: Vec<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut transport = state.sessions.session_ids();
    transport.sort();
    Json(HealthResponse { transport })
}
