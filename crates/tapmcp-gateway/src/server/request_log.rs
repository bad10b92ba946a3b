//! Per-request logging for the HTTP surface.
//!
//! Posted messages are read up front so their JSON-RPC method can be logged,
//! then handed on unchanged. Responses pass through untouched since the
//! stream endpoint stays open for the life of the client.

use axum::{
    body::{self, Body},
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn, Instrument};

use crate::logging::{rpc_method, RequestTrace};

/// Largest message body accepted on the message endpoint
const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Query parameters that carry credentials
const CREDENTIAL_PARAMS: &[&str] = &["accessCode", "access_token"];

/// Query string with credential values replaced
pub fn redact_query(query: &str) -> String {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            if CREDENTIAL_PARAMS.contains(&key.as_ref()) {
                format!("{}=[REDACTED]", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `sessionId` query parameter, if present
pub fn session_id_from_query(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "sessionId")
        .map(|(_, value)| value.into_owned())
}

/// Where a stream request carried its access code
fn credential_source(headers: &HeaderMap, query: Option<&str>) -> &'static str {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "));
    if bearer {
        return "bearer";
    }

    let in_query = query.is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "accessCode")
    });
    if in_query {
        "query"
    } else {
        "none"
    }
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let query = request.uri().query().map(str::to_owned);
    let mut trace = RequestTrace::begin(
        request.method().as_str(),
        request.uri().path(),
        session_id_from_query(query.as_deref()),
    );
    let span = trace.span();

    async move {
        if let Some(query) = &query {
            debug!(query = %redact_query(query), "Query");
        }
        if request.method() == Method::GET && request.uri().path() == "/sse" {
            debug!(
                credential = credential_source(request.headers(), query.as_deref()),
                "Stream credential"
            );
        }

        let request = if request.method() == Method::POST {
            let (parts, body) = request.into_parts();
            let bytes = match body::to_bytes(body, MAX_MESSAGE_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read message body: {}", e);
                    return (StatusCode::BAD_REQUEST, "Failed to read message body")
                        .into_response();
                }
            };
            trace.set_rpc_method(rpc_method(&bytes));
            Request::from_parts(parts, Body::from(bytes))
        } else {
            request
        };

        trace.received();
        let response = next.run(request).await;
        trace.completed(response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}
