//! REST client for the TapData management backend.
//!
//! Every response is wrapped in an envelope `{code, message, data, reqId}`.
//! A 200 response whose `code` is not `"ok"` is a failure named by `code`.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::BackendGateway;
use crate::domain::{Connection, UserToken};

/// Page size used when listing connections
pub const DEFAULT_CONNECTION_PAGE_SIZE: u32 = 10;

const PROXY_CLASS: &str = "QueryDataBaseDataService";
const PROXY_METHOD: &str = "getData";

/// Response wrapper used by every backend endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
    #[serde(rename = "reqId", default)]
    req_id: Option<String>,
}

impl<T> Envelope<T> {
    fn is_ok(&self) -> bool {
        self.code == "ok"
    }

    fn into_data(self) -> Result<Option<T>> {
        if !self.is_ok() {
            anyhow::bail!(
                "{}: {}",
                self.code,
                self.message.unwrap_or_default()
            );
        }
        Ok(self.data)
    }
}

/// Non-2xx HTTP status from the backend
#[derive(Debug, thiserror::Error)]
#[error("Backend returned status {status} for {path}")]
pub struct BackendStatusError {
    pub status: u16,
    pub path: String,
}

impl BackendStatusError {
    /// The backend refused the credential rather than failing
    pub fn is_rejection(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProxyResult {
    #[serde(rename = "sampleData", default)]
    sample_data: Vec<Value>,
}

/// Client for the management backend REST API
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    /// Create a client with a uniform request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tapmcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Envelope<T>> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let mut request = self.client.request(method.clone(), &url).query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                "[backend] {} {} {} {}ms",
                method,
                path,
                status.as_u16(),
                started.elapsed().as_millis()
            );
            return Err(BackendStatusError {
                status: status.as_u16(),
                path: path.to_string(),
            }
            .into());
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;

        debug!(
            "[backend] {} {} {} {}ms {} {}",
            method,
            path,
            status.as_u16(),
            started.elapsed().as_millis(),
            envelope.code,
            envelope.req_id.as_deref().unwrap_or("-")
        );

        Ok(envelope)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<T>> {
        self.envelope(method, path, query, body).await?.into_data()
    }
}

/// Loopback-style filter selecting ready connections, optionally by tag
fn connection_filter(tags: &[String], limit: u32) -> Value {
    let mut filter = json!({
        "where": { "status": "ready" },
        "limit": limit,
    });
    if !tags.is_empty() {
        filter["where"]["listtags.value"] = json!({ "inq": tags });
    }
    filter
}

#[async_trait]
impl BackendGateway for BackendClient {
    async fn login(&self, access_code: &str) -> Result<Option<UserToken>> {
        let envelope = self
            .envelope::<UserToken>(
                Method::POST,
                "/api/users/generatetoken",
                &[],
                Some(json!({ "accesscode": access_code })),
            )
            .await;

        match envelope {
            Ok(envelope) if envelope.is_ok() => Ok(envelope.data),
            Ok(envelope) => {
                warn!("[backend] Access code rejected: {}", envelope.code);
                Ok(None)
            }
            Err(e)
                if e
                    .downcast_ref::<BackendStatusError>()
                    .is_some_and(BackendStatusError::is_rejection) =>
            {
                warn!("[backend] Access code rejected: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.context("Login failed")),
        }
    }

    async fn health(&self, access_token: &str) -> Result<bool> {
        let envelope: Envelope<Value> = self
            .envelope(
                Method::GET,
                "/health",
                &[("access_token", access_token.to_string())],
                None,
            )
            .await?;

        if !envelope.is_ok() {
            warn!("[backend] Health check reported {}", envelope.code);
        }
        Ok(envelope.is_ok())
    }

    async fn list_connections(
        &self,
        access_token: &str,
        tags: &[String],
    ) -> Result<Vec<Connection>> {
        let filter = connection_filter(tags, DEFAULT_CONNECTION_PAGE_SIZE);
        let page: Option<Page<Connection>> = self
            .call(
                Method::GET,
                "/api/Connections",
                &[
                    ("access_token", access_token.to_string()),
                    ("noSchema", "false".to_string()),
                    ("filter", filter.to_string()),
                ],
                None,
            )
            .await
            .context("Failed to list connections")?;

        Ok(page.map(|p| p.items).unwrap_or_default())
    }

    async fn get_connection(&self, connection_id: &str, access_token: &str) -> Result<Connection> {
        let path = format!("/api/Connections/{}", urlencoding::encode(connection_id));
        let connection: Option<Connection> = self
            .call(
                Method::GET,
                &path,
                &[("access_token", access_token.to_string())],
                None,
            )
            .await
            .with_context(|| format!("Failed to load connection {}", connection_id))?;

        connection.with_context(|| format!("Connection {} not found", connection_id))
    }

    async fn sample_data(
        &self,
        connection_id: &str,
        table_name: &str,
        access_token: &str,
    ) -> Result<Vec<Value>> {
        let result: Option<ProxyResult> = self
            .call(
                Method::POST,
                "/api/proxy/call",
                &[("access_token", access_token.to_string())],
                Some(json!({
                    "className": PROXY_CLASS,
                    "method": PROXY_METHOD,
                    "args": [connection_id, table_name],
                })),
            )
            .await
            .with_context(|| format!("Failed to sample {}", table_name))?;

        Ok(result.map(|r| r.sample_data).unwrap_or_default())
    }
}
