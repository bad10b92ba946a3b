//! Backend services
//!
//! `BackendGateway` is the seam to the TapData management API. The REST
//! implementation lives in `backend_client`; tests substitute in-memory mocks.

mod backend_client;

pub use backend_client::{BackendClient, BackendStatusError, DEFAULT_CONNECTION_PAGE_SIZE};

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Connection, UserToken};

/// Authenticated calls against the management backend
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Exchange a client access code for a session access token.
    ///
    /// `Ok(None)` means the backend rejected the code; errors are reserved
    /// for failures to reach or understand the backend.
    async fn login(&self, access_code: &str) -> Result<Option<UserToken>>;

    /// True when the backend reports itself healthy for this token
    async fn health(&self, access_token: &str) -> Result<bool>;

    /// Ready connections, narrowed to `tags` when any are given
    async fn list_connections(&self, access_token: &str, tags: &[String])
        -> Result<Vec<Connection>>;

    /// Single connection including its loaded schema and database config
    async fn get_connection(&self, connection_id: &str, access_token: &str) -> Result<Connection>;

    /// Sampled rows of one table, fetched through the backend's proxy call
    async fn sample_data(
        &self,
        connection_id: &str,
        table_name: &str,
        access_token: &str,
    ) -> Result<Vec<serde_json::Value>>;
}
