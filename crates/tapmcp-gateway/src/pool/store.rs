//! Document store seam.
//!
//! The pool owns `DocumentStore` handles produced by a `StoreConnector`.
//! Results leave the store as relaxed extended JSON so the tool layer never
//! sees driver types.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::Document;
use serde_json::Value;
use tapmcp_core::ConnectionConfig;

/// Default number of documents returned by a find
pub const DEFAULT_FIND_LIMIT: i64 = 100;

/// A find against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    pub projection: Option<Document>,
    pub limit: i64,
}

impl FindQuery {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            projection: None,
            limit: DEFAULT_FIND_LIMIT,
        }
    }
}

/// Index hint for a count, either a key pattern or an index name
#[derive(Debug, Clone, PartialEq)]
pub enum CountHint {
    Keys(Document),
    Name(String),
}

/// Optional count settings; absent fields are left out of the driver call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountParams {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub hint: Option<CountHint>,
    pub read_concern: Option<String>,
    pub max_time: Option<Duration>,
    pub collation: Option<Document>,
}

/// Live handle to one database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collections in the database, as full specifications or bare names
    async fn list_collections(&self, filter: Option<Document>, name_only: bool)
        -> Result<Vec<Value>>;

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>>;

    async fn explain_find(&self, collection: &str, query: &FindQuery) -> Result<Value>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Value>>;

    async fn explain_aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Value>;

    async fn count(&self, collection: &str, filter: Document, params: &CountParams) -> Result<u64>;

    /// Shut the underlying client down
    async fn close(&self) -> Result<()>;
}

/// Opens new store handles for the pool
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        connection_id: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentStore>>;
}
