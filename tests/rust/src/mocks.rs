//! Mock backend and document store implementations for testing
//!
//! In-memory stand-ins for the management backend and the database driver,
//! recording every call so tests can assert on what reached them.

use async_trait::async_trait;
use mongodb::bson::Document;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Barrier;

use tapmcp_core::{BackendGateway, Connection, ConnectionConfig, UserToken};
use tapmcp_gateway::pool::{CountParams, DocumentStore, FindQuery, StoreConnector};

// ============================================================================
// MockBackend
// ============================================================================

/// In-memory management backend.
///
/// Access codes map to tokens; connections are served by id. Every token is
/// accepted for data calls.
pub struct MockBackend {
    tokens: RwLock<HashMap<String, UserToken>>,
    connections: RwLock<Vec<Connection>>,
    samples: RwLock<HashMap<(String, String), Vec<Value>>>,
    healthy: AtomicBool,
    fail_login: AtomicBool,
    fail_listing: AtomicBool,
    fail_lookup: AtomicBool,
    listed_tags: RwLock<Vec<Vec<String>>>,
    lookups: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            connections: RwLock::new(Vec::new()),
            samples: RwLock::new(HashMap::new()),
            healthy: AtomicBool::new(true),
            fail_login: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
            listed_tags: RwLock::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access_code(self, code: &str, token: UserToken) -> Self {
        self.tokens.write().unwrap().insert(code.to_string(), token);
        self
    }

    pub fn with_connection(self, connection: Connection) -> Self {
        self.connections.write().unwrap().push(connection);
        self
    }

    pub fn with_sample(self, connection_id: &str, table_name: &str, rows: Vec<Value>) -> Self {
        self.samples.write().unwrap().insert(
            (connection_id.to_string(), table_name.to_string()),
            rows,
        );
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make login fail as if the backend were unreachable
    pub fn set_login_failing(&self, failing: bool) {
        self.fail_login.store(failing, Ordering::SeqCst);
    }

    pub fn set_listing_failing(&self, failing: bool) {
        self.fail_listing.store(failing, Ordering::SeqCst);
    }

    pub fn set_lookup_failing(&self, failing: bool) {
        self.fail_lookup.store(failing, Ordering::SeqCst);
    }

    /// Tag filters passed to each `list_connections` call, in order
    pub fn listed_tags(&self) -> Vec<Vec<String>> {
        self.listed_tags.read().unwrap().clone()
    }

    /// Number of `get_connection` calls
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendGateway for MockBackend {
    async fn login(&self, access_code: &str) -> anyhow::Result<Option<UserToken>> {
        if self.fail_login.load(Ordering::SeqCst) {
            anyhow::bail!("Failed to send request to /api/users/generatetoken");
        }
        Ok(self.tokens.read().unwrap().get(access_code).cloned())
    }

    async fn health(&self, _access_token: &str) -> anyhow::Result<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn list_connections(
        &self,
        _access_token: &str,
        tags: &[String],
    ) -> anyhow::Result<Vec<Connection>> {
        self.listed_tags.write().unwrap().push(tags.to_vec());
        if self.fail_listing.load(Ordering::SeqCst) {
            anyhow::bail!("Failed to list connections");
        }
        Ok(self.connections.read().unwrap().clone())
    }

    async fn get_connection(
        &self,
        connection_id: &str,
        _access_token: &str,
    ) -> anyhow::Result<Connection> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            anyhow::bail!("Failed to load connection {}", connection_id);
        }
        self.connections
            .read()
            .unwrap()
            .iter()
            .find(|c| c.id == connection_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Connection {} not found", connection_id))
    }

    async fn sample_data(
        &self,
        connection_id: &str,
        table_name: &str,
        _access_token: &str,
    ) -> anyhow::Result<Vec<Value>> {
        Ok(self
            .samples
            .read()
            .unwrap()
            .get(&(connection_id.to_string(), table_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// MockStore
// ============================================================================

/// One recorded store operation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListCollections {
        filter: Option<Document>,
        name_only: bool,
    },
    Find {
        collection: String,
        query: FindQuery,
    },
    ExplainFind {
        collection: String,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    ExplainAggregate {
        collection: String,
    },
    Count {
        collection: String,
        filter: Document,
        params: CountParams,
    },
}

/// Store handle that records calls and answers with canned results
pub struct MockStore {
    connection_id: String,
    count: u64,
    calls: Mutex<Vec<StoreCall>>,
    closed: AtomicBool,
}

impl MockStore {
    pub fn new(connection_id: &str) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            count: 42,
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: StoreCall) -> anyhow::Result<()> {
        if self.is_closed() {
            anyhow::bail!("Client for {} is closed", self.connection_id);
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn list_collections(
        &self,
        filter: Option<Document>,
        name_only: bool,
    ) -> anyhow::Result<Vec<Value>> {
        self.record(StoreCall::ListCollections { filter, name_only })?;
        if name_only {
            Ok(vec![json!("orders"), json!("customers")])
        } else {
            Ok(vec![
                json!({ "name": "orders", "type": "collection" }),
                json!({ "name": "customers", "type": "collection" }),
            ])
        }
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> anyhow::Result<Vec<Value>> {
        self.record(StoreCall::Find {
            collection: collection.to_string(),
            query: query.clone(),
        })?;
        Ok(vec![json!({ "_id": { "$oid": "507f1f77bcf86cd799439011" }, "total": 12.5 })])
    }

    async fn explain_find(&self, collection: &str, _query: &FindQuery) -> anyhow::Result<Value> {
        self.record(StoreCall::ExplainFind {
            collection: collection.to_string(),
        })?;
        Ok(json!({ "queryPlanner": { "winningPlan": { "stage": "COLLSCAN" } } }))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> anyhow::Result<Vec<Value>> {
        self.record(StoreCall::Aggregate {
            collection: collection.to_string(),
            pipeline,
        })?;
        Ok(vec![json!({ "_id": "paid", "n": 3 })])
    }

    async fn explain_aggregate(
        &self,
        collection: &str,
        _pipeline: Vec<Document>,
    ) -> anyhow::Result<Value> {
        self.record(StoreCall::ExplainAggregate {
            collection: collection.to_string(),
        })?;
        Ok(json!({ "stages": [] }))
    }

    async fn count(
        &self,
        collection: &str,
        filter: Document,
        params: &CountParams,
    ) -> anyhow::Result<u64> {
        self.record(StoreCall::Count {
            collection: collection.to_string(),
            filter,
            params: params.clone(),
        })?;
        Ok(self.count)
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Connector handing out `MockStore`s.
///
/// With a barrier set, every connect waits on it before returning, which
/// lets tests line up concurrent opens of the same connection id.
#[derive(Default)]
pub struct MockConnector {
    stores: Mutex<Vec<Arc<MockStore>>>,
    connects: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
    fail: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_barrier(parties: usize) -> Self {
        Self {
            barrier: Some(Arc::new(Barrier::new(parties))),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Every store opened so far, in connect order
    pub fn stores(&self) -> Vec<Arc<MockStore>> {
        self.stores.lock().unwrap().clone()
    }

    /// Stores opened for one connection id
    pub fn stores_for(&self, connection_id: &str) -> Vec<Arc<MockStore>> {
        self.stores()
            .into_iter()
            .filter(|s| s.connection_id() == connection_id)
            .collect()
    }

    pub fn closed_count(&self) -> usize {
        self.stores().iter().filter(|s| s.is_closed()).count()
    }
}

#[async_trait]
impl StoreConnector for MockConnector {
    async fn connect(
        &self,
        connection_id: &str,
        _config: &ConnectionConfig,
    ) -> anyhow::Result<Arc<dyn DocumentStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("Server selection timeout for {}", connection_id);
        }

        let store = Arc::new(MockStore::new(connection_id));
        self.stores.lock().unwrap().push(store.clone());
        Ok(store)
    }
}
