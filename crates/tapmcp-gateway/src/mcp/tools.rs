//! Tool Executor
//!
//! Runs validated tool calls for a session. Database tools reacquire their
//! store from the pool on every call and record the connection id on the
//! session so it is released when the session closes.

use std::sync::Arc;

use serde_json::{json, Value};
use tapmcp_core::{AdapterError, AdapterResult, BackendGateway, SchemaMapper};
use tracing::{debug, info, warn};

use super::request::{is_system_collection, ToolCall};
use crate::pool::{ConnectionPool, DocumentStore};
use crate::session::Session;

pub struct ToolExecutor {
    backend: Arc<dyn BackendGateway>,
    pool: Arc<ConnectionPool>,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn BackendGateway>, pool: Arc<ConnectionPool>) -> Self {
        Self { backend, pool }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub async fn execute(&self, session: &Session, call: ToolCall) -> AdapterResult<Value> {
        let tool = call.name();
        info!(session_id = %session.id(), tool = %tool, "[Tools] Executing");

        match call {
            ToolCall::ListConnections => self.list_connections(session).await,

            ToolCall::ListTables { connection_id } => {
                let connection = self
                    .backend
                    .get_connection(&connection_id, session.access_token())
                    .await
                    .map_err(|e| AdapterError::query_execution(tool, &connection_id, e))?;
                let tables: Vec<_> = connection
                    .tables()
                    .iter()
                    .map(SchemaMapper::table_summary)
                    .collect();
                Ok(json!(tables))
            }

            ToolCall::SampleData {
                connection_id,
                table_name,
            } => {
                let rows = self
                    .backend
                    .sample_data(&connection_id, &table_name, session.access_token())
                    .await
                    .map_err(|e| AdapterError::query_execution(tool, &table_name, e))?;
                Ok(Value::Array(rows))
            }

            ToolCall::ListCollections {
                connection_id,
                filter,
                name_only,
            } => {
                let store = self.open_store(session, tool, &connection_id).await?;
                let collections = store
                    .list_collections(filter, name_only)
                    .await
                    .map_err(|e| AdapterError::query_execution(tool, &connection_id, e))?;
                Ok(Value::Array(collections))
            }

            ToolCall::Query {
                connection_id,
                collection,
                query,
                explain,
            } => {
                deny_system_collection(&collection)?;
                let store = self.open_store(session, tool, &connection_id).await?;
                let result = if explain {
                    store.explain_find(&collection, &query).await
                } else {
                    store.find(&collection, &query).await.map(Value::Array)
                };
                result.map_err(|e| AdapterError::query_execution(tool, &collection, e))
            }

            ToolCall::Aggregate {
                connection_id,
                collection,
                pipeline,
                explain,
            } => {
                deny_system_collection(&collection)?;
                let store = self.open_store(session, tool, &connection_id).await?;
                let result = if explain {
                    store.explain_aggregate(&collection, pipeline).await
                } else {
                    store.aggregate(&collection, pipeline).await.map(Value::Array)
                };
                result.map_err(|e| AdapterError::query_execution(tool, &collection, e))
            }

            ToolCall::Count {
                connection_id,
                collection,
                filter,
                params,
            } => {
                deny_system_collection(&collection)?;
                let store = self.open_store(session, tool, &connection_id).await?;
                let count = store
                    .count(&collection, filter, &params)
                    .await
                    .map_err(|e| AdapterError::query_execution(tool, &collection, e))?;
                Ok(json!({ "count": count, "ok": 1 }))
            }
        }
    }

    /// Flat connection schemas visible to the session's tag filter. Backend
    /// failures degrade to an empty list.
    async fn list_connections(&self, session: &Session) -> AdapterResult<Value> {
        match self
            .backend
            .list_connections(session.access_token(), session.tags())
            .await
        {
            Ok(connections) => Ok(json!(connections
                .iter()
                .map(SchemaMapper::connection_summary)
                .collect::<Vec<_>>())),
            Err(e) => {
                warn!(session_id = %session.id(), "[Tools] Listing connections failed: {:#}", e);
                Ok(json!([]))
            }
        }
    }

    async fn open_store(
        &self,
        session: &Session,
        tool: &str,
        connection_id: &str,
    ) -> AdapterResult<Arc<dyn DocumentStore>> {
        let connection = self
            .backend
            .get_connection(connection_id, session.access_token())
            .await
            .map_err(|e| AdapterError::query_execution(tool, connection_id, e))?;

        let config = connection.config.as_ref().ok_or_else(|| {
            AdapterError::Backend(format!("Connection '{}' has no database config", connection_id))
        })?;

        let store = self
            .pool
            .get_or_create(session.id(), connection_id, config)
            .await
            .map_err(|e| AdapterError::query_execution(tool, connection_id, e))?;

        match session.track_connection(connection_id) {
            Ok(true) => debug!(
                session_id = %session.id(),
                connection_id = %connection_id,
                "[Tools] Connection recorded on session"
            ),
            Ok(false) => {}
            Err(e) => {
                // Session closed while connecting; drop the hold it just took
                self.pool
                    .release(session.id(), &[connection_id.to_string()])
                    .await;
                return Err(e);
            }
        }
        Ok(store)
    }
}

fn deny_system_collection(collection: &str) -> AdapterResult<()> {
    if is_system_collection(collection) {
        return Err(AdapterError::AccessDenied(collection.to_string()));
    }
    Ok(())
}
