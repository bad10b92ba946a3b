//! Protocol Dispatcher
//!
//! Resolves the session a message belongs to, converts the request into an
//! `McpRequest` and routes it to its handler. Handlers receive the resolved
//! session explicitly; there is no ambient "current session".

use std::sync::Arc;

use rmcp::model::{
    AnnotateAble, CallToolResult, ClientJsonRpcMessage, ClientRequest, Content, ErrorCode,
    ErrorData, GetPromptResult, JsonRpcRequest, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, RawResource, ReadResourceResult, Resource,
    ResourceContents, ServerJsonRpcMessage, ServerResult,
};
use tapmcp_core::branding;
use tapmcp_core::{
    AdapterError, AdapterResult, BackendGateway, Connection, ResourceSchema, ResourceUri,
    SchemaMapper, Table,
};
use tracing::{debug, info, warn};

use super::catalog::{self, JSON_MIME_TYPE};
use super::request::{McpRequest, ToolCall};
use super::tools::ToolExecutor;
use crate::pool::ConnectionPool;
use crate::session::{Session, SessionRegistry};

pub struct McpDispatcher {
    sessions: Arc<SessionRegistry>,
    backend: Arc<dyn BackendGateway>,
    tools: ToolExecutor,
}

impl McpDispatcher {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        backend: Arc<dyn BackendGateway>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            sessions,
            tools: ToolExecutor::new(backend.clone(), pool),
            backend,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolExecutor {
        &self.tools
    }

    /// Handle one inbound message. Only requests produce a reply.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: ClientJsonRpcMessage,
    ) -> Option<ServerJsonRpcMessage> {
        match message {
            ClientJsonRpcMessage::Request(request) => {
                Some(self.handle_request(session_id, request).await)
            }
            ClientJsonRpcMessage::Notification(_) => {
                debug!(session_id = %session_id, "[Dispatch] Notification ignored");
                None
            }
            ClientJsonRpcMessage::Response(_) | ClientJsonRpcMessage::Error(_) => {
                debug!(session_id = %session_id, "[Dispatch] Unexpected client response ignored");
                None
            }
        }
    }

    pub async fn handle_request(
        &self,
        session_id: &str,
        request: JsonRpcRequest<ClientRequest>,
    ) -> ServerJsonRpcMessage {
        let JsonRpcRequest { id, request, .. } = request;
        let method = request.method().to_string();

        match self.process(session_id, request).await {
            Ok(result) => {
                debug!(session_id = %session_id, method = %method, "[Dispatch] Request handled");
                ServerJsonRpcMessage::response(result, id)
            }
            Err(e) => {
                warn!(session_id = %session_id, method = %method, "[Dispatch] Request failed: {}", e);
                ServerJsonRpcMessage::error(error_data(&e), id)
            }
        }
    }

    async fn process(&self, session_id: &str, request: ClientRequest) -> AdapterResult<ServerResult> {
        let session = self.sessions.get(session_id)?;
        let request = McpRequest::from_client(request)?;
        self.dispatch(&session, request).await
    }

    /// Run a typed request against a resolved session
    pub async fn dispatch(&self, session: &Session, request: McpRequest) -> AdapterResult<ServerResult> {
        match request {
            McpRequest::Initialize { protocol_version } => {
                let result = catalog::initialize_result(&protocol_version);
                info!(
                    session_id = %session.id(),
                    protocol_version = ?result.protocol_version,
                    "[Dispatch] Client initialized"
                );
                Ok(result.into())
            }
            McpRequest::Ping => self.ping(session).await,
            McpRequest::ListResources => Ok(ListResourcesResult::with_all_items(
                self.list_resources(session).await,
            )
            .into()),
            McpRequest::ReadResource { uri } => Ok(self.read_resource(session, uri).await?.into()),
            McpRequest::ListResourceTemplates => {
                Ok(ListResourceTemplatesResult::with_all_items(catalog::resource_templates()).into())
            }
            McpRequest::ListTools => Ok(ListToolsResult::with_all_items(catalog::tools()).into()),
            McpRequest::CallTool(call) => Ok(self.call_tool(session, call).await?.into()),
            McpRequest::ListPrompts => Ok(ListPromptsResult::with_all_items(catalog::prompts()).into()),
            McpRequest::GetPrompt { name, arguments } => Ok(GetPromptResult {
                description: None,
                messages: catalog::render_prompt(&name, &arguments)?,
            }
            .into()),
            McpRequest::Unsupported(method) => Err(AdapterError::UnsupportedMethod(method)),
        }
    }

    async fn ping(&self, session: &Session) -> AdapterResult<ServerResult> {
        match self.backend.health(session.access_token()).await {
            Ok(true) => Ok(ServerResult::empty(())),
            Ok(false) => Err(AdapterError::BackendUnhealthy),
            Err(e) => {
                warn!(session_id = %session.id(), "[Dispatch] Health check failed: {:#}", e);
                Err(AdapterError::BackendUnhealthy)
            }
        }
    }

    /// One resource per connection plus one per table. Backend failures
    /// yield an empty list.
    async fn list_resources(&self, session: &Session) -> Vec<Resource> {
        let connections = match self
            .backend
            .list_connections(session.access_token(), session.tags())
            .await
        {
            Ok(connections) => connections,
            Err(e) => {
                warn!(session_id = %session.id(), "[Dispatch] Listing resources failed: {:#}", e);
                return Vec::new();
            }
        };

        let mut resources = Vec::new();
        for connection in &connections {
            resources.push(connection_resource(connection));
            resources.extend(
                connection
                    .tables()
                    .iter()
                    .filter_map(|table| table_resource(connection, table)),
            );
        }
        resources
    }

    async fn read_resource(&self, session: &Session, uri: String) -> AdapterResult<ReadResourceResult> {
        let schema = match ResourceUri::parse(&uri) {
            None => ResourceSchema::unknown(),
            Some(parsed) => {
                let connection = self.fetch_connection(session, parsed.connection_id()).await;
                match parsed {
                    ResourceUri::Connection { .. } => {
                        ResourceSchema::Connection(SchemaMapper::connection(&connection))
                    }
                    ResourceUri::Table { table_id, .. } => {
                        let table = connection.find_table(&table_id).cloned().unwrap_or_default();
                        ResourceSchema::Table(SchemaMapper::table(&table))
                    }
                }
            }
        };

        let text = serde_json::to_string_pretty(&schema)
            .map_err(|e| AdapterError::Backend(format!("Failed to encode schema: {}", e)))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri,
                mime_type: Some(JSON_MIME_TYPE.to_string()),
                text,
                meta: None,
            }],
        })
    }

    /// Connection lookup for resource reads. A failed lookup reads as an
    /// empty connection carrying only the requested id.
    async fn fetch_connection(&self, session: &Session, connection_id: &str) -> Connection {
        match self
            .backend
            .get_connection(connection_id, session.access_token())
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                warn!(
                    session_id = %session.id(),
                    connection_id = %connection_id,
                    "[Dispatch] Connection lookup failed: {:#}", e
                );
                Connection {
                    id: connection_id.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    /// Tool failures after validation are reported inside the result
    async fn call_tool(&self, session: &Session, call: ToolCall) -> AdapterResult<CallToolResult> {
        let tool = call.name();
        match self.tools.execute(session, call).await {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value)
                    .map_err(|e| AdapterError::query_execution(tool, tool, e))?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) if e.is_protocol_error() => Err(e),
            Err(e) => {
                warn!(session_id = %session.id(), tool = %tool, "[Dispatch] Tool failed: {}", e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

fn connection_resource(connection: &Connection) -> Resource {
    let mut raw = RawResource::new(
        branding::resource_uri(&connection.id, None),
        connection.name.clone(),
    );
    raw.mime_type = Some(JSON_MIME_TYPE.to_string());
    raw.description = Some(format!(
        "The datasource type of connection \"{}\" is {}, which has a total of {} tables",
        connection.name,
        connection.database_type.as_deref().unwrap_or("unknown"),
        connection
            .table_count
            .unwrap_or(connection.tables().len() as u64)
    ));
    raw.no_annotation()
}

/// Tables without an id cannot be addressed and are skipped
fn table_resource(connection: &Connection, table: &Table) -> Option<Resource> {
    let table_id = table.table_id.as_deref()?;
    let mut raw = RawResource::new(
        branding::resource_uri(&connection.id, Some(table_id)),
        format!(
            "{}/{}",
            connection.name,
            table.table_name.as_deref().unwrap_or(table_id)
        ),
    );
    raw.mime_type = Some(JSON_MIME_TYPE.to_string());
    raw.description = Some(format!(
        "This is a table in datasource of connection \"{}\", it has {} fields",
        connection.name,
        table.fields.len()
    ));
    Some(raw.no_annotation())
}

/// Protocol error for a failed request
pub fn error_data(err: &AdapterError) -> ErrorData {
    let message = err.to_string();
    match err {
        AdapterError::SessionNotFound(_) => ErrorData::invalid_request(message, None),
        AdapterError::UnsupportedMethod(_) => {
            ErrorData::new(ErrorCode::METHOD_NOT_FOUND, message, None)
        }
        e if e.is_protocol_error() => ErrorData::invalid_params(message, None),
        _ => ErrorData::internal_error(message, None),
    }
}
