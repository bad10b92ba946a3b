//! Typed protocol requests
//!
//! Inbound JSON-RPC requests are converted into `McpRequest` before dispatch.
//! Tool calls are validated here, so handlers only ever see well-formed
//! arguments and the precise argument error is reported to the client.

use std::time::Duration;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use rmcp::model::{ClientRequest, JsonObject, ProtocolVersion};
use serde_json::Value;
use tapmcp_core::{AdapterError, AdapterResult};

use crate::pool::{CountHint, CountParams, FindQuery, DEFAULT_FIND_LIMIT};

pub const TOOL_LIST_CONNECTIONS: &str = "listConnections";
pub const TOOL_LIST_TABLES: &str = "listTables";
pub const TOOL_SAMPLE_DATA: &str = "sampleData";
pub const TOOL_LIST_COLLECTIONS: &str = "listCollections";
pub const TOOL_QUERY: &str = "query";
pub const TOOL_AGGREGATE: &str = "aggregate";
pub const TOOL_COUNT: &str = "count";

/// One variant per request kind the adapter serves
#[derive(Debug, Clone, PartialEq)]
pub enum McpRequest {
    Initialize { protocol_version: ProtocolVersion },
    Ping,
    ListResources,
    ReadResource { uri: String },
    ListResourceTemplates,
    ListTools,
    CallTool(ToolCall),
    ListPrompts,
    GetPrompt { name: String, arguments: JsonObject },
    Unsupported(String),
}

impl McpRequest {
    pub fn from_client(request: ClientRequest) -> AdapterResult<Self> {
        Ok(match request {
            ClientRequest::InitializeRequest(r) => Self::Initialize {
                protocol_version: r.params.protocol_version,
            },
            ClientRequest::PingRequest(_) => Self::Ping,
            ClientRequest::ListResourcesRequest(_) => Self::ListResources,
            ClientRequest::ReadResourceRequest(r) => Self::ReadResource { uri: r.params.uri },
            ClientRequest::ListResourceTemplatesRequest(_) => Self::ListResourceTemplates,
            ClientRequest::ListToolsRequest(_) => Self::ListTools,
            ClientRequest::CallToolRequest(r) => Self::CallTool(ToolCall::parse(
                &r.params.name,
                r.params.arguments.unwrap_or_default(),
            )?),
            ClientRequest::ListPromptsRequest(_) => Self::ListPrompts,
            ClientRequest::GetPromptRequest(r) => Self::GetPrompt {
                name: r.params.name,
                arguments: r.params.arguments.unwrap_or_default(),
            },
            other => Self::Unsupported(other.method().to_string()),
        })
    }

    /// Protocol method name, for logging
    pub fn method(&self) -> &str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::Ping => "ping",
            Self::ListResources => "resources/list",
            Self::ReadResource { .. } => "resources/read",
            Self::ListResourceTemplates => "resources/templates/list",
            Self::ListTools => "tools/list",
            Self::CallTool(_) => "tools/call",
            Self::ListPrompts => "prompts/list",
            Self::GetPrompt { .. } => "prompts/get",
            Self::Unsupported(method) => method,
        }
    }
}

/// A validated tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListConnections,
    ListTables {
        connection_id: String,
    },
    SampleData {
        connection_id: String,
        table_name: String,
    },
    ListCollections {
        connection_id: String,
        filter: Option<Document>,
        name_only: bool,
    },
    Query {
        connection_id: String,
        collection: String,
        query: FindQuery,
        explain: bool,
    },
    Aggregate {
        connection_id: String,
        collection: String,
        pipeline: Vec<Document>,
        explain: bool,
    },
    Count {
        connection_id: String,
        collection: String,
        filter: Document,
        params: CountParams,
    },
}

impl ToolCall {
    pub fn parse(name: &str, arguments: JsonObject) -> AdapterResult<Self> {
        let args = Args {
            tool: name,
            map: &arguments,
        };

        match name {
            TOOL_LIST_CONNECTIONS => Ok(Self::ListConnections),
            TOOL_LIST_TABLES => Ok(Self::ListTables {
                connection_id: args.connection_id()?,
            }),
            TOOL_SAMPLE_DATA => Ok(Self::SampleData {
                connection_id: args.connection_id()?,
                table_name: args.required_str("tableName")?,
            }),
            TOOL_LIST_COLLECTIONS => Ok(Self::ListCollections {
                connection_id: args.connection_id()?,
                filter: args.document("filter")?,
                name_only: args.flag("nameOnly")?,
            }),
            TOOL_QUERY => {
                let connection_id = args.connection_id()?;
                let collection = args.required_str("collectionName")?;
                let mut filter = args.document("filter")?.unwrap_or_default();
                coerce_object_id(&mut filter);
                let limit = match args.unsigned("limit")? {
                    Some(limit) => i64::try_from(limit)
                        .map_err(|_| AdapterError::invalid("limit", "out of range"))?,
                    None => DEFAULT_FIND_LIMIT,
                };
                Ok(Self::Query {
                    connection_id,
                    collection,
                    query: FindQuery {
                        filter,
                        projection: args.document("projection")?,
                        limit,
                    },
                    explain: args.flag("explain")?,
                })
            }
            TOOL_AGGREGATE => Ok(Self::Aggregate {
                connection_id: args.connection_id()?,
                collection: args.required_str("collectionName")?,
                pipeline: args.pipeline()?,
                explain: args.flag("explain")?,
            }),
            TOOL_COUNT => {
                let connection_id = args.connection_id()?;
                let collection = args.required_str("collectionName")?;
                let mut filter = args.document("query")?.unwrap_or_default();
                coerce_object_id(&mut filter);
                Ok(Self::Count {
                    connection_id,
                    collection,
                    filter,
                    params: CountParams {
                        limit: args.unsigned("limit")?,
                        skip: args.unsigned("skip")?,
                        hint: args.hint()?,
                        read_concern: args.read_concern()?,
                        max_time: args.unsigned("maxTimeMS")?.map(Duration::from_millis),
                        collation: args.document("collation")?,
                    },
                })
            }
            other => Err(AdapterError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListConnections => TOOL_LIST_CONNECTIONS,
            Self::ListTables { .. } => TOOL_LIST_TABLES,
            Self::SampleData { .. } => TOOL_SAMPLE_DATA,
            Self::ListCollections { .. } => TOOL_LIST_COLLECTIONS,
            Self::Query { .. } => TOOL_QUERY,
            Self::Aggregate { .. } => TOOL_AGGREGATE,
            Self::Count { .. } => TOOL_COUNT,
        }
    }
}

struct Args<'a> {
    tool: &'a str,
    map: &'a JsonObject,
}

impl Args<'_> {
    /// Present and not null
    fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn connection_id(&self) -> AdapterResult<String> {
        match self.get("connectionId") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(AdapterError::MissingConnectionId),
        }
    }

    fn required_str(&self, key: &str) -> AdapterResult<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(AdapterError::missing(self.tool, key)),
        }
    }

    fn flag(&self, key: &str) -> AdapterResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s == "true" || s == "false" => Ok(s == "true"),
            Some(_) => Err(AdapterError::invalid(key, "expected a boolean")),
        }
    }

    fn unsigned(&self, key: &str) -> AdapterResult<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| AdapterError::invalid(key, "expected a non-negative integer")),
            Some(Value::String(s)) => s
                .parse::<u64>()
                .map(Some)
                .map_err(|_| AdapterError::invalid(key, "expected a non-negative integer")),
            Some(_) => Err(AdapterError::invalid(key, "expected a non-negative integer")),
        }
    }

    /// An object argument, or a string holding a JSON object
    fn document(&self, key: &str) -> AdapterResult<Option<Document>> {
        let object = match self.get(key) {
            None => return Ok(None),
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(AdapterError::InvalidFilterFormat(format!(
                        "'{}' must be a JSON object",
                        key
                    )))
                }
                Err(e) => {
                    return Err(AdapterError::InvalidFilterFormat(format!(
                        "'{}' is not valid JSON: {}",
                        key, e
                    )))
                }
            },
            Some(_) => {
                return Err(AdapterError::InvalidFilterFormat(format!(
                    "'{}' must be an object or a JSON string",
                    key
                )))
            }
        };

        Document::try_from(object)
            .map(Some)
            .map_err(|e| AdapterError::InvalidFilterFormat(format!("'{}': {}", key, e)))
    }

    fn pipeline(&self) -> AdapterResult<Vec<Document>> {
        let Some(Value::Array(stages)) = self.get("pipeline") else {
            return match self.get("pipeline") {
                None => Err(AdapterError::missing(self.tool, "pipeline")),
                Some(_) => Err(AdapterError::PipelineNotArray),
            };
        };

        stages
            .iter()
            .map(|stage| match stage {
                Value::Object(map) => Document::try_from(map.clone())
                    .map_err(|e| AdapterError::InvalidFilterFormat(format!("pipeline: {}", e))),
                _ => Err(AdapterError::PipelineNotArray),
            })
            .collect()
    }

    fn hint(&self) -> AdapterResult<Option<CountHint>> {
        match self.get("hint") {
            None => Ok(None),
            Some(Value::String(name)) => Ok(Some(CountHint::Name(name.clone()))),
            Some(Value::Object(_)) => Ok(self.document("hint")?.map(CountHint::Keys)),
            Some(_) => Err(AdapterError::invalid("hint", "expected an index name or key pattern")),
        }
    }

    fn read_concern(&self) -> AdapterResult<Option<String>> {
        match self.get("readConcern") {
            None => Ok(None),
            Some(Value::String(level)) => Ok(Some(level.clone())),
            Some(Value::Object(map)) => match map.get("level") {
                Some(Value::String(level)) => Ok(Some(level.clone())),
                _ => Err(AdapterError::invalid("readConcern", "missing 'level'")),
            },
            Some(_) => Err(AdapterError::invalid("readConcern", "expected a level")),
        }
    }
}

/// Replace a top-level `_id` holding 24 lowercase hex characters with an
/// ObjectId. Any other `_id` value is left untouched.
pub fn coerce_object_id(filter: &mut Document) {
    let Some(Bson::String(id)) = filter.get("_id") else {
        return;
    };
    if !is_object_id_hex(id) {
        return;
    }
    if let Ok(oid) = ObjectId::parse_str(id) {
        filter.insert("_id", oid);
    }
}

fn is_object_id_hex(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Collections whose names start with `system.` are never exposed
pub fn is_system_collection(name: &str) -> bool {
    name.starts_with("system.")
}
