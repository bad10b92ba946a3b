//! Static declarations: server info, tools, resource templates and prompts.
//!
//! Nothing here talks to the backend.

use rmcp::model::{
    object, AnnotateAble, Implementation, InitializeResult, JsonObject, Prompt, PromptArgument,
    PromptMessage, PromptMessageRole, ProtocolVersion, RawResourceTemplate, ResourceTemplate,
    ServerCapabilities, Tool, ToolAnnotations,
};
use serde_json::json;
use tapmcp_core::branding;
use tapmcp_core::{AdapterError, AdapterResult};

use super::request::{
    TOOL_AGGREGATE, TOOL_COUNT, TOOL_LIST_COLLECTIONS, TOOL_LIST_CONNECTIONS, TOOL_LIST_TABLES,
    TOOL_QUERY, TOOL_SAMPLE_DATA,
};

pub const PROMPT_ANALYZE_TABLE: &str = "analyze_table";

pub const JSON_MIME_TYPE: &str = "application/json";

/// Protocol revisions the server can speak, oldest first
const SUPPORTED_PROTOCOL_VERSIONS: [ProtocolVersion; 3] = [
    ProtocolVersion::V_2024_11_05,
    ProtocolVersion::V_2025_03_26,
    ProtocolVersion::LATEST,
];

/// The client's revision when supported, otherwise the newest one
pub fn negotiate_protocol_version(requested: &ProtocolVersion) -> ProtocolVersion {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| *v == requested)
        .cloned()
        .unwrap_or(ProtocolVersion::LATEST)
}

pub fn initialize_result(requested: &ProtocolVersion) -> InitializeResult {
    InitializeResult {
        protocol_version: negotiate_protocol_version(requested),
        capabilities: ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .enable_prompts()
            .build(),
        server_info: Implementation {
            name: branding::SERVER_NAME.to_string(),
            title: Some(branding::DISPLAY_NAME.to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some(branding::DESCRIPTION.to_string()),
            ..Default::default()
        },
        instructions: Some(
            "Browse TapData connections as tap:// resources. Use listConnections to find a \
             connection id, then listCollections, query, aggregate or count against it."
                .to_string(),
        ),
    }
}

pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        template(
            "connectionId",
            "TapData datasource connection id",
            &branding::resource_uri("{connectionId}", None),
        ),
        template(
            "tableId",
            "Data table id in datasource",
            &branding::resource_uri("{connectionId}", Some("{tableId}")),
        ),
    ]
}

fn template(name: &str, description: &str, uri_template: &str) -> ResourceTemplate {
    RawResourceTemplate {
        uri_template: uri_template.to_string(),
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        mime_type: Some(JSON_MIME_TYPE.to_string()),
        icons: None,
    }
    .no_annotation()
}

fn schema(value: serde_json::Value) -> JsonObject {
    object(value)
}

fn connection_id_property(purpose: &str) -> serde_json::Value {
    json!({ "type": "string", "description": format!("The id of the connection {}", purpose) })
}

fn read_only(tool: Tool) -> Tool {
    tool.annotate(ToolAnnotations::new().read_only(true))
}

pub fn tools() -> Vec<Tool> {
    vec![
        read_only(Tool::new(
            TOOL_LIST_CONNECTIONS,
            "List all available database connections",
            schema(json!({ "type": "object", "properties": {} })),
        )),
        read_only(Tool::new(
            TOOL_LIST_TABLES,
            "List all tables based on database connection id",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to list tables")
                },
                "required": ["connectionId"]
            })),
        )),
        read_only(Tool::new(
            TOOL_SAMPLE_DATA,
            "Fetch sample rows from a table using the specified connection id and table name",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to sample data from"),
                    "tableName": { "type": "string", "description": "The name of the table to sample" }
                },
                "required": ["connectionId", "tableName"]
            })),
        )),
        read_only(Tool::new(
            TOOL_LIST_COLLECTIONS,
            "List collections in the database of a connection",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to list collections"),
                    "nameOnly": { "type": "boolean", "description": "Return only collection names" },
                    "filter": { "type": "object", "description": "Filter applied to the collection list" }
                },
                "required": ["connectionId"]
            })),
        )),
        read_only(Tool::new(
            TOOL_QUERY,
            "Find documents in a collection using a filter",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to query"),
                    "collectionName": { "type": "string", "description": "Name of the collection to query" },
                    "filter": {
                        "type": ["object", "string"],
                        "description": "Query filter, as an object or JSON text"
                    },
                    "projection": { "type": "object", "description": "Fields to include or exclude" },
                    "limit": { "type": "integer", "minimum": 0, "description": "Maximum documents to return (default 100)" },
                    "explain": { "type": "boolean", "description": "Return the query plan instead of documents" }
                },
                "required": ["connectionId", "collectionName"]
            })),
        )),
        read_only(Tool::new(
            TOOL_AGGREGATE,
            "Run an aggregation pipeline against a collection",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to aggregate on"),
                    "collectionName": { "type": "string", "description": "Name of the collection to aggregate" },
                    "pipeline": {
                        "type": "array",
                        "items": { "type": "object" },
                        "description": "Aggregation pipeline stages"
                    },
                    "explain": { "type": "boolean", "description": "Return the aggregation plan instead of documents" }
                },
                "required": ["connectionId", "collectionName", "pipeline"]
            })),
        )),
        read_only(Tool::new(
            TOOL_COUNT,
            "Count documents in a collection matching a query",
            schema(json!({
                "type": "object",
                "properties": {
                    "connectionId": connection_id_property("to count on"),
                    "collectionName": { "type": "string", "description": "Name of the collection to count" },
                    "query": { "type": ["object", "string"], "description": "Query filter" },
                    "limit": { "type": "integer", "minimum": 0 },
                    "skip": { "type": "integer", "minimum": 0 },
                    "hint": { "type": ["object", "string"], "description": "Index key pattern or index name" },
                    "readConcern": { "type": ["object", "string"], "description": "Read concern level" },
                    "maxTimeMS": { "type": "integer", "minimum": 0 },
                    "collation": { "type": "object" }
                },
                "required": ["connectionId", "collectionName"]
            })),
        )),
    ]
}

pub fn prompts() -> Vec<Prompt> {
    vec![Prompt::new(
        PROMPT_ANALYZE_TABLE,
        Some("Analyze a table structure and contents"),
        Some(vec![
            prompt_argument("connectionId", "Connection id of the datasource to analyze"),
            prompt_argument("tableId", "Table id of the connection to analyze"),
        ]),
    )]
}

fn prompt_argument(name: &str, description: &str) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(true),
    }
}

/// Messages for a prompt, or the reason it cannot be rendered
pub fn render_prompt(name: &str, arguments: &JsonObject) -> AdapterResult<Vec<PromptMessage>> {
    if name != PROMPT_ANALYZE_TABLE {
        return Err(AdapterError::UnknownPrompt(name.to_string()));
    }
    prompt_text_argument(arguments, "connectionId")?;
    let table_id = prompt_text_argument(arguments, "tableId")?;

    Ok(vec![
        PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Please analyze the following table:\nTable name: {}\n\nSchema: \n\nStats:\n\nSample documents:",
                table_id
            ),
        ),
        PromptMessage::new_text(
            PromptMessageRole::User,
            "Provide insights about the table's structure, data types, and basic statistics.",
        ),
    ])
}

fn prompt_text_argument(arguments: &JsonObject, key: &str) -> AdapterResult<String> {
    match arguments.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(AdapterError::MissingArgument(key.to_string())),
    }
}
