//! Canonical schema shapes returned by resource reads and tool results,
//! and the mapper from backend records to them.

use serde::Serialize;

use super::connection::{Connection, Table};

const UNKNOWN_TABLE_NAME: &str = "Unknown table name";

/// Schema view of a resource, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ResourceSchema {
    #[serde(rename = "connection")]
    Connection(ConnectionSchema),
    #[serde(rename = "table")]
    Table(TableSchema),
    #[serde(rename = "Unknown")]
    Unknown { id: String, name: String },
}

impl ResourceSchema {
    /// Placeholder returned for URIs that do not match the resource grammar
    pub fn unknown() -> Self {
        Self::Unknown {
            id: String::new(),
            name: "Unknown resource".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSchema {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableSchema>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<IndexSchema>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub unique: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSchema {
    pub name: String,
    pub unique: bool,
    pub keys: Vec<String>,
}

/// Pure transform from backend records to canonical schemas
pub struct SchemaMapper;

impl SchemaMapper {
    /// Connection schema including every nested table
    pub fn connection(connection: &Connection) -> ConnectionSchema {
        ConnectionSchema {
            id: connection.id.clone(),
            name: connection.name.clone(),
            database_type: connection.database_type.clone(),
            connection_type: connection.connection_type.clone(),
            table_count: connection.table_count,
            tables: connection
                .schema
                .as_ref()
                .map(|s| s.tables.iter().map(Self::table).collect()),
        }
    }

    /// Connection schema without table detail, used by the connection listing
    pub fn connection_summary(connection: &Connection) -> ConnectionSchema {
        ConnectionSchema {
            tables: None,
            ..Self::connection(connection)
        }
    }

    /// Table schema with fields and indexes.
    ///
    /// Index keys are resolved from column positions into the table's field
    /// list; positions that do not resolve to a named field are dropped.
    pub fn table(table: &Table) -> TableSchema {
        let fields = table
            .fields
            .iter()
            .map(|f| FieldSchema {
                name: f.field_name.clone().unwrap_or_default(),
                data_type: f.data_type.clone().unwrap_or_default(),
                unique: f.unique.unwrap_or(false),
                primary_key: f.primary_key.unwrap_or(false),
            })
            .collect();

        let indexes = table
            .indices
            .iter()
            .map(|index| IndexSchema {
                name: index.index_name.clone().unwrap_or_default(),
                unique: index.unique.unwrap_or(false),
                keys: index
                    .columns
                    .iter()
                    .filter_map(|c| c.column_position)
                    .filter_map(|pos| table.fields.get(pos))
                    .filter_map(|f| f.field_name.clone())
                    .filter(|name| !name.is_empty())
                    .collect(),
            })
            .collect();

        TableSchema {
            id: table.table_id.clone().unwrap_or_default(),
            name: table
                .table_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_TABLE_NAME.to_string()),
            fields: Some(fields),
            indexes: Some(indexes),
        }
    }

    /// Table schema without fields or indexes, used by the table listing
    pub fn table_summary(table: &Table) -> TableSchema {
        TableSchema {
            fields: None,
            indexes: None,
            ..Self::table(table)
        }
    }
}
