//! Backend records as returned by the TapData management API.
//!
//! These are read-only from the adapter's point of view. Field names follow
//! the backend's JSON (a mix of snake_case and camelCase).

use serde::{Deserialize, Deserializer, Serialize};

/// A data-source connection registered in the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "database_type", alias = "databaseType", default)]
    pub database_type: Option<String>,
    #[serde(rename = "connection_type", alias = "connectionType", default)]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "tableCount", default)]
    pub table_count: Option<u64>,
    #[serde(rename = "loadSchemaTime", default)]
    pub load_schema_time: Option<serde_json::Value>,
    #[serde(default)]
    pub schema: Option<ConnectionSchemaRecord>,
    #[serde(default)]
    pub config: Option<ConnectionConfig>,
}

impl Connection {
    /// Tables loaded into the backend schema, empty when the schema was not loaded
    pub fn tables(&self) -> &[Table] {
        self.schema
            .as_ref()
            .map(|s| s.tables.as_slice())
            .unwrap_or_default()
    }

    /// First table whose identifier matches exactly
    pub fn find_table(&self, table_id: &str) -> Option<&Table> {
        self.tables()
            .iter()
            .find(|t| t.table_id.as_deref() == Some(table_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionSchemaRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tables: Vec<Table>,
}

/// A table (or collection) inside a connection's loaded schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(rename = "tableId", default)]
    pub table_id: Option<String>,
    #[serde(rename = "table_name", default)]
    pub table_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<TableField>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub indices: Vec<TableIndex>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableField {
    #[serde(rename = "field_name", default)]
    pub field_name: Option<String>,
    #[serde(rename = "data_type", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub unique: Option<bool>,
    #[serde(rename = "primaryKey", default)]
    pub primary_key: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableIndex {
    #[serde(rename = "indexName", default)]
    pub index_name: Option<String>,
    #[serde(default)]
    pub unique: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<IndexColumn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexColumn {
    #[serde(rename = "columnPosition", default)]
    pub column_position: Option<usize>,
}

/// Database settings of a connection.
///
/// `uri` usually carries credentials, so `Debug` never prints it.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(rename = "isUri", default, deserialize_with = "null_as_default")]
    pub is_uri: bool,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(rename = "additionalString", default)]
    pub additional_string: Option<String>,
}

impl ConnectionConfig {
    /// Connection string for the driver: the direct URI when `isUri` is set,
    /// otherwise assembled from host, database and extra options.
    pub fn connection_string(&self) -> String {
        if self.is_uri {
            return self.uri.clone().unwrap_or_default();
        }
        format!(
            "mongodb://{}/{}?{}",
            self.host.as_deref().unwrap_or_default(),
            self.database.as_deref().unwrap_or_default(),
            self.additional_string.as_deref().unwrap_or_default()
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("is_uri", &self.is_uri)
            .field("uri", &self.uri.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("database", &self.database)
            .finish()
    }
}

/// The backend sends `null` for empty collections as often as it omits them
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of exchanging an access code with the backend
#[derive(Debug, Clone, Deserialize)]
pub struct UserToken {
    /// Access token used on every subsequent backend call
    pub id: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub ttl: i64,
}
