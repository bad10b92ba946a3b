//! Domain types for the adapter
//!
//! - Backend records (Connection, Table, ConnectionConfig, UserToken)
//! - Canonical schema shapes and the SchemaMapper
//! - The `tap://` resource URI value type

mod connection;
mod resource_uri;
mod schema;

pub use connection::*;
pub use resource_uri::ResourceUri;
pub use schema::*;
