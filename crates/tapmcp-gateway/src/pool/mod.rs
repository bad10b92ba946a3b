//! Connection pool and document store seam
//!
//! - **ConnectionPool**: one live client per connection id, shared by sessions
//! - **StoreConnector / DocumentStore**: how clients are opened and queried
//! - **MongoConnector**: the MongoDB implementation

mod connection_pool;
mod mongo;
mod store;

pub use connection_pool::{ConnectionPool, PoolStats};
pub use mongo::{MongoConnector, MongoStore};
pub use store::{
    CountHint, CountParams, DocumentStore, FindQuery, StoreConnector, DEFAULT_FIND_LIMIT,
};
