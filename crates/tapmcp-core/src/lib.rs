//! # TapMCP Core Library
//!
//! Domain types and backend access for the TapData MCP adapter.
//!
//! ## Modules
//!
//! - `branding` - Product naming, default ports and URI scheme
//! - `domain` - Backend records, canonical schemas, resource URIs
//! - `error` - Adapter error taxonomy
//! - `service` - `BackendGateway` trait and its REST client

pub mod branding;
pub mod domain;
pub mod error;
pub mod service;

pub use domain::*;
pub use error::{AdapterError, AdapterResult};
pub use service::{BackendClient, BackendGateway, BackendStatusError};
