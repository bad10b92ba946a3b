//! Request logging
//!
//! `RequestTrace` ties the received and completed lines of one HTTP request
//! together; `summary` reduces JSON-RPC payloads to one line of log text.

mod request_trace;
mod summary;

pub use request_trace::RequestTrace;
pub use summary::{reply_summary, rpc_method};
