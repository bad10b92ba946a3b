//! Session management
//!
//! One session per authenticated SSE stream. Sessions are destroyed when the
//! stream closes, never by time.

mod registry;

pub use registry::{Session, SessionRegistry, SessionTransport};
