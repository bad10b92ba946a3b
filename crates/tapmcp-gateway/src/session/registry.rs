//! Session Registry
//!
//! Owns every live session. A session binds the backend access token, the
//! client's tag filter, the set of connection ids it opened and the inbound
//! half of its transport.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rmcp::model::ClientJsonRpcMessage;
use tapmcp_core::{AdapterError, AdapterResult, UserToken};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::pool::ConnectionPool;

/// Inbound side of a session's stream
#[derive(Debug, Clone)]
pub struct SessionTransport {
    inbound: mpsc::Sender<ClientJsonRpcMessage>,
    cancel: CancellationToken,
}

impl SessionTransport {
    /// Create a transport and the receiver its session loop reads from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClientJsonRpcMessage>) {
        let (inbound, rx) = mpsc::channel(capacity);
        (
            Self {
                inbound,
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    /// Hand a client message to the session loop
    pub async fn deliver(&self, session_id: &str, message: ClientJsonRpcMessage) -> AdapterResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AdapterError::SessionNotFound(session_id.to_string()));
        }
        self.inbound
            .send(message)
            .await
            .map_err(|_| AdapterError::SessionNotFound(session_id.to_string()))
    }

    /// Token cancelled when the session is destroyed
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}

/// Server-side state of one authenticated client stream
pub struct Session {
    id: String,
    access_token: Zeroizing<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    /// `None` once the session has been destroyed
    connection_ids: Mutex<Option<HashSet<String>>>,
    transport: SessionTransport,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("access_token", &"[REDACTED]")
            .field("tags", &self.tags)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expiry computed at login. Informational only; sessions live until
    /// their stream closes.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    /// Record a connection id this session opened. Returns false if it was
    /// already recorded.
    ///
    /// Fails once the session is destroyed; the caller then owns releasing
    /// whatever it acquired for this session.
    pub fn track_connection(&self, connection_id: &str) -> AdapterResult<bool> {
        match self.connection_ids.lock().as_mut() {
            Some(ids) => Ok(ids.insert(connection_id.to_string())),
            None => Err(AdapterError::SessionNotFound(self.id.clone())),
        }
    }

    /// Snapshot of the connection ids this session opened
    pub fn connection_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connection_ids
            .lock()
            .as_ref()
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn is_closed(&self) -> bool {
        self.connection_ids.lock().is_none()
    }

    /// Close the id set and hand back everything recorded so far
    fn take_connection_ids(&self) -> Vec<String> {
        self.connection_ids
            .lock()
            .take()
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default()
    }
}

pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    pool: Arc<ConnectionPool>,
}

impl SessionRegistry {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            sessions: DashMap::new(),
            pool,
        }
    }

    /// Register a session for a freshly authenticated stream
    pub fn create(
        &self,
        token: UserToken,
        tags: Vec<String>,
        transport: SessionTransport,
    ) -> Arc<Session> {
        let created_at = Utc::now();
        let expires_at = Duration::try_seconds(token.ttl)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(created_at);

        loop {
            let id = Uuid::new_v4().to_string();
            if let Entry::Vacant(vacant) = self.sessions.entry(id.clone()) {
                let session = Arc::new(Session {
                    id,
                    access_token: Zeroizing::new(token.id),
                    tags,
                    created_at,
                    expires_at,
                    connection_ids: Mutex::new(Some(HashSet::new())),
                    transport,
                });
                vacant.insert(session.clone());
                info!(
                    session_id = %session.id,
                    expires_at = %session.expires_at,
                    tags = ?session.tags,
                    "[Sessions] Session created"
                );
                return session;
            }
            debug!(session_id = %id, "[Sessions] Session id collision, regenerating");
        }
    }

    pub fn get(&self, session_id: &str) -> AdapterResult<Arc<Session>> {
        self.sessions
            .get(session_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| AdapterError::SessionNotFound(session_id.to_string()))
    }

    /// Remove the session, release every connection id it opened, then close
    /// its transport. Destroying an unknown session is a no-op.
    pub async fn destroy(&self, session_id: &str) {
        let Some((_, session)) = self.sessions.remove(session_id) else {
            debug!(session_id = %session_id, "[Sessions] Already destroyed");
            return;
        };

        let connection_ids = session.take_connection_ids();
        self.pool.release(session_id, &connection_ids).await;
        session.transport.close();

        info!(
            session_id = %session_id,
            released = connection_ids.len(),
            "[Sessions] Session destroyed"
        );
    }

    /// Destroy every live session
    pub async fn destroy_all(&self) {
        for session_id in self.session_ids() {
            self.destroy(&session_id).await;
        }
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
