//! Connection Pool - shared document store handles keyed by connection id
//!
//! Every entry records the sessions holding it. `release` drops one session's
//! hold and closes the client once nobody holds it any more.
//!
//! Connecting happens outside any map lock. When two callers race to open
//! the same id, the entry is re-checked after the connect completes and the
//! loser's client is closed, so all callers end up with the same handle.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tapmcp_core::ConnectionConfig;
use tracing::{debug, info, warn};

use super::store::{DocumentStore, StoreConnector};

struct PoolEntry {
    store: Arc<dyn DocumentStore>,
    holders: HashSet<String>,
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub entries: usize,
    pub holders: usize,
}

pub struct ConnectionPool {
    connector: Arc<dyn StoreConnector>,
    entries: DashMap<String, PoolEntry>,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            entries: DashMap::new(),
        }
    }

    /// Return the live handle for `connection_id`, opening one if needed,
    /// and record `holder` as a user of it.
    pub async fn get_or_create(
        &self,
        holder: &str,
        connection_id: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentStore>> {
        if let Some(mut entry) = self.entries.get_mut(connection_id) {
            entry.holders.insert(holder.to_string());
            return Ok(entry.store.clone());
        }

        debug!(connection_id = %connection_id, "[Pool] No live client, connecting");
        let fresh = self.connector.connect(connection_id, config).await?;

        let (store, redundant) = match self.entries.entry(connection_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().holders.insert(holder.to_string());
                (occupied.get().store.clone(), Some(fresh))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PoolEntry {
                    store: fresh.clone(),
                    holders: HashSet::from([holder.to_string()]),
                });
                info!(connection_id = %connection_id, "[Pool] Client pooled");
                (fresh, None)
            }
        };

        if let Some(redundant) = redundant {
            debug!(
                connection_id = %connection_id,
                "[Pool] Lost connect race, closing redundant client"
            );
            if let Err(e) = redundant.close().await {
                warn!(connection_id = %connection_id, "[Pool] Failed to close redundant client: {:#}", e);
            }
        }

        Ok(store)
    }

    /// Drop `holder`'s hold on each id, closing clients nobody holds any more.
    ///
    /// Close failures are logged and never propagated.
    pub async fn release(&self, holder: &str, connection_ids: &[String]) {
        for connection_id in connection_ids {
            let evicted = self.entries.remove_if_mut(connection_id, |_, entry| {
                entry.holders.remove(holder);
                entry.holders.is_empty()
            });

            match evicted {
                Some((_, entry)) => {
                    info!(connection_id = %connection_id, "[Pool] Closing client");
                    if let Err(e) = entry.store.close().await {
                        warn!(connection_id = %connection_id, "[Pool] Failed to close client: {:#}", e);
                    }
                }
                None => {
                    debug!(
                        connection_id = %connection_id,
                        holder = %holder,
                        "[Pool] Client still held or already evicted"
                    );
                }
            }
        }
    }

    /// Close every pooled client regardless of holders
    pub async fn close_all(&self) {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for connection_id in ids {
            if let Some((_, entry)) = self.entries.remove(&connection_id) {
                if let Err(e) = entry.store.close().await {
                    warn!(connection_id = %connection_id, "[Pool] Failed to close client: {:#}", e);
                }
            }
        }
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.entries.contains_key(connection_id)
    }

    /// Sessions currently holding `connection_id`
    pub fn holders(&self, connection_id: &str) -> Vec<String> {
        self.entries
            .get(connection_id)
            .map(|e| e.holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> PoolStats {
        self.entries.iter().fold(PoolStats::default(), |mut stats, entry| {
            stats.entries += 1;
            stats.holders += entry.holders.len();
            stats
        })
    }
}
