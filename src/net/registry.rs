//! Connection registry.
//!
//! Single source of truth for "is this address currently bound to an open
//! socket". Backed by a sharded `DashMap`, so a shard lock is held only for
//! the map mutation itself and never across a backend call.

use dashmap::DashMap;
use std::sync::Arc;

use crate::net::connection::{CloseCause, Connection};
use crate::observability::metrics;
use crate::routing::Address;

/// Address → connection mapping.
#[derive(Debug, Default)]
pub struct Registry {
    connections: DashMap<Address, Arc<Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection` under its address, replacing any previous binding.
    ///
    /// The replaced connection is told to close once the shard lock is
    /// released; it is returned for logging.
    pub fn insert(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let previous = self
            .connections
            .insert(connection.address().clone(), connection.clone());
        metrics::set_registered_connections(self.connections.len());

        if let Some(previous) = &previous {
            previous.close(CloseCause::Superseded);
            tracing::info!(
                address = %connection.address(),
                connection_id = %connection.id(),
                superseded = %previous.id(),
                "Connection replaced"
            );
        }
        previous
    }

    /// The connection currently bound to `address`, if any.
    pub fn lookup(&self, address: &str) -> Option<Arc<Connection>> {
        self.connections
            .get(address)
            .map(|entry| entry.value().clone())
    }

    /// Remove the binding for `connection`'s address only if it still points
    /// at `connection`. Returns whether anything was removed.
    pub fn remove(&self, connection: &Connection) -> bool {
        let removed = self
            .connections
            .remove_if(connection.address(), |_, current| {
                current.id() == connection.id()
            })
            .is_some();
        if removed {
            metrics::set_registered_connections(self.connections.len());
        }
        removed
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Point-in-time copy of every registered connection.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Ask every registered connection to close. Entries are removed by
    /// their sessions as they exit.
    pub fn close_all(&self, cause: CloseCause) -> usize {
        let connections = self.snapshot();
        for connection in &connections {
            connection.close(cause);
        }
        connections.len()
    }
}
