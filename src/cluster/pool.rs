//! Node connections owned by one backend session.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::core::multiplexed::MultiplexedConnection;

/// Multiplexed connections keyed by node address.
///
/// A session keeps at most one connection per node; fan-out sub-calls
/// share it through the multiplexer.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    connections: RwLock<HashMap<String, MultiplexedConnection>>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live connection to `address`, if any.
    ///
    /// Connections whose tasks have stopped are evicted on lookup.
    pub async fn get(&self, address: &str) -> Option<MultiplexedConnection> {
        {
            let conns = self.connections.read().await;
            match conns.get(address) {
                Some(conn) if !conn.is_closed() => return Some(conn.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        self.remove(address).await;
        None
    }

    /// Stores a connection, returning the one that won if another task
    /// connected to the same node first.
    pub async fn insert(&self, address: &str, conn: MultiplexedConnection) -> MultiplexedConnection {
        let mut conns = self.connections.write().await;
        match conns.get(address) {
            Some(existing) if !existing.is_closed() => existing.clone(),
            _ => {
                conns.insert(address.to_string(), conn.clone());
                conn
            }
        }
    }

    /// Drops the connection to `address`.
    pub async fn remove(&self, address: &str) {
        self.connections.write().await.remove(address);
    }

    /// Drops every connection; their tasks stop once in-flight replies land.
    pub async fn clear(&self) {
        self.connections.write().await.clear();
    }

    /// Number of pooled connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
