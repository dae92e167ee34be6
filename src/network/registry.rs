//! Connection Registry
//!
//! Maps connection ids to outbound channels. The engine only ever talks to
//! the [`Connections`] trait; the writer side of each connection drains its
//! channel onto the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use crate::protocol::Message;

/// Identifier assigned to each accepted connection
pub type ConnectionId = u64;

/// Capability to push messages to connected clients
pub trait Connections: Send + Sync {
    /// Queue `message` for `connection_id`; false if no such connection
    fn send(&self, connection_id: ConnectionId, message: Message) -> bool;

    /// Queue `message` for every connection
    fn broadcast(&self, message: Message);

    /// Forget the connection; its writer flushes and closes the socket
    fn disconnect(&self, connection_id: ConnectionId);
}

/// Registry of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    outbound: RwLock<HashMap<ConnectionId, Sender<Message>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and an outbound channel for a new connection
    pub fn register(&self) -> (ConnectionId, Receiver<Message>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = channel::unbounded();
        self.outbound.write().insert(connection_id, tx);
        (connection_id, rx)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.outbound.read().contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.outbound.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.read().is_empty()
    }
}

impl Connections for ConnectionRegistry {
    fn send(&self, connection_id: ConnectionId, message: Message) -> bool {
        match self.outbound.read().get(&connection_id) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    fn broadcast(&self, message: Message) {
        for tx in self.outbound.read().values() {
            let _ = tx.send(message.clone());
        }
    }

    fn disconnect(&self, connection_id: ConnectionId) {
        if self.outbound.write().remove(&connection_id).is_some() {
            tracing::trace!("Connection {} removed from registry", connection_id);
        }
    }
}
