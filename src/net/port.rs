//! Ports: an operator's connection slots.
//!
//! # Responsibilities
//! - Enforce connection cardinality (single vs. multiple)
//! - Keep both ends of a connection in sync on connect and removal
//! - Relay data to the peer operator
//!
//! # Design Decisions
//! - The parent operator is held weakly (operators own their ports)
//! - No lock is held while calling into another operator
//! - Both connection lists are locked in address order on connect

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::error::OperatorResult;
use crate::model::RequestData;
use crate::net::connection::Connection;
use crate::operator::DataOperator;

/// One side of an operator (input or output).
pub struct Port {
    parent: Weak<dyn DataOperator>,
    is_output: bool,
    has_multiple_connections: AtomicBool,
    connections: RwLock<Vec<Connection>>,
}

impl Port {
    pub fn new(parent: Weak<dyn DataOperator>, is_output: bool, has_multiple_connections: bool) -> Arc<Self> {
        Arc::new(Self {
            parent,
            is_output,
            has_multiple_connections: AtomicBool::new(has_multiple_connections),
            connections: RwLock::new(Vec::new()),
        })
    }

    /// A port without an owning operator.
    #[cfg(test)]
    pub(crate) fn detached(is_output: bool, has_multiple_connections: bool) -> Arc<Self> {
        let parent: Weak<dyn DataOperator> = Weak::<crate::operator::Service>::new();
        Self::new(parent, is_output, has_multiple_connections)
    }

    /// The owning operator, if it is still alive.
    pub fn parent(&self) -> Option<Arc<dyn DataOperator>> {
        self.parent.upgrade()
    }

    pub fn is_output(&self) -> bool {
        self.is_output
    }

    pub fn has_multiple_connections(&self) -> bool {
        self.has_multiple_connections.load(Ordering::SeqCst)
    }

    pub fn set_multiple_connections(&self, enabled: bool) {
        self.has_multiple_connections.store(enabled, Ordering::SeqCst);
    }

    /// Snapshot of the current connections, in connect order.
    pub fn connections(&self) -> Vec<Connection> {
        self.read().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.read().len()
    }

    pub fn contains(&self, connection: &Connection) -> bool {
        self.read().iter().any(|c| c == connection)
    }

    /// Connect this port to `other`.
    ///
    /// Returns `None` when either side already holds its single allowed
    /// connection or when both ends are the same port.
    pub fn connect_to(self: &Arc<Self>, other: &Arc<Port>) -> Option<Connection> {
        if Arc::ptr_eq(self, other) {
            tracing::warn!("Refusing to connect a port to itself");
            return None;
        }

        let self_first = Arc::as_ptr(self) < Arc::as_ptr(other);
        let (first, second) = if self_first { (self, other) } else { (other, self) };
        let mut first_list = first.write();
        let mut second_list = second.write();

        if first.is_full(&first_list) || second.is_full(&second_list) {
            tracing::debug!("Port already holds its single connection");
            return None;
        }

        let connection = Connection::new(self, other);
        first_list.push(connection.clone());
        second_list.push(connection.clone());
        tracing::debug!(connection_id = %connection.id(), "Ports connected");
        Some(connection)
    }

    /// Detach `connection` from both of its ports.
    ///
    /// Owning operators are told through `on_connection_remove` when the
    /// matching notify flag is set. Returns false if the connection was not
    /// attached to this port.
    pub fn remove_connection(&self, connection: &Connection, notify_self: bool, notify_other: bool) -> bool {
        if !self.detach(connection) {
            return false;
        }
        let peer = connection.other_port(self).ok();
        if let Some(peer) = &peer {
            peer.detach(connection);
        }
        tracing::debug!(connection_id = %connection.id(), "Connection removed");

        if notify_self {
            if let Some(parent) = self.parent() {
                parent.on_connection_remove(self.is_output);
            }
        }
        if notify_other {
            if let Some(peer) = peer {
                if let Some(parent) = peer.parent() {
                    parent.on_connection_remove(peer.is_output());
                }
            }
        }
        true
    }

    /// Remove every connection, notifying both sides.
    pub fn remove_connections(&self) {
        for connection in self.connections() {
            self.remove_connection(&connection, true, true);
        }
    }

    /// Deliver `data` to the operator on the other end of `connection`.
    ///
    /// Returns `Ok(false)` when the connection is no longer attached or the
    /// peer is gone; errors raised by the receiver propagate.
    pub async fn send_data(&self, data: RequestData, connection: &Connection) -> OperatorResult<bool> {
        if !self.contains(connection) {
            tracing::debug!(connection_id = %connection.id(), "Send on a removed connection");
            return Ok(false);
        }
        let Ok(peer) = connection.other_port(self) else {
            return Ok(false);
        };
        let Some(operator) = peer.parent() else {
            return Ok(false);
        };
        operator.receive_data(data, peer.is_output()).await?;
        Ok(true)
    }

    fn is_full(&self, list: &[Connection]) -> bool {
        !self.has_multiple_connections() && !list.is_empty()
    }

    fn detach(&self, connection: &Connection) -> bool {
        let mut list = self.write();
        let before = list.len();
        list.retain(|c| c != connection);
        list.len() != before
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Connection>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Connection>> {
        self.connections.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("is_output", &self.is_output)
            .field("has_multiple_connections", &self.has_multiple_connections())
            .field("connections", &self.connection_count())
            .finish()
    }
}
