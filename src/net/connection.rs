//! Connections: undirected edges between two ports.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Resolve the peer port given one end
//!
//! # Design Decisions
//! - Ends are held weakly; ports own connections, not the other way round
//! - Identity is the connection id, cloning shares the same edge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::ConnectionError;
use crate::net::port::Port;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug)]
struct ConnectionInner {
    id: ConnectionId,
    port_a: Weak<Port>,
    port_b: Weak<Port>,
}

/// An edge between two ports.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn new(port_a: &Arc<Port>, port_b: &Arc<Port>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id: ConnectionId::new(),
                port_a: Arc::downgrade(port_a),
                port_b: Arc::downgrade(port_b),
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn port_a(&self) -> Option<Arc<Port>> {
        self.inner.port_a.upgrade()
    }

    pub fn port_b(&self) -> Option<Arc<Port>> {
        self.inner.port_b.upgrade()
    }

    /// Whether `port` is one of the two ends.
    pub fn has_end(&self, port: &Port) -> bool {
        std::ptr::eq(self.inner.port_a.as_ptr(), port) || std::ptr::eq(self.inner.port_b.as_ptr(), port)
    }

    /// Resolve the peer of `port`.
    pub fn other_port(&self, port: &Port) -> Result<Arc<Port>, ConnectionError> {
        let other = if std::ptr::eq(self.inner.port_a.as_ptr(), port) {
            &self.inner.port_b
        } else if std::ptr::eq(self.inner.port_b.as_ptr(), port) {
            &self.inner.port_a
        } else {
            return Err(ConnectionError::ForeignPort(self.inner.id.to_string()));
        };
        other
            .upgrade()
            .ok_or_else(|| ConnectionError::Detached(self.inner.id.to_string()))
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Connection {}
