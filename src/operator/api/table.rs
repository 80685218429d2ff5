//! Correlation table: request id → origin connection.
//!
//! # States
//! - absent: id never seen
//! - Bound: request (or stream) in flight, responses go back over the connection
//! - Completed: correlation finished; further responses are rejected
//!
//! # Design Decisions
//! - Slots are partitioned per id (DashMap shards), no global lock
//! - Completing a slot is one atomic read-modify-write on that slot
//! - Completed ids are kept so a late response can be told apart from a
//!   fresh id in logs, though both are "not bound"

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::net::Connection;

/// State of one correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Bound(Connection),
    Completed,
}

/// Thread-safe correlation table of an API operator.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    slots: DashMap<String, Slot>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `connection`, replacing any completed slot.
    pub fn bind(&self, id: &str, connection: Connection) {
        self.slots.insert(id.to_string(), Slot::Bound(connection));
    }

    /// Bind `id` unless it is already in flight.
    ///
    /// Check and bind are one operation on the slot's shard, so of two
    /// requests racing on one id exactly one binds. The loser gets the
    /// connection already bound.
    pub fn try_bind(&self, id: &str, connection: Connection) -> Result<(), Connection> {
        match self.slots.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if let Slot::Bound(existing) = entry.get() {
                    return Err(existing.clone());
                }
                entry.insert(Slot::Bound(connection));
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot::Bound(connection));
                Ok(())
            }
        }
    }

    /// Connection bound to `id`, if the correlation is in flight.
    pub fn bound(&self, id: &str) -> Option<Connection> {
        self.slots.get(id).and_then(|slot| match slot.value() {
            Slot::Bound(connection) => Some(connection.clone()),
            Slot::Completed => None,
        })
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.bound(id).is_some()
    }

    /// Mark `id` completed, returning the connection it was bound to.
    ///
    /// Returns `None` (and leaves the table untouched) if `id` was not bound.
    pub fn complete(&self, id: &str) -> Option<Connection> {
        let mut slot = self.slots.get_mut(id)?;
        match std::mem::replace(slot.value_mut(), Slot::Completed) {
            Slot::Bound(connection) => Some(connection),
            Slot::Completed => None,
        }
    }

    pub fn slot(&self, id: &str) -> Option<Slot> {
        self.slots.get(id).map(|slot| slot.value().clone())
    }

    /// Number of correlations currently in flight.
    pub fn bound_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Bound(_)))
            .count()
    }
}
