//! Operators: the nodes of the topology graph.
//!
//! # Data Flow
//! ```text
//! Client ──▶ API (protocol engine) ──▶ Service / downstream API
//!              ▲
//! MessageQueue ┘ (consumer mode: the queue is the API's only input)
//! ```
//!
//! # Design Decisions
//! - The operator kind is decided at construction (`OperatorKind`), never
//!   inferred at runtime
//! - `receive_data` returns a boxed future so operators can call each other
//!   through `dyn DataOperator`
//! - Every operator owns an input and an output port

pub mod api;
pub mod client;
pub mod message_queue;
pub mod service;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::OperatorResult;
use crate::model::{Endpoint, RequestData};
use crate::net::{Connection, Port};

pub use api::{Api, ApiOptions};
pub use client::Client;
pub use message_queue::MessageQueue;
pub use service::Service;

/// Kind of a node in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Api,
    MessageQueue,
    Service,
    Client,
}

impl OperatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Api => "api",
            OperatorKind::MessageQueue => "message_queue",
            OperatorKind::Service => "service",
            OperatorKind::Client => "client",
        }
    }
}

/// Behaviour shared by every node of the topology.
pub trait DataOperator: Send + Sync {
    /// Id stamped on messages this operator creates.
    fn origin_id(&self) -> &str;

    fn kind(&self) -> OperatorKind;

    /// The output port when `output` is true, the input port otherwise.
    fn port(&self, output: bool) -> Arc<Port>;

    /// Endpoints this operator serves.
    fn available_endpoints(&self) -> Vec<Arc<Endpoint>>;

    /// Handle data arriving on one of this operator's ports.
    ///
    /// `from_output` is true when the data arrived on the output port, i.e.
    /// it is a response to something this operator sent downstream.
    fn receive_data(&self, data: RequestData, from_output: bool) -> BoxFuture<'_, OperatorResult<()>>;

    /// Wire one of this operator's ports to a port of `operator`.
    fn connect_to(
        &self,
        operator: &dyn DataOperator,
        connecting_with_output: bool,
        connecting_to_output: bool,
    ) -> Option<Connection> {
        self.port(connecting_with_output)
            .connect_to(&operator.port(connecting_to_output))
    }

    /// Called after a connection on one of this operator's ports was removed.
    fn on_connection_remove(&self, _was_output: bool) {}

    /// Sever every connection on both ports.
    fn destroy(&self) {
        self.port(false).remove_connections();
        self.port(true).remove_connections();
    }
}

/// Peer operator on the other end of `connection`, seen from `port`.
pub fn peer_operator(port: &Port, connection: &Connection) -> Option<Arc<dyn DataOperator>> {
    connection.other_port(port).ok().and_then(|peer| peer.parent())
}
