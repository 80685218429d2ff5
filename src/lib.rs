//! API topology simulator.
//!
//! A graph of operators (APIs, message queues, services, clients) wired
//! through ports and connections, exchanging synthetic request/response
//! messages. The API operator is the protocol engine: routing, 404/405
//! reporting, request correlation, fan-out and REST / WebSocket / gRPC
//! streaming semantics.

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod net;
pub mod observability;
pub mod operator;
pub mod routing;
pub mod util;

pub use config::SimulatorConfig;
pub use error::{ConnectionError, OperatorError, OperatorResult};
pub use operator::{Api, Client, DataOperator, MessageQueue, OperatorKind, Service};
