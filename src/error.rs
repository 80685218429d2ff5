//! Error types shared by the operator graph.
//!
//! # Taxonomy
//! - Validation errors are raised before any state is touched
//! - Correlation misses mean a response arrived for an unknown or closed id
//! - Protocol violations mean the topology put a stream into a contradictory state
//!
//! Routing misses (404/405) are not errors; they travel on the status-code
//! event channel of the operator.

use thiserror::Error;

/// Errors raised while routing messages between operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorError {
    /// Inbound request carried an empty request id.
    #[error("request id can not be empty")]
    InvalidRequestId,

    /// Inbound request carried no endpoint reference.
    #[error("request header carries no endpoint")]
    MissingEndpoint,

    /// A new request carried no origin connection to answer on.
    #[error("request {0} carries no origin connection")]
    MissingOrigin(String),

    /// No in-flight connection is bound to the correlation id.
    #[error("no target connection bound for correlation id {0}")]
    MissingTargetConnection(String),

    /// Stream state contradicts the endpoint's streaming mode.
    #[error("protocol violation on {url}: {reason}")]
    ProtocolViolation { url: String, reason: String },

    /// Operator has no outgoing connection to send on.
    #[error("operator {0} has no outgoing connection")]
    NotConnected(String),
}

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Errors raised by the connection substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The port is not one of the two ends of the connection.
    #[error("port is not an end of connection {0}")]
    ForeignPort(String),

    /// One end of the connection has already been dropped.
    #[error("connection {0} lost one of its ports")]
    Detached(String),
}
