//! Connection substrate of the operator graph.
//!
//! # Data Flow
//! ```text
//! Operator A                                  Operator B
//!   output Port ──── Connection (edge) ──── input Port
//!        │                                        │
//!        └── send_data(data, conn) ──────────────▶ receive_data(data, from_output=false)
//!        ◀── receive_data(data, from_output=true) ─┘ send_data(response, conn)
//! ```
//!
//! # Design Decisions
//! - `from_output` tells the receiver which of its own ports the data arrived on
//! - A send on a removed connection reports `false`; callers treat that as a
//!   torn-down stream

pub mod connection;
pub mod port;

pub use connection::{Connection, ConnectionId};
pub use port::Port;
