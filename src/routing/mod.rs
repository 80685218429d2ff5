//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (url, method)
//!     → router.rs (scan the operator's endpoint table)
//!     → matcher.rs (evaluate URL / method conditions)
//!     → Return: Found(endpoint), NotFound (404) or MethodNotAllowed (405)
//!
//! Fan-out action (target endpoint)
//!     → router.rs (scan output connections)
//!     → matcher.rs (route equality against each peer's endpoints)
//!     → Return: the first serving connection, if any
//! ```
//!
//! # Design Decisions
//! - Deterministic: same table and input always give the same result
//! - First match wins (table order)

pub mod matcher;
pub mod router;

pub use router::{resolve, select_connection, RouteMatch};
