//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Operators produce:
//!     → logging.rs (structured log events, request ids as fields)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Correlation ids flow through every log line of the engine
//! - Metrics are cheap (facade calls, no-op without a recorder)

pub mod logging;
pub mod metrics;
