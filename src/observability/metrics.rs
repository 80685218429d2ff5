//! Metrics collection.
//!
//! # Metrics
//! - `topology_requests_total` (counter): accepted requests by operator kind
//! - `topology_status_total` (counter): routing misses by status code
//! - `topology_fanout_total` (counter): requests dispatched to downstream actions
//! - `topology_stream_frames_total` (counter): server-push frames sent
//! - `topology_active_streams` (gauge): running server-push tasks
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - A global switch lets the config turn recording off

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn metric recording on or off.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn record_request(operator: &'static str) {
    if enabled() {
        metrics::counter!("topology_requests_total", "operator" => operator).increment(1);
    }
}

pub fn record_status(code: u16) {
    if enabled() {
        metrics::counter!("topology_status_total", "code" => code.to_string()).increment(1);
    }
}

pub fn record_fan_out(url: &str) {
    if enabled() {
        metrics::counter!("topology_fanout_total", "url" => url.to_string()).increment(1);
    }
}

pub fn record_stream_frame() {
    if enabled() {
        metrics::counter!("topology_stream_frames_total").increment(1);
    }
}

pub fn record_active_streams(count: usize) {
    if enabled() {
        metrics::gauge!("topology_active_streams").set(count as f64);
    }
}
