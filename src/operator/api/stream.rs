//! Server-push streams.
//!
//! # States
//! ```text
//! start_stream → [wait interval] → check → send frame → [wait interval] → ...
//!                                    │
//!                                    └─ stop when: correlation no longer bound,
//!                                       endpoint no longer pushes, endpoint
//!                                       de-registered, stop handle fired or
//!                                       dropped, operator dropped
//! ```
//!
//! # Design Decisions
//! - One tokio task per active stream
//! - Each task owns a watch receiver; the sender is its stop handle, stored
//!   per correlation id
//! - Generations keep a finished task from removing a newer handle for the
//!   same id

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Endpoint, RequestData};
use crate::observability::metrics;
use crate::operator::api::Api;
use crate::util::delay;

#[derive(Debug)]
struct StreamHandle {
    generation: u64,
    stop: watch::Sender<bool>,
}

/// Stop handles of the running streams, keyed by correlation id.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    handles: DashMap<String, StreamHandle>,
    generation: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream for `id`, stopping any previous one.
    pub fn register(&self, id: &str) -> (u64, watch::Receiver<bool>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (stop, rx) = watch::channel(false);
        if let Some(previous) = self.handles.insert(id.to_string(), StreamHandle { generation, stop }) {
            let _ = previous.stop.send(true);
        }
        metrics::record_active_streams(self.handles.len());
        (generation, rx)
    }

    /// Stop the stream for `id`. Returns false if none was running.
    pub fn stop(&self, id: &str) -> bool {
        match self.handles.remove(id) {
            Some((_, handle)) => {
                let _ = handle.stop.send(true);
                metrics::record_active_streams(self.handles.len());
                true
            }
            None => false,
        }
    }

    /// Forget the handle of a task that ended on its own.
    pub fn finish(&self, id: &str, generation: u64) {
        self.handles.remove_if(id, |_, handle| handle.generation == generation);
        metrics::record_active_streams(self.handles.len());
    }

    pub fn stop_all(&self) {
        let ids: Vec<String> = self.handles.iter().map(|h| h.key().clone()).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    /// True if the handle registered for `id` is still `generation`.
    pub fn is_current(&self, id: &str, generation: u64) -> bool {
        self.handles
            .get(id)
            .map(|handle| handle.generation == generation)
            .unwrap_or(false)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Push `frame` back to the caller every `interval_ms` until a stop condition holds.
pub(super) async fn run_stream(
    api: Weak<Api>,
    frame: RequestData,
    endpoint: Arc<Endpoint>,
    interval_ms: u64,
    generation: u64,
    mut stop: watch::Receiver<bool>,
) {
    let id = frame.response_id.clone();
    tracing::debug!(request_id = %id, url = %endpoint.url, "Stream started");

    loop {
        tokio::select! {
            _ = delay(interval_ms) => {}
            _ = stop.changed() => {
                tracing::debug!(request_id = %id, "Stream stopped by handle");
                break;
            }
        }

        let Some(operator) = api.upgrade() else {
            break;
        };
        if !operator.should_keep_streaming(&id, &endpoint) {
            tracing::debug!(request_id = %id, "Stream condition no longer holds");
            break;
        }
        if let Err(e) = operator.send_data(frame.clone()).await {
            tracing::warn!(request_id = %id, error = %e, "Stream frame failed");
            if operator.streams.is_current(&id, generation) {
                operator.terminate(&id);
            }
            break;
        }
        metrics::record_stream_frame();
    }

    if let Some(operator) = api.upgrade() {
        operator.streams.finish(&id, generation);
    }
}
