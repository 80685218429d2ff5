//! Observer registry for operator notifications.
//!
//! Handlers are invoked synchronously, in registration order, outside the
//! registry lock so a handler may register further handlers.

use std::sync::{Arc, Mutex};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A list of handlers for one event type.
pub struct EventDispatcher<E> {
    handlers: Mutex<Vec<Handler<E>>>,
}

impl<E> EventDispatcher<E> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn register<F>(&self, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(handler));
    }

    pub fn fire(&self, event: &E) {
        let handlers: Vec<Handler<E>> = self.lock().clone();
        for handler in handlers {
            handler(event);
        }
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Handler<E>>> {
        // A panicking handler never runs under the lock, so poisoning is harmless.
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.len())
            .finish()
    }
}
