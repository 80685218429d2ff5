//! Small shared helpers: identifiers, method-set equality, delays.

use std::collections::BTreeSet;
use std::time::Duration;

/// Generate a fresh correlation / operator identifier (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Order-insensitive equality of two slices.
///
/// Duplicates are ignored, so `[GET, GET]` equals `[GET]`.
pub fn set_equals<T: Ord>(a: &[T], b: &[T]) -> bool {
    let a: BTreeSet<&T> = a.iter().collect();
    let b: BTreeSet<&T> = b.iter().collect();
    a == b
}

/// Suspend the current task for `ms` milliseconds.
pub async fn delay(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
