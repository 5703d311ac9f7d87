//! Request registry: correlation of outbound request ids to method names.

use std::collections::HashMap;

use tracing::trace;

/// Maps in-flight request ids to the method that issued them.
///
/// Each entry is consumed by the first [`RequestRegistry::take_method_for`],
/// so one response correlates to at most one request.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    entries: HashMap<i64, String>,
}

impl RequestRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that request `id` was issued for `method`. A reused id
    /// overwrites the previous entry.
    pub fn register(&mut self, id: i64, method: impl Into<String>) {
        let method = method.into();
        trace!(id, %method, "request registered");
        let _ = self.entries.insert(id, method);
    }

    /// Read and remove the method registered for `id`.
    pub fn take_method_for(&mut self, id: i64) -> Option<String> {
        self.entries.remove(&id)
    }

    /// Whether `id` is in flight.
    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
