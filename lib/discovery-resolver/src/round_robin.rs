//! Round-robin selection across resolved downstreams

use discovery_core::ResolvedDownstream;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks downstreams in turn; safe to share across connections
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the next downstream, or `None` when the set is empty
    pub fn select<'a>(&self, downstreams: &'a [ResolvedDownstream]) -> Option<&'a ResolvedDownstream> {
        if downstreams.is_empty() {
            return None;
        }

        let current = self.counter.fetch_add(1, Ordering::Relaxed);
        downstreams.get(current % downstreams.len())
    }
}
