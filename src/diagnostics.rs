use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{debug, info};

/// Reports the first time each stage runs for a given input shape.
///
/// A new shape is where a tracing compiler would have to build a fresh
/// program, so these events show when a run is paying warm-up costs. Only
/// logged at INFO when enabled; otherwise at DEBUG.
#[derive(Debug, Default)]
pub struct CompileLog {
    enabled: bool,
    seen: Mutex<HashSet<(&'static str, Vec<usize>)>>,
}

impl CompileLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Returns whether this is the first time `stage` ran with `shape`.
    pub fn observe(&self, stage: &'static str, shape: &[usize]) -> bool {
        let first = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((stage, shape.to_vec()));
        if first {
            if self.enabled {
                info!(stage, ?shape, "compiling");
            } else {
                debug!(stage, ?shape, "compiling");
            }
        }
        first
    }
}
