use std::time::{Duration, Instant};

use crate::metrics::Metrics;

/// Times a scope and records the result into that scope's metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer {
    num_steps_per_timing: Option<u64>,
}

/// A running measurement; finish it with [`Timer::record`].
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer that also reports `steps_per_second` for a fixed amount of work.
    pub fn with_steps(num_steps_per_timing: u64) -> Self {
        Self {
            num_steps_per_timing: Some(num_steps_per_timing),
        }
    }

    pub fn start(&self) -> Stopwatch {
        Stopwatch {
            started: Instant::now(),
        }
    }

    pub fn record(&self, stopwatch: Stopwatch, metrics: &mut Metrics) -> Duration {
        let elapsed = stopwatch.started.elapsed();
        self.annotate(elapsed, metrics);
        elapsed
    }

    pub fn annotate(&self, elapsed: Duration, metrics: &mut Metrics) {
        let seconds = elapsed.as_secs_f64();
        metrics.insert("time".to_string(), seconds);
        if let Some(steps) = self.num_steps_per_timing {
            if seconds > 0.0 {
                metrics.insert("steps_per_second".to_string(), steps as f64 / seconds);
            }
        }
    }
}
