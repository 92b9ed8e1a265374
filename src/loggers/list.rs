use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{Logger, LoggerError};
use crate::metrics::Metrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub label: String,
    pub env_steps: u64,
    pub metrics: Metrics,
}

/// Keeps every write in memory. Clones share the same storage, so a handle
/// kept outside a run can inspect what the run logged.
#[derive(Debug, Clone, Default)]
pub struct ListLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
    closes: Arc<AtomicUsize>,
}

impl ListLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        // A poisoned list still holds every record written before the panic.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Logger for ListLogger {
    fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError> {
        self.lock().push(LogRecord {
            label: label.to_string(),
            env_steps,
            metrics: data.clone(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
