use tracing::{debug, warn};

use super::{Logger, LoggerError};
use crate::metrics::Metrics;

/// Owns a logger for the duration of a run and releases it exactly once:
/// explicitly through [`LoggerScope::close`], or on drop if the run bailed out
/// early.
pub struct LoggerScope<L: Logger> {
    logger: L,
    closed: bool,
}

impl<L: Logger> LoggerScope<L> {
    pub fn open(logger: L) -> Self {
        debug!("Starting logger.");
        Self {
            logger,
            closed: false,
        }
    }

    pub fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError> {
        if self.closed {
            return Err(LoggerError::Closed);
        }
        self.logger.write(data, label, env_steps)
    }

    pub fn renders_to_terminal(&self) -> bool {
        self.logger.renders_to_terminal()
    }

    pub fn close(mut self) -> Result<(), LoggerError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), LoggerError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing the logger.");
        self.logger.close()
    }
}

impl<L: Logger> Drop for LoggerScope<L> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "failed to close logger");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::ListLogger;

    #[test]
    fn test_explicit_close_releases_once() {
        let logger = ListLogger::new();
        let scope = LoggerScope::open(logger.clone());
        scope.close().unwrap();
        assert_eq!(logger.close_count(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let logger = ListLogger::new();
        {
            let mut scope = LoggerScope::open(logger.clone());
            scope.write(&Metrics::new(), "train", 0).unwrap();
        }
        assert_eq!(logger.close_count(), 1);
        assert_eq!(logger.records().len(), 1);
    }

    #[test]
    fn test_release_on_panic() {
        let logger = ListLogger::new();
        let handle = logger.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _scope = LoggerScope::open(logger);
            panic!("epoch failed");
        }));
        assert!(result.is_err());
        assert_eq!(handle.close_count(), 1);
    }
}
