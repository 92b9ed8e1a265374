use super::errors::LoggerError;
use crate::metrics::Metrics;

/// A sink for labelled metrics.
///
/// Loggers are scoped resources: acquire one through
/// [`LoggerScope`](super::LoggerScope) so that `close` runs exactly once.
pub trait Logger: Send {
    fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError>;

    /// Flush and release whatever the logger holds.
    fn close(&mut self) -> Result<(), LoggerError> {
        Ok(())
    }

    /// Whether writes already show up on the terminal, in which case a progress
    /// bar would double the output.
    fn renders_to_terminal(&self) -> bool {
        false
    }
}

impl<L: Logger + ?Sized> Logger for Box<L> {
    fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError> {
        (**self).write(data, label, env_steps)
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        (**self).close()
    }

    fn renders_to_terminal(&self) -> bool {
        (**self).renders_to_terminal()
    }
}
