use super::{Logger, LoggerError};
use crate::metrics::Metrics;

#[derive(Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn write(&mut self, _data: &Metrics, _label: &str, _env_steps: u64) -> Result<(), LoggerError> {
        Ok(())
    }
}
