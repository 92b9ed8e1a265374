use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{Logger, LoggerError};
use crate::metrics::Metrics;

#[derive(Serialize)]
struct JsonRecord<'a> {
    run_id: Uuid,
    label: &'a str,
    env_steps: u64,
    metrics: &'a Metrics,
}

/// Appends one JSON object per write to a file. Writes are buffered and
/// flushed on close.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    run_id: Uuid,
    writer: Option<BufWriter<File>>,
}

impl JsonLogger {
    pub fn create(path: impl AsRef<Path>, run_id: Uuid) -> Result<Self, LoggerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), %run_id, "json logger opened");
        Ok(Self {
            path,
            run_id,
            writer: Some(BufWriter::new(file)),
        })
    }
}

impl Logger for JsonLogger {
    fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError> {
        let writer = self.writer.as_mut().ok_or(LoggerError::Closed)?;
        let record = JsonRecord {
            run_id: self.run_id,
            label,
            env_steps,
            metrics: data,
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(path = %self.path.display(), "json logger flushed");
        }
        Ok(())
    }
}
