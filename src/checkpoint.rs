use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::agents::ParamsState;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Learned parameters plus enough context to tell runs apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: Uuid,
    pub env_steps: u64,
    pub params_state: ParamsState,
}

pub fn save(path: impl AsRef<Path>, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, checkpoint)?;
    writer.flush()?;
    info!(path = %path.display(), env_steps = checkpoint.env_steps, "checkpoint saved");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Checkpoint, CheckpointError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ActorCriticParams, Adam};
    use crate::device::Device;
    use crate::rng::PrngKey;

    #[test]
    fn test_save_then_load() {
        let params = ActorCriticParams::init(4, 2, PrngKey::new(0), Device::Accelerator(0));
        let checkpoint = Checkpoint {
            run_id: Uuid::new_v4(),
            env_steps: 1_024,
            params_state: ParamsState {
                opt_state: Adam::new(0.1).init(&params),
                params,
                update_count: 3,
            },
        };
        let path = std::env::temp_dir().join(format!("ferrum-a2c-ckpt-{}.json", checkpoint.run_id));
        save(&path, &checkpoint).unwrap();
        assert_eq!(load(&path).unwrap(), checkpoint);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("ferrum-a2c-missing-{}.json", Uuid::new_v4()));
        assert!(matches!(load(path), Err(CheckpointError::Io(_))));
    }
}
