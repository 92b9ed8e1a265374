use thiserror::Error;

use crate::agents::AgentError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::env::EnvError;
use crate::evaluator::EvalError;
use crate::loggers::LoggerError;

/// Anything that can stop a training run.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("training task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
