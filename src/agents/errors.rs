use thiserror::Error;

use crate::env::EnvError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent error: {0}")]
    AgentError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Invalid agent configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty trajectory: cannot take a gradient step on shape {shape:?}")]
    EmptyTrajectory { shape: [usize; 2] },
}
