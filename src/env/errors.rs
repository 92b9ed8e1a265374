use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment error: {0}")]
    EnvError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Action count {actions} doesn't match environment count {envs}")]
    BatchMismatch { actions: usize, envs: usize },

    #[error("Invalid action {action}: environment has {num_actions} actions")]
    InvalidAction { action: usize, num_actions: usize },

    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),
}
