use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Logger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Logger already closed")]
    Closed,
}
