pub mod agents;
pub mod checkpoint;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod loggers;
pub mod logging;
pub mod metrics;
pub mod rng;
pub mod setup;
pub mod timer;
pub mod train;

#[cfg(feature = "python")]
mod python;

pub use config::Config;
pub use error::TrainError;
pub use train::{TrainOptions, Trainer, TrainingStats, run_epoch, train};
