mod errors;

pub use errors::ConfigError;

use std::path::{Path, PathBuf};

use ::config::{Config as Layered, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::device::{Device, LocalDevices};

const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub seed: u64,
    pub agent: AgentKind,
    pub logger: LoggerConfig,
    pub devices: DeviceConfig,
    pub env: EnvConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    A2c,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerKind {
    Terminal,
    Json,
    Noop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(rename = "type")]
    pub kind: LoggerKind,
    /// Filter directive for the tracing subscriber, e.g. `info` or `ferrum_a2c=debug`.
    pub level: String,
    /// Output file of the JSON logger.
    pub save_path: PathBuf,
    pub save_checkpoint: bool,
    pub checkpoint_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Number of replicas of the training state.
    pub local_devices: usize,
    /// Whether the primary device is an accelerator rather than the CPU.
    pub accelerator: bool,
    /// Where rollouts run when acting is not colocated with learning.
    pub acting_device: Device,
}

impl DeviceConfig {
    pub fn local(&self) -> LocalDevices {
        LocalDevices {
            count: self.local_devices,
            accelerator: self.accelerator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvName {
    Corridor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub name: EnvName,
    pub corridor: CorridorConfig,
    pub training: TrainingConfig,
    pub evaluation: EvaluationConfig,
    pub a2c: A2cConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorConfig {
    pub length: usize,
    pub time_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub num_epochs: usize,
    pub num_learner_steps_per_epoch: usize,
    pub n_steps: usize,
    pub total_batch_size: usize,
}

impl TrainingConfig {
    /// Environment steps one epoch accounts for. Saturates; `Config::validate`
    /// rejects configurations where it would overflow.
    pub fn steps_per_epoch(&self) -> u64 {
        self.checked_steps_per_epoch().unwrap_or(u64::MAX)
    }

    fn checked_steps_per_epoch(&self) -> Option<u64> {
        (self.n_steps as u64)
            .checked_mul(self.total_batch_size as u64)?
            .checked_mul(self.num_learner_steps_per_epoch as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub eval_total_batch_size: usize,
    pub greedy_eval_total_batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2cConfig {
    pub normalize_advantage: bool,
    pub discount_factor: f32,
    pub bootstrapping_factor: f32,
    pub l_pg: f32,
    pub l_td: f32,
    pub l_en: f32,
    pub learning_rate: f32,
}

impl Config {
    /// Load the built-in defaults, then `path` if given, then `FERRUM__*`
    /// environment overrides (e.g. `FERRUM__ENV__TRAINING__NUM_EPOCHS=10`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            Layered::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let builder = builder.add_source(
            Environment::with_prefix("FERRUM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Config = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a complete configuration from a TOML string layered over the defaults.
    pub fn from_toml(overrides: &str) -> Result<Self, ConfigError> {
        let cfg: Config = Layered::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(overrides, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.env.training;
        let evaluation = &self.env.evaluation;
        let replicas = self.devices.local_devices;

        if replicas == 0 {
            return invalid("devices.local_devices must be at least 1");
        }
        if training.n_steps == 0 || training.total_batch_size == 0 {
            return invalid("env.training.n_steps and env.training.total_batch_size must be positive");
        }
        if training.num_learner_steps_per_epoch == 0 {
            return invalid("env.training.num_learner_steps_per_epoch must be positive");
        }
        let total_steps = training
            .checked_steps_per_epoch()
            .and_then(|steps| steps.checked_mul(training.num_epochs as u64));
        if total_steps.is_none() {
            return invalid("env.training step counts overflow a 64-bit environment step counter");
        }
        if training.total_batch_size % replicas != 0 {
            return invalid(format!(
                "env.training.total_batch_size ({}) must be divisible by devices.local_devices ({replicas})",
                training.total_batch_size
            ));
        }
        for (name, size) in [
            ("eval_total_batch_size", evaluation.eval_total_batch_size),
            ("greedy_eval_total_batch_size", evaluation.greedy_eval_total_batch_size),
        ] {
            if size == 0 || size % replicas != 0 {
                return invalid(format!(
                    "env.evaluation.{name} ({size}) must be a positive multiple of devices.local_devices ({replicas})"
                ));
            }
        }
        let a2c = &self.env.a2c;
        if !(0.0..=1.0).contains(&a2c.discount_factor) || !(0.0..=1.0).contains(&a2c.bootstrapping_factor) {
            return invalid("env.a2c.discount_factor and env.a2c.bootstrapping_factor must lie in [0, 1]");
        }
        if a2c.learning_rate <= 0.0 {
            return invalid("env.a2c.learning_rate must be positive");
        }
        Ok(())
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}
