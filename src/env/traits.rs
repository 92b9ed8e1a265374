use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::env::errors::EnvError;
use crate::rng::PrngKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// What the agent sees after a reset or a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    pub step_type: StepType,
    pub reward: f32,
    /// 0 on termination, 1 otherwise (including time-limit truncation).
    pub discount: f32,
    pub observation: Array1<f32>,
}

impl TimeStep {
    pub fn first(observation: Array1<f32>) -> Self {
        Self {
            step_type: StepType::First,
            reward: 0.0,
            discount: 1.0,
            observation,
        }
    }

    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}

/// A functional environment: the state is a value threaded through `step`
/// rather than hidden inside `self`, so batches and replicas can be copied,
/// relocated and replayed.
pub trait Env: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;

    fn observation_dim(&self) -> usize;
    fn num_actions(&self) -> usize;

    fn reset(&self, key: PrngKey) -> Result<(Self::State, TimeStep), EnvError>;
    fn step(&self, state: Self::State, action: usize) -> Result<(Self::State, TimeStep), EnvError>;
}
