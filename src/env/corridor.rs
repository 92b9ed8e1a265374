use ndarray::Array1;
use rand::Rng;

use super::{Env, EnvError, StepType, TimeStep};
use crate::rng::PrngKey;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// A one-dimensional walk towards a goal cell.
///
/// Episodes start in the left half of the corridor, observe a one-hot encoding
/// of the position and end with reward 1 on reaching the rightmost cell, or
/// are truncated after `time_limit` steps.
#[derive(Debug, Clone)]
pub struct Corridor {
    length: usize,
    time_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorridorState {
    position: usize,
    step_count: u32,
}

impl CorridorState {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }
}

impl Corridor {
    pub fn new(length: usize, time_limit: u32) -> Result<Self, EnvError> {
        if length < 2 {
            return Err(EnvError::InvalidConfig(format!(
                "corridor length must be at least 2, got {length}"
            )));
        }
        if time_limit == 0 {
            return Err(EnvError::InvalidConfig(
                "corridor time_limit must be positive".to_string(),
            ));
        }
        Ok(Self { length, time_limit })
    }

    pub fn goal(&self) -> usize {
        self.length - 1
    }

    fn observe(&self, position: usize) -> Array1<f32> {
        let mut observation = Array1::zeros(self.length);
        observation[position] = 1.0;
        observation
    }
}

impl Env for Corridor {
    type State = CorridorState;

    fn observation_dim(&self) -> usize {
        self.length
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&self, key: PrngKey) -> Result<(Self::State, TimeStep), EnvError> {
        let position = key.rng().random_range(0..(self.length / 2).max(1));
        let state = CorridorState {
            position,
            step_count: 0,
        };
        Ok((state, TimeStep::first(self.observe(position))))
    }

    fn step(&self, state: Self::State, action: usize) -> Result<(Self::State, TimeStep), EnvError> {
        let position = match action {
            LEFT => state.position.saturating_sub(1),
            RIGHT => (state.position + 1).min(self.goal()),
            _ => {
                return Err(EnvError::InvalidAction {
                    action,
                    num_actions: self.num_actions(),
                });
            }
        };
        let step_count = state.step_count + 1;
        let reached_goal = position == self.goal();

        let (step_type, reward, discount) = if reached_goal {
            (StepType::Last, 1.0, 0.0)
        } else if step_count >= self.time_limit {
            (StepType::Last, 0.0, 1.0)
        } else {
            (StepType::Mid, 0.0, 1.0)
        };

        let timestep = TimeStep {
            step_type,
            reward,
            discount,
            observation: self.observe(position),
        };
        Ok((CorridorState { position, step_count }, timestep))
    }
}
