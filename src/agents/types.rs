use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::agents::optimizer::AdamState;
use crate::device::{Device, DevicePut};
use crate::env::TimeStep;
use crate::rng::PrngKey;

/// A dense layer, `y = W x + b` with `W` shaped `(out, in)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub device: Device,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCriticParams {
    pub actor: LinearParams,
    pub critic: LinearParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsState {
    pub params: ActorCriticParams,
    pub opt_state: AdamState,
    pub update_count: u64,
}

/// Runtime state of the acting environments, carried across rollouts.
#[derive(Debug, Clone)]
pub struct ActingState<S> {
    pub env_states: Vec<S>,
    /// The timestep each environment will act on next.
    pub timesteps: Vec<TimeStep>,
    pub key: PrngKey,
    /// Return accumulated so far in each environment's current episode.
    pub episode_returns: Vec<f32>,
    pub episode_lengths: Vec<u32>,
    pub episode_count: u64,
    pub env_step_count: u64,
    pub device: Device,
}

impl<S> ActingState<S> {
    pub fn batch_size(&self) -> usize {
        self.env_states.len()
    }
}

#[derive(Debug, Clone)]
pub struct TrainingState<S> {
    pub params_state: ParamsState,
    pub acting_state: ActingState<S>,
}

impl<S> TrainingState<S> {
    pub fn with_acting_state(self, acting_state: ActingState<S>) -> Self {
        Self {
            acting_state,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub discount: f32,
    pub next_observation: Array1<f32>,
    pub log_prob: f32,
    pub logits: Array1<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub episode_return: f32,
    pub episode_length: u32,
}

/// One rollout: `steps[t][b]` is environment `b` at time `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub steps: Vec<Vec<Transition>>,
    pub completed_episodes: Vec<EpisodeStats>,
    pub device: Device,
}

impl Trajectory {
    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn batch_size(&self) -> usize {
        self.steps.first().map_or(0, Vec::len)
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.n_steps(), self.batch_size()]
    }
}

impl DevicePut for LinearParams {
    fn device_put(self, device: Device) -> Self {
        Self { device, ..self }
    }
}

impl DevicePut for ActorCriticParams {
    fn device_put(self, device: Device) -> Self {
        Self {
            actor: self.actor.device_put(device),
            critic: self.critic.device_put(device),
        }
    }
}

impl DevicePut for ParamsState {
    fn device_put(self, device: Device) -> Self {
        Self {
            params: self.params.device_put(device),
            ..self
        }
    }
}

impl<S> DevicePut for ActingState<S> {
    fn device_put(self, device: Device) -> Self {
        Self { device, ..self }
    }
}

impl<S> DevicePut for TrainingState<S> {
    fn device_put(self, device: Device) -> Self {
        Self {
            params_state: self.params_state.device_put(device),
            acting_state: self.acting_state.device_put(device),
        }
    }
}

impl DevicePut for Trajectory {
    fn device_put(self, device: Device) -> Self {
        Self { device, ..self }
    }
}
