use ndarray::Array1;

use super::errors::AgentError;
use super::types::{ActingState, ActorCriticParams, LinearParams, ParamsState, Trajectory, TrainingState};
use crate::env::{Env, VecEnv};
use crate::metrics::RawMetrics;
use crate::rng::{KeyRng, PrngKey};

/// How a policy turns its action distribution into an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    /// Sample from the distribution.
    Stochastic,
    /// Take the most likely action.
    Greedy,
}

pub type EnvState<A> = <<A as Agent>::Env as Env>::State;

/// An actor-critic agent: it collects experience with `rollout` and learns
/// from it with `gradient_step`. Both are pure: state comes in by value and a
/// new state goes out.
pub trait Agent: Send + Sync + 'static {
    type Env: Env;

    fn env(&self) -> &VecEnv<Self::Env>;

    /// Agents whose policy ignores its parameters. Greedy evaluation is
    /// meaningless for them.
    fn is_random_policy(&self) -> bool {
        false
    }

    /// Number of environments stepped per rollout step.
    fn batch_size(&self) -> usize;

    /// Number of time steps per rollout.
    fn n_steps(&self) -> usize;

    fn init_params(&self, key: PrngKey) -> ParamsState;

    fn init_acting_state(&self, key: PrngKey) -> Result<ActingState<EnvState<Self>>, AgentError>;

    fn select_action(
        &self,
        params: &ActorCriticParams,
        observation: &Array1<f32>,
        mode: ActionMode,
        rng: &mut KeyRng,
    ) -> usize;

    fn rollout(
        &self,
        policy_params: &LinearParams,
        acting_state: ActingState<EnvState<Self>>,
    ) -> Result<(ActingState<EnvState<Self>>, Trajectory), AgentError>;

    fn gradient_step(
        &self,
        training_state: TrainingState<EnvState<Self>>,
        data: &Trajectory,
    ) -> Result<(TrainingState<EnvState<Self>>, RawMetrics), AgentError>;
}
