use ndarray::Array1;
use rand::Rng;

use super::acting::{self, ActionSample};
use super::errors::AgentError;
use super::optimizer::Adam;
use super::traits::{ActionMode, Agent};
use super::types::{ActingState, ActorCriticParams, LinearParams, ParamsState, Trajectory, TrainingState};
use crate::device::Device;
use crate::env::{Env, VecEnv};
use crate::metrics::RawMetrics;
use crate::rng::{KeyRng, PrngKey};

/// Acts uniformly at random and never learns. Useful as a baseline.
pub struct RandomAgent<E: Env> {
    env: VecEnv<E>,
    n_steps: usize,
    batch_size: usize,
}

impl<E: Env> RandomAgent<E> {
    pub fn new(env: VecEnv<E>, n_steps: usize, batch_size: usize) -> Result<Self, AgentError> {
        if n_steps == 0 || batch_size == 0 {
            return Err(AgentError::InvalidConfig(format!(
                "n_steps and batch_size must be positive, got {n_steps} and {batch_size}"
            )));
        }
        Ok(Self {
            env,
            n_steps,
            batch_size,
        })
    }

    fn num_actions(&self) -> usize {
        self.env.env().num_actions()
    }
}

impl<E: Env> Agent for RandomAgent<E> {
    type Env = E;

    fn env(&self) -> &VecEnv<E> {
        &self.env
    }

    fn is_random_policy(&self) -> bool {
        true
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    // The parameters are never read; they only keep the training state shape
    // uniform across agents.
    fn init_params(&self, key: PrngKey) -> ParamsState {
        let params = ActorCriticParams::init(
            self.env.env().observation_dim(),
            self.num_actions(),
            key,
            Device::Cpu,
        );
        let opt_state = Adam::new(0.0).init(&params);
        ParamsState {
            params,
            opt_state,
            update_count: 0,
        }
    }

    fn init_acting_state(&self, key: PrngKey) -> Result<ActingState<E::State>, AgentError> {
        Ok(acting::init_acting_state(&self.env, self.batch_size, key, Device::Cpu)?)
    }

    fn select_action(
        &self,
        _params: &ActorCriticParams,
        _observation: &Array1<f32>,
        _mode: ActionMode,
        rng: &mut KeyRng,
    ) -> usize {
        rng.random_range(0..self.num_actions())
    }

    fn rollout(
        &self,
        _policy_params: &LinearParams,
        acting_state: ActingState<E::State>,
    ) -> Result<(ActingState<E::State>, Trajectory), AgentError> {
        let num_actions = self.num_actions();
        let log_prob = -(num_actions as f32).ln();
        let policy = |_: &Array1<f32>, rng: &mut KeyRng| ActionSample {
            action: rng.random_range(0..num_actions),
            log_prob,
            logits: Array1::zeros(num_actions),
        };
        Ok(acting::rollout(&self.env, acting_state, self.n_steps, policy)?)
    }

    fn gradient_step(
        &self,
        training_state: TrainingState<E::State>,
        data: &Trajectory,
    ) -> Result<(TrainingState<E::State>, RawMetrics), AgentError> {
        let mut metrics = RawMetrics::new();
        for episode in &data.completed_episodes {
            metrics.push("episode_return", episode.episode_return as f64);
            metrics.push("episode_length", episode.episode_length as f64);
        }
        Ok((training_state, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Corridor;

    #[test]
    fn test_gradient_step_leaves_params_alone() {
        let agent = RandomAgent::new(VecEnv::new(Corridor::new(3, 5).unwrap()), 6, 4).unwrap();
        assert!(agent.is_random_policy());

        let [params_key, acting_key] = PrngKey::new(0).split_n::<2>();
        let state = TrainingState {
            params_state: agent.init_params(params_key),
            acting_state: agent.init_acting_state(acting_key).unwrap(),
        };
        let (acting_state, data) = agent
            .rollout(&state.params_state.params.actor, state.acting_state.clone())
            .unwrap();
        assert_eq!(data.shape(), [6, 4]);

        let before = state.params_state.clone();
        let (next, metrics) = agent.gradient_step(state.with_acting_state(acting_state), &data).unwrap();
        assert_eq!(next.params_state, before);
        let metrics = metrics.reduce_mean();
        assert!(metrics.keys().all(|k| k.starts_with("episode_")));
    }
}
