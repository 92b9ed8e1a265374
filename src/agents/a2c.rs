//! Advantage actor-critic over a linear softmax policy and a linear value head.
//!
//! The loss follows the usual A2C decomposition,
//! `l_pg * policy_loss + l_td * critic_loss + l_en * entropy_loss`, with
//! advantages computed as TD(λ) returns minus the critic's estimate. The
//! targets are treated as constants, so the gradients are closed-form.

use ndarray::Array1;

use super::acting::{self, ActionSample};
use super::errors::AgentError;
use super::networks::{argmax, entropy, log_softmax, sample_categorical};
use super::optimizer::Adam;
use super::traits::{ActionMode, Agent};
use super::types::{ActingState, ActorCriticParams, LinearParams, ParamsState, Trajectory, TrainingState};
use crate::device::Device;
use crate::env::{Env, VecEnv};
use crate::metrics::RawMetrics;
use crate::rng::{KeyRng, PrngKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct A2CHyperParams {
    pub normalize_advantage: bool,
    pub discount_factor: f32,
    /// λ of the TD(λ) returns.
    pub bootstrapping_factor: f32,
    pub l_pg: f32,
    pub l_td: f32,
    pub l_en: f32,
}

pub struct A2CAgent<E: Env> {
    env: VecEnv<E>,
    n_steps: usize,
    batch_size: usize,
    optimizer: Adam,
    hyper: A2CHyperParams,
}

impl<E: Env> A2CAgent<E> {
    pub fn new(
        env: VecEnv<E>,
        n_steps: usize,
        batch_size: usize,
        optimizer: Adam,
        hyper: A2CHyperParams,
    ) -> Result<Self, AgentError> {
        if n_steps == 0 || batch_size == 0 {
            return Err(AgentError::InvalidConfig(format!(
                "n_steps and batch_size must be positive, got {n_steps} and {batch_size}"
            )));
        }
        Ok(Self {
            env,
            n_steps,
            batch_size,
            optimizer,
            hyper,
        })
    }

    /// Advantages for a `T × B` trajectory, laid out time-major like the data.
    fn advantages(&self, params: &ActorCriticParams, data: &Trajectory) -> Vec<Vec<f32>> {
        let [n_steps, batch_size] = data.shape();
        let values: Vec<Vec<f32>> = data
            .steps
            .iter()
            .map(|row| row.iter().map(|tr| params.value(&tr.observation)).collect())
            .collect();
        let mut advantages = vec![vec![0.0; batch_size]; n_steps];

        let lambda = self.hyper.bootstrapping_factor;
        for b in 0..batch_size {
            let last = &data.steps[n_steps - 1][b];
            let mut next_value = params.value(&last.next_observation);
            let mut next_return = next_value;
            for t in (0..n_steps).rev() {
                let tr = &data.steps[t][b];
                let discount = self.hyper.discount_factor * tr.discount;
                let g = tr.reward + discount * ((1.0 - lambda) * next_value + lambda * next_return);
                advantages[t][b] = g - values[t][b];
                next_value = values[t][b];
                next_return = g;
            }
        }
        advantages
    }

    fn loss_and_grads(
        &self,
        params: &ActorCriticParams,
        data: &Trajectory,
    ) -> Result<(ActorCriticParams, RawMetrics), AgentError> {
        let shape = data.shape();
        let count = shape[0] * shape[1];
        if count == 0 {
            return Err(AgentError::EmptyTrajectory { shape });
        }
        let n = count as f32;

        let advantages: Vec<f32> = self.advantages(params, data).into_iter().flatten().collect();
        let mean_advantage = advantages.iter().sum::<f32>() / n;
        let critic_loss = advantages.iter().map(|a| a * a).sum::<f32>() / n;

        let policy_weights: Vec<f32> = if self.hyper.normalize_advantage {
            let var = advantages.iter().map(|a| (a - mean_advantage).powi(2)).sum::<f32>() / n;
            let std = var.sqrt();
            advantages.iter().map(|a| (a - mean_advantage) / (std + 1e-8)).collect()
        } else {
            advantages.clone()
        };

        let mut grads = params.zeros_like();
        let mut policy_loss = 0.0;
        let mut total_entropy = 0.0;

        let transitions = data.steps.iter().flatten();
        for ((tr, &advantage), &weight) in transitions.zip(&advantages).zip(&policy_weights) {
            let log_probs = log_softmax(&params.actor.forward(&tr.observation));
            let h = entropy(&log_probs);
            policy_loss -= weight * log_probs[tr.action];
            total_entropy += h;

            // d/dlogits of -w·log π(a) is w·(π - onehot(a)); of -H it is π·(log π + H).
            let d_logits = Array1::from_shape_fn(log_probs.len(), |j| {
                let p = log_probs[j].exp();
                let onehot = if j == tr.action { 1.0 } else { 0.0 };
                (self.hyper.l_pg * weight * (p - onehot) + self.hyper.l_en * p * (log_probs[j] + h)) / n
            });
            grads.actor.accumulate_grad(&tr.observation, &d_logits);

            let d_value = Array1::from_elem(1, -2.0 * self.hyper.l_td * advantage / n);
            grads.critic.accumulate_grad(&tr.observation, &d_value);
        }

        let policy_loss = policy_loss / n;
        let mean_entropy = total_entropy / n;
        let entropy_loss = -mean_entropy;
        let total_loss = self.hyper.l_pg * policy_loss
            + self.hyper.l_td * critic_loss
            + self.hyper.l_en * entropy_loss;

        let mut metrics = RawMetrics::new();
        metrics.push("total_loss", total_loss as f64);
        metrics.push("policy_loss", policy_loss as f64);
        metrics.push("critic_loss", critic_loss as f64);
        metrics.push("entropy_loss", entropy_loss as f64);
        metrics.push("entropy", mean_entropy as f64);
        metrics.push("advantage", mean_advantage as f64);
        Ok((grads, metrics))
    }
}

impl<E: Env> Agent for A2CAgent<E> {
    type Env = E;

    fn env(&self) -> &VecEnv<E> {
        &self.env
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn init_params(&self, key: PrngKey) -> ParamsState {
        let env = self.env.env();
        let params = ActorCriticParams::init(
            env.observation_dim(),
            env.num_actions(),
            key,
            Device::Cpu,
        );
        let opt_state = self.optimizer.init(&params);
        ParamsState {
            params,
            opt_state,
            update_count: 0,
        }
    }

    fn init_acting_state(&self, key: PrngKey) -> Result<ActingState<E::State>, AgentError> {
        Ok(acting::init_acting_state(
            &self.env,
            self.batch_size,
            key,
            Device::Cpu,
        )?)
    }

    fn select_action(
        &self,
        params: &ActorCriticParams,
        observation: &Array1<f32>,
        mode: ActionMode,
        rng: &mut KeyRng,
    ) -> usize {
        let logits = params.actor.forward(observation);
        match mode {
            ActionMode::Greedy => argmax(&logits),
            ActionMode::Stochastic => sample_categorical(&log_softmax(&logits), rng),
        }
    }

    fn rollout(
        &self,
        policy_params: &LinearParams,
        acting_state: ActingState<E::State>,
    ) -> Result<(ActingState<E::State>, Trajectory), AgentError> {
        let policy = |observation: &Array1<f32>, rng: &mut KeyRng| {
            let logits = policy_params.forward(observation);
            let log_probs = log_softmax(&logits);
            let action = sample_categorical(&log_probs, rng);
            ActionSample {
                action,
                log_prob: log_probs[action],
                logits,
            }
        };
        Ok(acting::rollout(&self.env, acting_state, self.n_steps, policy)?)
    }

    fn gradient_step(
        &self,
        training_state: TrainingState<E::State>,
        data: &Trajectory,
    ) -> Result<(TrainingState<E::State>, RawMetrics), AgentError> {
        let (grads, mut metrics) = self.loss_and_grads(&training_state.params_state.params, data)?;

        let TrainingState {
            params_state,
            acting_state,
        } = training_state;
        let (params, opt_state) = self.optimizer.update(&grads, params_state.opt_state, params_state.params);

        for episode in &data.completed_episodes {
            metrics.push("episode_return", episode.episode_return as f64);
            metrics.push("episode_length", episode.episode_length as f64);
        }

        let params_state = ParamsState {
            params,
            opt_state,
            update_count: params_state.update_count + 1,
        };
        Ok((
            TrainingState {
                params_state,
                acting_state,
            },
            metrics,
        ))
    }
}
