use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use crate::agents::{ActionMode, Agent, AgentError, ParamsState};
use crate::device::Replicated;
use crate::env::EnvError;
use crate::metrics::{Metrics, RawMetrics};
use crate::rng::PrngKey;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("evaluation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid evaluation configuration: {0}")]
    InvalidConfig(String),
}

/// Runs the current policy and reports episode metrics, one set per replica.
#[async_trait]
pub trait Evaluate: Send + Sync {
    async fn run_evaluation(
        &self,
        params_state: Replicated<ParamsState>,
        key: PrngKey,
    ) -> Result<Replicated<Metrics>, EvalError>;
}

/// Plays one episode in each of `total_batch_size` environments, split evenly
/// across replicas.
pub struct Evaluator<A> {
    agent: Arc<A>,
    total_batch_size: usize,
    mode: ActionMode,
}

impl<A: Agent> Evaluator<A> {
    pub fn new(agent: Arc<A>, total_batch_size: usize, mode: ActionMode) -> Result<Self, EvalError> {
        if total_batch_size == 0 {
            return Err(EvalError::InvalidConfig(
                "evaluation batch size must be positive".to_string(),
            ));
        }
        Ok(Self {
            agent,
            total_batch_size,
            mode,
        })
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }
}

#[async_trait]
impl<A: Agent> Evaluate for Evaluator<A> {
    async fn run_evaluation(
        &self,
        params_state: Replicated<ParamsState>,
        key: PrngKey,
    ) -> Result<Replicated<Metrics>, EvalError> {
        let num_replicas = params_state.len();
        let batch_size = (self.total_batch_size / num_replicas).max(1);
        let keys = key.split(num_replicas);

        let tasks = params_state.into_vec().into_iter().zip(keys).map(|(params_state, key)| {
            let agent = Arc::clone(&self.agent);
            let mode = self.mode;
            tokio::task::spawn_blocking(move || evaluate_episodes(&*agent, &params_state, batch_size, mode, key))
        });

        let mut per_replica = Vec::with_capacity(num_replicas);
        for result in join_all(tasks).await {
            per_replica.push(result??);
        }
        Replicated::new(per_replica)
            .ok_or_else(|| EvalError::InvalidConfig("no replicas to evaluate".to_string()))
    }
}

/// Play one full episode per environment and average the outcomes.
pub fn evaluate_episodes<A: Agent>(
    agent: &A,
    params_state: &ParamsState,
    batch_size: usize,
    mode: ActionMode,
    key: PrngKey,
) -> Result<Metrics, EvalError> {
    let env = agent.env();
    let [reset_key, policy_key] = key.split_n::<2>();
    let (mut states, mut timesteps) = env.reset(&reset_key.split(batch_size))?;
    let mut rng = policy_key.rng();

    let mut returns = vec![0.0f64; batch_size];
    let mut lengths = vec![0u32; batch_size];
    let mut done = vec![false; batch_size];

    while done.iter().any(|d| !d) {
        let actions: Vec<usize> = timesteps
            .iter()
            .map(|timestep| agent.select_action(&params_state.params, &timestep.observation, mode, &mut rng))
            .collect();
        let (next_states, next_timesteps) = env.step(states, &actions)?;

        for (b, timestep) in next_timesteps.iter().enumerate() {
            if done[b] {
                continue;
            }
            returns[b] += timestep.reward as f64;
            lengths[b] += 1;
            done[b] = timestep.is_last();
        }
        states = next_states;
        timesteps = next_timesteps;
    }

    let mut metrics = RawMetrics::new();
    metrics.extend("episode_return", returns);
    metrics.extend("episode_length", lengths.into_iter().map(f64::from));
    debug!(batch_size, ?mode, "evaluation finished");
    Ok(metrics.reduce_mean())
}
