//! Builds the pieces of a training run from a [`Config`].

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::agents::{
    A2CAgent, A2CHyperParams, ActionMode, Adam, Agent, AgentError, EnvState, ParamsState, RandomAgent,
    TrainingState,
};
use crate::config::{Config, EnvName, LoggerConfig, LoggerKind};
use crate::device::{Device, DevicePut, LocalDevices, Replicated};
use crate::env::{Corridor, EnvError, VecEnv};
use crate::evaluator::{EvalError, Evaluator};
use crate::loggers::{JsonLogger, Logger, LoggerError, NoOpLogger, TerminalLogger};
use crate::rng::PrngKey;

pub fn setup_logger(cfg: &LoggerConfig, run_id: Uuid) -> Result<Box<dyn Logger>, LoggerError> {
    let logger: Box<dyn Logger> = match cfg.kind {
        LoggerKind::Terminal => Box::new(TerminalLogger::new()),
        LoggerKind::Json => Box::new(JsonLogger::create(&cfg.save_path, run_id)?),
        LoggerKind::Noop => Box::new(NoOpLogger),
    };
    Ok(logger)
}

pub fn setup_env(cfg: &Config) -> Result<VecEnv<Corridor>, EnvError> {
    match cfg.env.name {
        EnvName::Corridor => {
            let corridor = &cfg.env.corridor;
            Ok(VecEnv::new(Corridor::new(corridor.length, corridor.time_limit)?))
        }
    }
}

/// Environments each replica steps, given a total across all replicas.
pub fn per_replica(total_batch_size: usize, num_replicas: usize) -> usize {
    (total_batch_size / num_replicas.max(1)).max(1)
}

pub fn setup_a2c_agent(cfg: &Config, env: VecEnv<Corridor>) -> Result<A2CAgent<Corridor>, AgentError> {
    let training = &cfg.env.training;
    let a2c = &cfg.env.a2c;
    let hyper = A2CHyperParams {
        normalize_advantage: a2c.normalize_advantage,
        discount_factor: a2c.discount_factor,
        bootstrapping_factor: a2c.bootstrapping_factor,
        l_pg: a2c.l_pg,
        l_td: a2c.l_td,
        l_en: a2c.l_en,
    };
    A2CAgent::new(
        env,
        training.n_steps,
        per_replica(training.total_batch_size, cfg.devices.local_devices),
        Adam::new(a2c.learning_rate),
        hyper,
    )
}

pub fn setup_random_agent(cfg: &Config, env: VecEnv<Corridor>) -> Result<RandomAgent<Corridor>, AgentError> {
    let training = &cfg.env.training;
    RandomAgent::new(
        env,
        training.n_steps,
        per_replica(training.total_batch_size, cfg.devices.local_devices),
    )
}

/// The stochastic and greedy evaluators, in that order.
pub fn setup_evaluators<A: Agent>(
    cfg: &Config,
    agent: &Arc<A>,
) -> Result<(Evaluator<A>, Evaluator<A>), EvalError> {
    let evaluation = &cfg.env.evaluation;
    let stochastic = Evaluator::new(
        Arc::clone(agent),
        evaluation.eval_total_batch_size,
        ActionMode::Stochastic,
    )?;
    let greedy = Evaluator::new(
        Arc::clone(agent),
        evaluation.greedy_eval_total_batch_size,
        ActionMode::Greedy,
    )?;
    Ok((stochastic, greedy))
}

/// Initialise parameters and acting state on the primary device and replicate
/// them across every local device.
pub fn setup_training_state<A: Agent>(
    agent: &A,
    key: PrngKey,
    devices: LocalDevices,
) -> Result<Replicated<TrainingState<EnvState<A>>>, AgentError> {
    let [params_key, acting_key] = key.split_n::<2>();
    let state = TrainingState {
        params_state: agent.init_params(params_key),
        acting_state: agent.init_acting_state(acting_key)?,
    }
    .device_put(devices.primary());

    info!(
        replicas = devices.count,
        device = %devices.primary(),
        batch_size = state.acting_state.batch_size(),
        "training state initialised"
    );
    Ok(Replicated::broadcast(state, devices.count))
}

/// Swap saved parameters into every replica, keeping each acting state.
pub fn restore_params<S>(
    state: Replicated<TrainingState<S>>,
    params_state: ParamsState,
    device: Device,
) -> Result<Replicated<TrainingState<S>>, AgentError> {
    let current = &state.first().params_state.params;
    let saved = &params_state.params;
    if saved.actor.weights.dim() != current.actor.weights.dim()
        || saved.critic.weights.dim() != current.critic.weights.dim()
    {
        return Err(AgentError::InvalidConfig(format!(
            "checkpoint actor weights {:?} do not fit this agent's {:?}",
            saved.actor.weights.dim(),
            current.actor.weights.dim()
        )));
    }

    let params_state = params_state.device_put(device);
    Ok(state.map(|replica| TrainingState {
        params_state: params_state.clone(),
        acting_state: replica.acting_state,
    }))
}
