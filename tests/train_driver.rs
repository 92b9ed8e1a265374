use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::Array1;

use ferrum_a2c::agents::{
    A2CAgent, A2CHyperParams, ActingState, ActionMode, ActorCriticParams, Adam, Agent, AgentError,
    EnvState, LinearParams, ParamsState, RandomAgent, TrainingState, Trajectory,
};
use ferrum_a2c::device::{ActingPlacement, Device, LocalDevices, Replicated};
use ferrum_a2c::diagnostics::CompileLog;
use ferrum_a2c::env::{Corridor, CorridorState, VecEnv};
use ferrum_a2c::evaluator::{EvalError, Evaluate, Evaluator};
use ferrum_a2c::loggers::{ListLogger, LogRecord, TerminalLogger};
use ferrum_a2c::metrics::{Metrics, RawMetrics};
use ferrum_a2c::rng::{KeyRng, PrngKey};
use ferrum_a2c::setup::setup_training_state;
use ferrum_a2c::train::{Schedule, Trainer};
use ferrum_a2c::TrainError;

const N_STEPS: usize = 4;
const BATCH: usize = 3;
const LEARNER_STEPS: usize = 2;

fn hyper() -> A2CHyperParams {
    A2CHyperParams {
        normalize_advantage: false,
        discount_factor: 0.99,
        bootstrapping_factor: 0.95,
        l_pg: 1.0,
        l_td: 1.0,
        l_en: 0.01,
    }
}

fn corridor() -> VecEnv<Corridor> {
    VecEnv::new(Corridor::new(5, 10).unwrap())
}

fn a2c() -> A2CAgent<Corridor> {
    A2CAgent::new(corridor(), N_STEPS, BATCH, Adam::new(0.05), hyper()).unwrap()
}

fn schedule(num_epochs: usize, replicas: usize) -> Schedule {
    Schedule {
        num_epochs,
        steps_per_epoch: (N_STEPS * BATCH * replicas * LEARNER_STEPS) as u64,
    }
}

fn devices(count: usize) -> LocalDevices {
    LocalDevices {
        count,
        accelerator: true,
    }
}

fn offload() -> ActingPlacement {
    ActingPlacement::from_flag(false, Device::Cpu, Device::Accelerator(0))
}

/// Records every key it is handed and returns fixed metrics.
#[derive(Clone, Default)]
struct RecordingEvaluator {
    keys: Arc<Mutex<Vec<PrngKey>>>,
}

#[async_trait]
impl Evaluate for RecordingEvaluator {
    async fn run_evaluation(
        &self,
        params_state: Replicated<ParamsState>,
        key: PrngKey,
    ) -> Result<Replicated<Metrics>, EvalError> {
        self.keys.lock().unwrap().push(key);
        let metrics = Metrics::from([("episode_return".to_string(), 0.5)]);
        Ok(params_state.map(|_| metrics.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Rollout { policy: Device, acting: Device },
    GradientStep { params: Device, acting: Device, data: Device },
}

/// Delegates to an A2C agent and records where each stage's inputs live.
struct RecordingAgent {
    inner: A2CAgent<Corridor>,
    seen: Arc<Mutex<Vec<Seen>>>,
    fail_gradient_step: bool,
}

impl RecordingAgent {
    fn new(fail_gradient_step: bool) -> Self {
        Self {
            inner: a2c(),
            seen: Arc::default(),
            fail_gradient_step,
        }
    }
}

impl Agent for RecordingAgent {
    type Env = Corridor;

    fn env(&self) -> &VecEnv<Corridor> {
        self.inner.env()
    }

    fn batch_size(&self) -> usize {
        self.inner.batch_size()
    }

    fn n_steps(&self) -> usize {
        self.inner.n_steps()
    }

    fn init_params(&self, key: PrngKey) -> ParamsState {
        self.inner.init_params(key)
    }

    fn init_acting_state(&self, key: PrngKey) -> Result<ActingState<CorridorState>, AgentError> {
        self.inner.init_acting_state(key)
    }

    fn select_action(
        &self,
        params: &ActorCriticParams,
        observation: &Array1<f32>,
        mode: ActionMode,
        rng: &mut KeyRng,
    ) -> usize {
        self.inner.select_action(params, observation, mode, rng)
    }

    fn rollout(
        &self,
        policy_params: &LinearParams,
        acting_state: ActingState<CorridorState>,
    ) -> Result<(ActingState<CorridorState>, Trajectory), AgentError> {
        self.seen.lock().unwrap().push(Seen::Rollout {
            policy: policy_params.device,
            acting: acting_state.device,
        });
        self.inner.rollout(policy_params, acting_state)
    }

    fn gradient_step(
        &self,
        training_state: TrainingState<CorridorState>,
        data: &Trajectory,
    ) -> Result<(TrainingState<CorridorState>, RawMetrics), AgentError> {
        self.seen.lock().unwrap().push(Seen::GradientStep {
            params: training_state.params_state.params.actor.device,
            acting: training_state.acting_state.device,
            data: data.device,
        });
        if self.fail_gradient_step {
            return Err(AgentError::InvalidConfig("gradient step failed".to_string()));
        }
        self.inner.gradient_step(training_state, data)
    }
}

async fn run_recorded<A: Agent>(
    agent: A,
    num_epochs: usize,
    replicas: usize,
    placement: ActingPlacement,
) -> (
    Result<Replicated<TrainingState<EnvState<A>>>, TrainError>,
    Vec<LogRecord>,
    ListLogger,
) {
    let agent = Arc::new(agent);
    let state = setup_training_state(&*agent, PrngKey::new(11), devices(replicas)).unwrap();
    let logger = ListLogger::new();
    let trainer = Trainer::new(
        Arc::clone(&agent),
        Box::new(RecordingEvaluator::default()),
        Box::new(RecordingEvaluator::default()),
        Box::new(logger.clone()),
        schedule(num_epochs, replicas),
        placement,
    );
    let result = trainer.run(state, PrngKey::new(3)).await.map(|outcome| outcome.state);
    let records = logger.records();
    (result, records, logger)
}

#[tokio::test]
async fn test_env_steps_and_label_order() {
    let (result, records, _) = run_recorded(a2c(), 3, 1, offload()).await;
    result.unwrap();

    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        [
            "eval_stochastic", "eval_greedy", "train",
            "eval_stochastic", "eval_greedy", "train",
            "eval_stochastic", "eval_greedy", "train",
        ]
    );

    let per_epoch = (N_STEPS * BATCH * LEARNER_STEPS) as u64;
    for (index, record) in records.iter().enumerate() {
        let epoch = (index / 3) as u64;
        assert_eq!(record.env_steps, epoch * per_epoch);
    }
}

#[tokio::test]
async fn test_random_agent_skips_greedy() {
    let agent = RandomAgent::new(corridor(), N_STEPS, BATCH).unwrap();
    let (result, records, _) = run_recorded(agent, 2, 1, offload()).await;
    result.unwrap();

    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["eval_stochastic", "train", "eval_stochastic", "train"]);
}

#[tokio::test]
async fn test_timers_annotate_metrics() {
    let (result, records, _) = run_recorded(a2c(), 1, 1, offload()).await;
    result.unwrap();

    let eval = &records[0];
    assert!(eval.metrics.contains_key("time"));
    assert!(!eval.metrics.contains_key("steps_per_second"));
    let train = records.last().unwrap();
    assert_eq!(train.label, "train");
    assert!(train.metrics.contains_key("time"));
    assert!(train.metrics.contains_key("total_loss"));
}

#[tokio::test]
async fn test_replica_count_preserved() {
    let (result, records, _) = run_recorded(a2c(), 2, 2, offload()).await;
    let state = result.unwrap();
    assert_eq!(state.len(), 2);
    // One gradient step per epoch, however many learner steps the schedule accounts for.
    assert_eq!(state.first().params_state.update_count, 2);
    assert_eq!(state.first().acting_state.env_step_count, (2 * N_STEPS * BATCH) as u64);
    assert_eq!(records.last().unwrap().env_steps, (N_STEPS * BATCH * 2 * LEARNER_STEPS) as u64);
}

#[tokio::test]
async fn test_evaluation_keys_distinct() {
    let agent = Arc::new(a2c());
    let state = setup_training_state(&*agent, PrngKey::new(0), devices(1)).unwrap();
    let stochastic = RecordingEvaluator::default();
    let greedy = RecordingEvaluator::default();
    let trainer = Trainer::new(
        agent,
        Box::new(stochastic.clone()),
        Box::new(greedy.clone()),
        Box::new(ListLogger::new()),
        schedule(4, 1),
        ActingPlacement::Colocated,
    );
    trainer.run(state, PrngKey::new(9)).await.unwrap();

    let stochastic = stochastic.keys.lock().unwrap().clone();
    let greedy = greedy.keys.lock().unwrap().clone();
    assert_eq!(stochastic.len(), 4);
    assert_eq!(greedy.len(), 4);

    let all: HashSet<PrngKey> = stochastic.iter().chain(&greedy).copied().collect();
    assert_eq!(all.len(), 8);
}

fn without_timing(records: Vec<LogRecord>) -> Vec<LogRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.metrics.remove("time");
            record.metrics.remove("steps_per_second");
            record
        })
        .collect()
}

#[tokio::test]
async fn test_same_seed_same_metrics() {
    async fn run() -> Vec<LogRecord> {
        let agent = Arc::new(a2c());
        let state = setup_training_state(&*agent, PrngKey::new(5), devices(1)).unwrap();
        let logger = ListLogger::new();
        let stochastic = Evaluator::new(Arc::clone(&agent), 6, ActionMode::Stochastic).unwrap();
        let greedy = Evaluator::new(Arc::clone(&agent), 6, ActionMode::Greedy).unwrap();
        Trainer::new(
            agent,
            Box::new(stochastic),
            Box::new(greedy),
            Box::new(logger.clone()),
            schedule(3, 1),
            offload(),
        )
        .with_compile_log(CompileLog::new(false))
        .run(state, PrngKey::new(21))
        .await
        .unwrap();
        without_timing(logger.records())
    }

    let first = run().await;
    let second = run().await;
    assert_eq!(first.len(), 9);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_offload_moves_acting_off_the_learner() {
    let agent = RecordingAgent::new(false);
    let seen = Arc::clone(&agent.seen);
    let (result, _, _) = run_recorded(agent, 1, 1, offload()).await;
    result.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    for event in seen {
        match event {
            Seen::Rollout { policy, acting } => {
                assert_eq!(policy, Device::Cpu);
                assert_eq!(acting, Device::Cpu);
            }
            Seen::GradientStep { params, acting, data } => {
                assert_eq!(params, Device::Accelerator(0));
                assert_eq!(acting, Device::Accelerator(0));
                assert_eq!(data, Device::Accelerator(0));
            }
        }
    }
}

#[tokio::test]
async fn test_colocated_never_relocates() {
    let agent = RecordingAgent::new(false);
    let seen = Arc::clone(&agent.seen);
    let (result, _, _) = run_recorded(agent, 1, 1, ActingPlacement::Colocated).await;
    result.unwrap();

    for event in seen.lock().unwrap().iter() {
        match event {
            Seen::Rollout { policy, acting } => {
                assert_eq!(*policy, Device::Accelerator(0));
                assert_eq!(*acting, Device::Accelerator(0));
            }
            Seen::GradientStep { params, acting, data } => {
                assert_eq!(*params, Device::Accelerator(0));
                assert_eq!(*acting, Device::Accelerator(0));
                assert_eq!(*data, Device::Accelerator(0));
            }
        }
    }
}

#[tokio::test]
async fn test_logger_closed_once_on_success() {
    let (result, _, logger) = run_recorded(a2c(), 2, 1, offload()).await;
    result.unwrap();
    assert_eq!(logger.close_count(), 1);
}

#[tokio::test]
async fn test_logger_closed_once_on_failure() {
    let (result, records, logger) = run_recorded(RecordingAgent::new(true), 3, 1, offload()).await;
    assert!(matches!(result, Err(TrainError::Agent(_))));
    assert_eq!(logger.close_count(), 1);

    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["eval_stochastic", "eval_greedy"]);
}

#[tokio::test]
async fn test_terminal_logger_run_completes() {
    let agent = Arc::new(a2c());
    let state = setup_training_state(&*agent, PrngKey::new(2), devices(1)).unwrap();
    let outcome = Trainer::new(
        agent,
        Box::new(RecordingEvaluator::default()),
        Box::new(RecordingEvaluator::default()),
        Box::new(TerminalLogger::new()),
        schedule(2, 1),
        ActingPlacement::Colocated,
    )
    .run(state, PrngKey::new(4))
    .await
    .unwrap();
    assert_eq!(outcome.stats.epochs, 2);
    assert_eq!(outcome.stats.env_steps, 2 * (N_STEPS * BATCH * LEARNER_STEPS) as u64);
}
