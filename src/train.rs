use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::{Agent, AgentError, EnvState, ParamsState, TrainingState};
use crate::checkpoint::{self, Checkpoint};
use crate::config::{AgentKind, Config, TrainingConfig};
use crate::device::{ActingPlacement, Replicated};
use crate::diagnostics::CompileLog;
use crate::error::TrainError;
use crate::evaluator::Evaluate;
use crate::loggers::{Logger, LoggerScope};
use crate::metrics::Metrics;
use crate::rng::PrngKey;
use crate::setup;
use crate::timer::Timer;

/// Switches that change how a run executes but not what it computes.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Keep acting on the device that holds the training state instead of
    /// offloading rollouts to the acting device.
    pub gpu_acting: bool,
    pub log_compiles: bool,
    /// Start from the parameters of a saved checkpoint.
    pub resume_from: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TrainingStats {
    pub run_id: Uuid,
    pub epochs: usize,
    pub env_steps: u64,
    pub training_time: Duration,
}

#[derive(Debug)]
pub struct TrainOutcome<S> {
    pub state: Replicated<TrainingState<S>>,
    pub stats: TrainingStats,
}

/// How much work one run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub num_epochs: usize,
    /// Environment steps one epoch accounts for in the logged `env_steps`.
    pub steps_per_epoch: u64,
}

impl From<&TrainingConfig> for Schedule {
    fn from(cfg: &TrainingConfig) -> Self {
        Self {
            num_epochs: cfg.num_epochs,
            steps_per_epoch: cfg.steps_per_epoch(),
        }
    }
}

/// One training epoch on the first replica: a rollout followed by a gradient
/// step on its trajectory. The replica axis is restored on the way out.
pub fn run_epoch<A: Agent>(
    agent: &A,
    placement: &ActingPlacement,
    state: Replicated<TrainingState<EnvState<A>>>,
    compile_log: &CompileLog,
) -> Result<(Replicated<TrainingState<EnvState<A>>>, Metrics), AgentError> {
    let num_replicas = state.len();
    let TrainingState {
        params_state,
        acting_state,
    } = state.into_first();

    let (policy_params, acting_state) =
        placement.to_acting((params_state.params.actor.clone(), acting_state));
    compile_log.observe("rollout", &[agent.n_steps(), acting_state.batch_size()]);
    let (acting_state, data) = agent.rollout(&policy_params, acting_state)?;
    let (acting_state, data) = placement.to_learner((acting_state, data));

    let merged = TrainingState {
        params_state,
        acting_state,
    };
    compile_log.observe("gradient_step", &data.shape());
    let (training_state, metrics) = agent.gradient_step(merged, &data)?;
    debug!(shape = ?data.shape(), "epoch done");

    Ok((
        Replicated::broadcast(training_state, num_replicas),
        metrics.reduce_mean(),
    ))
}

/// Times an epoch by the environment steps it actually took, which only
/// counts the replica that acted.
fn epoch_timer<S>(steps_before: u64, after: &Replicated<TrainingState<S>>) -> Timer {
    Timer::with_steps(after.first().acting_state.env_step_count.saturating_sub(steps_before))
}

/// Drives evaluation and training epochs and reports them to a logger.
pub struct Trainer<A: Agent> {
    agent: Arc<A>,
    stochastic_evaluator: Box<dyn Evaluate>,
    greedy_evaluator: Box<dyn Evaluate>,
    logger: Box<dyn Logger>,
    schedule: Schedule,
    placement: ActingPlacement,
    compile_log: Arc<CompileLog>,
    run_id: Uuid,
}

impl<A: Agent> Trainer<A> {
    pub fn new(
        agent: Arc<A>,
        stochastic_evaluator: Box<dyn Evaluate>,
        greedy_evaluator: Box<dyn Evaluate>,
        logger: Box<dyn Logger>,
        schedule: Schedule,
        placement: ActingPlacement,
    ) -> Self {
        Self {
            agent,
            stochastic_evaluator,
            greedy_evaluator,
            logger,
            schedule,
            placement,
            compile_log: Arc::new(CompileLog::default()),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_compile_log(mut self, compile_log: CompileLog) -> Self {
        self.compile_log = Arc::new(compile_log);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub async fn run(
        self,
        mut state: Replicated<TrainingState<EnvState<A>>>,
        mut key: PrngKey,
    ) -> Result<TrainOutcome<EnvState<A>>, TrainError> {
        let Trainer {
            agent,
            stochastic_evaluator,
            greedy_evaluator,
            logger,
            schedule,
            placement,
            compile_log,
            run_id,
        } = self;

        let mut logger = LoggerScope::open(logger);
        let progress = progress_bar(schedule.num_epochs, logger.renders_to_terminal());
        let eval_timer = Timer::new();
        let started = Instant::now();

        info!(%run_id, epochs = schedule.num_epochs, ?placement, "Starting training.");

        for i in 0..schedule.num_epochs {
            let env_steps = i as u64 * schedule.steps_per_epoch;
            let [next_key, stochastic_key, greedy_key] = key.split_n::<3>();
            key = next_key;

            let params_state = state.map_ref(|replica| replica.params_state.clone());

            let stopwatch = eval_timer.start();
            let mut metrics = stochastic_evaluator
                .run_evaluation(params_state.clone(), stochastic_key)
                .await?
                .into_first();
            eval_timer.record(stopwatch, &mut metrics);
            logger.write(&metrics, "eval_stochastic", env_steps)?;

            if !agent.is_random_policy() {
                let stopwatch = eval_timer.start();
                let mut metrics = greedy_evaluator
                    .run_evaluation(params_state, greedy_key)
                    .await?
                    .into_first();
                eval_timer.record(stopwatch, &mut metrics);
                logger.write(&metrics, "eval_greedy", env_steps)?;
            }

            let steps_before = state.first().acting_state.env_step_count;
            let stopwatch = Timer::new().start();
            let (next_state, mut metrics) = tokio::task::spawn_blocking({
                let agent = Arc::clone(&agent);
                let compile_log = Arc::clone(&compile_log);
                move || run_epoch(&*agent, &placement, state, &compile_log)
            })
            .await??;
            epoch_timer(steps_before, &next_state).record(stopwatch, &mut metrics);
            logger.write(&metrics, "train", env_steps)?;

            state = next_state;
            progress.inc(1);
        }

        progress.finish_and_clear();
        logger.close()?;

        let stats = TrainingStats {
            run_id,
            epochs: schedule.num_epochs,
            env_steps: schedule.num_epochs as u64 * schedule.steps_per_epoch,
            training_time: started.elapsed(),
        };
        info!(
            env_steps = stats.env_steps,
            seconds = stats.training_time.as_secs_f64(),
            "Training finished."
        );
        Ok(TrainOutcome { state, stats })
    }
}

/// Epoch progress on stderr, hidden when the logger already prints each epoch.
fn progress_bar(num_epochs: usize, renders_to_terminal: bool) -> ProgressBar {
    let bar = ProgressBar::new(num_epochs as u64);
    if renders_to_terminal {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::with_template("{spinner} epoch {pos}/{len} [{elapsed_precise}] {wide_bar}") {
        bar.set_style(style);
    }
    bar
}

/// Run a full training job described by `cfg`.
pub async fn train(cfg: &Config, options: TrainOptions) -> Result<TrainingStats, TrainError> {
    cfg.validate()?;
    let run_id = Uuid::new_v4();
    match serde_json::to_string(cfg) {
        Ok(json) => info!(%run_id, config = %json, "Loaded configuration."),
        Err(err) => debug!(error = %err, "could not render configuration"),
    }

    let devices = cfg.devices.local();
    info!(devices = ?devices.all(), "Local devices.");
    let placement = ActingPlacement::from_flag(options.gpu_acting, cfg.devices.acting_device, devices.primary());

    let env = setup::setup_env(cfg)?;
    let key = PrngKey::new(cfg.seed);

    let (stats, params_state) = match cfg.agent {
        AgentKind::A2c => {
            let agent = setup::setup_a2c_agent(cfg, env)?;
            run_agent(cfg, options, agent, placement, run_id, key).await?
        }
        AgentKind::Random => {
            let agent = setup::setup_random_agent(cfg, env)?;
            run_agent(cfg, options, agent, placement, run_id, key).await?
        }
    };

    if cfg.logger.save_checkpoint {
        let checkpoint = Checkpoint {
            run_id,
            env_steps: stats.env_steps,
            params_state: params_state.into_first(),
        };
        checkpoint::save(&cfg.logger.checkpoint_path, &checkpoint)?;
    }
    Ok(stats)
}

async fn run_agent<A: Agent>(
    cfg: &Config,
    options: TrainOptions,
    agent: A,
    placement: ActingPlacement,
    run_id: Uuid,
    key: PrngKey,
) -> Result<(TrainingStats, Replicated<ParamsState>), TrainError> {
    let [key, init_key] = key.split_n::<2>();
    let agent = Arc::new(agent);

    let mut state = setup::setup_training_state(&*agent, init_key, cfg.devices.local())?;
    if let Some(path) = &options.resume_from {
        let checkpoint = checkpoint::load(path)?;
        info!(
            path = %path.display(),
            from_run = %checkpoint.run_id,
            env_steps = checkpoint.env_steps,
            "Resuming from checkpoint."
        );
        state = setup::restore_params(state, checkpoint.params_state, cfg.devices.local().primary())?;
    }
    let (stochastic, greedy) = setup::setup_evaluators(cfg, &agent)?;
    let logger = setup::setup_logger(&cfg.logger, run_id)?;

    let trainer = Trainer::new(
        agent,
        Box::new(stochastic),
        Box::new(greedy),
        logger,
        Schedule::from(&cfg.env.training),
        placement,
    )
    .with_compile_log(CompileLog::new(options.log_compiles))
    .with_run_id(run_id);

    let TrainOutcome { state, stats } = trainer.run(state, key).await?;
    Ok((stats, state.map(|replica| replica.params_state)))
}
