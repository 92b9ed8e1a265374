use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ferrum_a2c::{Config, TrainOptions, logging, train};

/// Train an actor-critic agent.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML file layered over the built-in defaults.
    #[arg(short, long, env = "FERRUM_CONFIG")]
    config: Option<PathBuf>,

    /// Act on the learner's device instead of offloading rollouts.
    #[arg(long)]
    gpu_acting: bool,

    /// Log the first run of each stage for every new input shape.
    #[arg(long)]
    log_compiles: bool,

    /// Checkpoint whose parameters the run starts from.
    #[arg(long, value_name = "PATH")]
    resume: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref()).context("loading configuration")?;
    logging::init(&cfg.logger.level);

    let options = TrainOptions {
        gpu_acting: args.gpu_acting,
        log_compiles: args.log_compiles,
        resume_from: args.resume,
    };
    let stats = train(&cfg, options).await.context("training failed")?;
    info!(
        run_id = %stats.run_id,
        epochs = stats.epochs,
        env_steps = stats.env_steps,
        "done in {:.2}s",
        stats.training_time.as_secs_f64()
    );
    Ok(())
}
