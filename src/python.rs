use std::path::PathBuf;

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use crate::config::Config;
use crate::train::{TrainOptions, train as run_training};

/// Run a training job and return `(run_id, epochs, env_steps, seconds)`.
#[pyfunction]
#[pyo3(signature = (config_path=None, gpu_acting=false, log_compiles=false, resume_from=None))]
fn train(
    py: Python<'_>,
    config_path: Option<PathBuf>,
    gpu_acting: bool,
    log_compiles: bool,
    resume_from: Option<PathBuf>,
) -> PyResult<(String, usize, u64, f64)> {
    let cfg = Config::load(config_path.as_deref()).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    crate::logging::init(&cfg.logger.level);

    let options = TrainOptions {
        gpu_acting,
        log_compiles,
        resume_from,
    };
    let stats = py.allow_threads(|| {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime
            .block_on(run_training(&cfg, options))
            .map_err(|e| std::io::Error::other(e.to_string()))
    });
    let stats = stats.map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

    Ok((
        stats.run_id.to_string(),
        stats.epochs,
        stats.env_steps,
        stats.training_time.as_secs_f64(),
    ))
}

/// The name of this function must match the lib.name in Cargo.toml
#[pymodule]
fn ferrum_a2c(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(train, m)?)?;
    Ok(())
}
