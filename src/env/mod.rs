// ferrum-a2c/src/env/mod.rs
mod corridor;
mod errors;
mod traits;
mod vec_env;

pub use corridor::{Corridor, CorridorState};
pub use errors::EnvError;
pub use traits::{Env, StepType, TimeStep};
pub use vec_env::{AutoResetStep, VecEnv};
