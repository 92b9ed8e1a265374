mod a2c;
mod acting;
mod errors;
pub mod networks;
mod optimizer;
mod random;
mod traits;
mod types;

pub use a2c::{A2CAgent, A2CHyperParams};
pub use acting::{ActionSample, init_acting_state, rollout};
pub use errors::AgentError;
pub use optimizer::{Adam, AdamState};
pub use random::RandomAgent;
pub use traits::{ActionMode, Agent, EnvState};
pub use types::{
    ActingState, ActorCriticParams, EpisodeStats, LinearParams, ParamsState, TrainingState,
    Trajectory, Transition,
};
