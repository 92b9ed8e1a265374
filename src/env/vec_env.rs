use super::{Env, EnvError, TimeStep};
use crate::rng::PrngKey;

/// A batch step with automatic resets.
pub struct AutoResetStep<S> {
    pub states: Vec<S>,
    /// What the environments returned for this step, terminal observations included.
    pub timesteps: Vec<TimeStep>,
    /// What to act on next: equal to `timesteps` except where an episode ended,
    /// in which case it is the first timestep of the fresh episode.
    pub next_timesteps: Vec<TimeStep>,
}

/// Batches a single environment over many independent states.
#[derive(Debug, Clone)]
pub struct VecEnv<E> {
    env: E,
}

impl<E: Env> VecEnv<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn reset(&self, keys: &[PrngKey]) -> Result<(Vec<E::State>, Vec<TimeStep>), EnvError> {
        keys.iter().map(|key| self.env.reset(*key)).collect::<Result<Vec<_>, _>>().map(unzip)
    }

    pub fn step(
        &self,
        states: Vec<E::State>,
        actions: &[usize],
    ) -> Result<(Vec<E::State>, Vec<TimeStep>), EnvError> {
        check_batch(states.len(), actions.len())?;

        states
            .into_iter()
            .zip(actions)
            .map(|(state, action)| self.env.step(state, *action))
            .collect::<Result<Vec<_>, _>>()
            .map(unzip)
    }

    /// Step the batch and reset every environment whose episode ended, drawing
    /// reset keys from `key`.
    pub fn step_auto_reset(
        &self,
        states: Vec<E::State>,
        actions: &[usize],
        key: PrngKey,
    ) -> Result<AutoResetStep<E::State>, EnvError> {
        let (stepped, timesteps) = self.step(states, actions)?;
        let reset_keys = key.split(stepped.len());

        let mut states = Vec::with_capacity(stepped.len());
        let mut next_timesteps = Vec::with_capacity(stepped.len());
        for ((state, timestep), reset_key) in stepped.into_iter().zip(&timesteps).zip(reset_keys) {
            if timestep.is_last() {
                let (state, first) = self.env.reset(reset_key)?;
                states.push(state);
                next_timesteps.push(first);
            } else {
                states.push(state);
                next_timesteps.push(timestep.clone());
            }
        }

        Ok(AutoResetStep {
            states,
            timesteps,
            next_timesteps,
        })
    }
}

fn check_batch(envs: usize, actions: usize) -> Result<(), EnvError> {
    if actions != envs {
        return Err(EnvError::BatchMismatch { actions, envs });
    }
    Ok(())
}

fn unzip<S>(pairs: Vec<(S, TimeStep)>) -> (Vec<S>, Vec<TimeStep>) {
    pairs.into_iter().unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Corridor, StepType};

    fn corridor() -> VecEnv<Corridor> {
        VecEnv::new(Corridor::new(3, 10).expect("valid corridor"))
    }

    #[test]
    fn test_step_rejects_mismatched_batch() {
        let env = corridor();
        let (states, _) = env.reset(&PrngKey::new(0).split(2)).unwrap();
        let err = env.step(states, &[1]).unwrap_err();
        assert!(matches!(err, EnvError::BatchMismatch { actions: 1, envs: 2 }));
    }

    #[test]
    fn test_auto_reset_restarts_finished_episodes() {
        let env = corridor();
        let (mut states, _) = env.reset(&PrngKey::new(0).split(4)).unwrap();
        let mut key = PrngKey::new(1);
        // Length-3 corridor: walking right reaches the goal in at most two steps.
        for _ in 0..2 {
            let [next, reset_key] = key.split_n::<2>();
            key = next;
            let step = env.step_auto_reset(states, &[1, 1, 1, 1], reset_key).unwrap();
            for (raw, next) in step.timesteps.iter().zip(&step.next_timesteps) {
                if raw.is_last() {
                    assert_eq!(next.step_type, StepType::First);
                } else {
                    assert_eq!(raw, next);
                }
            }
            states = step.states;
        }
        assert!(states.iter().all(|s| s.step_count() <= 1));
    }
}
