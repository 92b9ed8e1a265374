use ndarray::Array1;
use tracing::debug;

use super::types::{ActingState, EpisodeStats, Trajectory, Transition};
use crate::device::Device;
use crate::env::{Env, EnvError, VecEnv};
use crate::rng::{KeyRng, PrngKey};

/// What a policy decided for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSample {
    pub action: usize,
    pub log_prob: f32,
    pub logits: Array1<f32>,
}

pub fn init_acting_state<E: Env>(
    env: &VecEnv<E>,
    batch_size: usize,
    key: PrngKey,
    device: Device,
) -> Result<ActingState<E::State>, EnvError> {
    let [reset_key, acting_key] = key.split_n::<2>();
    let (env_states, timesteps) = env.reset(&reset_key.split(batch_size))?;
    Ok(ActingState {
        env_states,
        timesteps,
        key: acting_key,
        episode_returns: vec![0.0; batch_size],
        episode_lengths: vec![0; batch_size],
        episode_count: 0,
        env_step_count: 0,
        device,
    })
}

/// Run `policy` in every environment of the batch for `n_steps` steps.
///
/// Finished episodes are reset in place, so the returned trajectory is always
/// `n_steps × batch_size`. Each step draws its own sampling and reset keys from
/// the acting state's key.
pub fn rollout<E, P>(
    env: &VecEnv<E>,
    acting_state: ActingState<E::State>,
    n_steps: usize,
    mut policy: P,
) -> Result<(ActingState<E::State>, Trajectory), EnvError>
where
    E: Env,
    P: FnMut(&Array1<f32>, &mut KeyRng) -> ActionSample,
{
    let ActingState {
        mut env_states,
        mut timesteps,
        mut key,
        mut episode_returns,
        mut episode_lengths,
        mut episode_count,
        mut env_step_count,
        device,
    } = acting_state;

    let mut steps = Vec::with_capacity(n_steps);
    let mut completed_episodes = Vec::new();

    for _ in 0..n_steps {
        let [next_key, policy_key, reset_key] = key.split_n::<3>();
        key = next_key;

        let mut rng = policy_key.rng();
        let samples: Vec<ActionSample> = timesteps
            .iter()
            .map(|timestep| policy(&timestep.observation, &mut rng))
            .collect();
        let actions: Vec<usize> = samples.iter().map(|sample| sample.action).collect();

        let stepped = env.step_auto_reset(env_states, &actions, reset_key)?;

        let mut row = Vec::with_capacity(samples.len());
        for (b, (sample, outcome)) in samples.into_iter().zip(&stepped.timesteps).enumerate() {
            episode_returns[b] += outcome.reward;
            episode_lengths[b] += 1;
            if outcome.is_last() {
                completed_episodes.push(EpisodeStats {
                    episode_return: episode_returns[b],
                    episode_length: episode_lengths[b],
                });
                episode_returns[b] = 0.0;
                episode_lengths[b] = 0;
                episode_count += 1;
            }

            row.push(Transition {
                observation: timesteps[b].observation.clone(),
                action: sample.action,
                reward: outcome.reward,
                discount: outcome.discount,
                next_observation: outcome.observation.clone(),
                log_prob: sample.log_prob,
                logits: sample.logits,
            });
        }

        env_step_count += row.len() as u64;
        steps.push(row);
        env_states = stepped.states;
        timesteps = stepped.next_timesteps;
    }

    debug!(
        n_steps,
        episodes = completed_episodes.len(),
        %device,
        "rollout finished"
    );

    let acting_state = ActingState {
        env_states,
        timesteps,
        key,
        episode_returns,
        episode_lengths,
        episode_count,
        env_step_count,
        device,
    };
    let trajectory = Trajectory {
        steps,
        completed_episodes,
        device,
    };
    Ok((acting_state, trajectory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Corridor;
    use ndarray::array;

    fn always_right(_: &Array1<f32>, _: &mut KeyRng) -> ActionSample {
        ActionSample {
            action: 1,
            log_prob: 0.0,
            logits: array![0.0, 0.0],
        }
    }

    #[test]
    fn test_rollout_shape_and_counters() {
        let env = VecEnv::new(Corridor::new(4, 10).unwrap());
        let state = init_acting_state(&env, 3, PrngKey::new(0), Device::Cpu).unwrap();
        let (state, trajectory) = rollout(&env, state, 5, always_right).unwrap();

        assert_eq!(trajectory.shape(), [5, 3]);
        assert_eq!(state.env_step_count, 15);
        assert_eq!(state.batch_size(), 3);
        // Walking right from the left half reaches the goal of a length-4 corridor.
        assert!(!trajectory.completed_episodes.is_empty());
        assert_eq!(state.episode_count as usize, trajectory.completed_episodes.len());
        assert!(trajectory.completed_episodes.iter().all(|e| e.episode_return == 1.0));
    }

    #[test]
    fn test_rollout_is_reproducible() {
        let env = VecEnv::new(Corridor::new(6, 4).unwrap());
        let random = |_: &Array1<f32>, rng: &mut KeyRng| {
            use rand::Rng;
            ActionSample {
                action: rng.random_range(0..2),
                log_prob: 0.5f32.ln(),
                logits: array![0.0, 0.0],
            }
        };
        let run = || {
            let state = init_acting_state(&env, 4, PrngKey::new(9), Device::Cpu).unwrap();
            rollout(&env, state, 12, random).unwrap().1
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_transitions_chain_observations() {
        let env = VecEnv::new(Corridor::new(8, 100).unwrap());
        let state = init_acting_state(&env, 2, PrngKey::new(1), Device::Cpu).unwrap();
        let (_, trajectory) = rollout(&env, state, 3, always_right).unwrap();
        for t in 0..2 {
            for b in 0..2 {
                assert_eq!(
                    trajectory.steps[t][b].next_observation,
                    trajectory.steps[t + 1][b].observation
                );
            }
        }
    }
}
