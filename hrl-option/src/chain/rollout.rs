//! Rollouts of options.
use super::{
    base::{option_and_parent, option_and_parent_mut},
    OptionChain,
};
use crate::OptionId;
use anyhow::Result;
use chrono::Local;
use hrl_core::{
    record::{Record, Recorder, RecordValue},
    Configurable, GoalEnv, ModelBasedSolver, ModelFreeSolver, Transition,
};
use log::{debug, info, trace};

/// Result of [`OptionChain::rollout`].
#[derive(Clone, Debug, PartialEq)]
pub enum RolloutOutcome<O> {
    /// No goal was found, nothing was executed.
    Skipped,

    /// The option was executed.
    Finished {
        /// The last observation.
        final_obs: O,

        /// Sum of the (clipped) rewards.
        total_reward: f32,

        /// Number of environment steps.
        num_steps: usize,

        /// `true` if the option terminated without dying.
        reached_goal: bool,

        /// `true` if the environment ended the episode.
        needs_reset: bool,
    },
}

impl<E, V, P> OptionChain<E, V, P>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act> + Configurable,
    P: ModelBasedSolver<E::Obs, E::Act> + Configurable,
{
    fn clip(&self, reward: f32) -> f32 {
        match self.config.clip_reward {
            Some(c) => reward.clamp(-c, c),
            None => reward,
        }
    }

    /// Executes an option from `obs` and refines it.
    ///
    /// The option acts until it terminates, the episode ends, the agent dies or
    /// `timeout` steps are taken. The option must be able to start at `obs`.
    pub fn rollout<R: Recorder>(
        &mut self,
        id: OptionId,
        env: &mut E,
        obs: E::Obs,
        recorder: &mut R,
    ) -> Result<RolloutOutcome<E::Obs>> {
        let ix = self.index(id)?;
        {
            let option = &self.options[ix];
            assert!(
                option.is_init_true(env, &obs),
                "{} cannot start from {:?}",
                option.name(),
                obs
            );
        }

        let goal = match self.goal_for_rollout(id, env)? {
            Some(goal) => goal,
            None => {
                debug!("{}: no goal, rollout skipped", self.options[ix].name());
                return Ok(RolloutOutcome::Skipped);
            }
        };

        let timeout = self.options[ix].config().timeout;
        self.options[ix].start_execution(obs.clone());
        let mut obs = obs;
        let mut total_reward = 0.0;
        let mut num_steps = 0;
        let mut is_dead = false;
        let mut needs_reset = false;

        while num_steps < timeout {
            let (option, parent) = option_and_parent(&self.options, ix);
            if option.is_term_true(env, &obs, parent) {
                break;
            }
            let act = option.act(env, &obs, goal.view(), &mut self.rng);
            let (step, _) = env.step(&act);
            let reward = self.clip(step.reward);
            total_reward += reward;
            num_steps += 1;
            is_dead = step.is_dead;
            trace!("step {}: reward = {}, obs = {:?}", num_steps, reward, step.obs);

            let done = step.is_done();
            let next_obs = step.obs;
            self.options[ix].observe(
                Transition::new(obs, act, reward, next_obs.clone(), step.is_terminated),
                is_dead,
            );
            obs = next_obs;
            if done {
                needs_reset = true;
                break;
            }
        }

        let (option, parent) = option_and_parent_mut(&mut self.options, ix);
        let reached_goal = option.is_term_true_unless_dead(env, &obs, is_dead, parent);
        let record = option.refine(env, goal.view(), parent)?;
        if reached_goal {
            info!(
                "{} reached {:?} in {} steps",
                option.name(),
                goal.to_vec(),
                num_steps
            );
        }

        let rollout_record = Record::from_slice(&[
            ("option", RecordValue::String(option.name().to_string())),
            ("total_reward", RecordValue::Scalar(total_reward)),
            ("num_steps", RecordValue::Scalar(num_steps as f32)),
            ("goal", RecordValue::Array1(goal.to_vec())),
            ("datetime", RecordValue::DateTime(Local::now())),
        ]);
        recorder.write(record.merge(rollout_record));

        Ok(RolloutOutcome::Finished {
            final_obs: obs,
            total_reward,
            num_steps,
            reached_goal,
            needs_reset,
        })
    }

    /// Runs `n_rollouts` rollouts of the options selected by
    /// [`select_option`](Self::select_option).
    ///
    /// The environment is reset when a rollout is skipped, does not move, ends
    /// the episode, or when the episode exceeds `max_episode_steps`.
    pub fn train<R: Recorder>(
        &mut self,
        env: &mut E,
        n_rollouts: usize,
        recorder: &mut R,
    ) -> Result<()> {
        let mut obs = env.reset()?;
        let mut episode_steps = 0;

        for i in 0..n_rollouts {
            let id = self.select_option(env, &obs);
            trace!("rollout {}: option {}", i, id);

            obs = match self.rollout(id, env, obs.clone(), recorder)? {
                RolloutOutcome::Skipped => {
                    episode_steps = 0;
                    env.reset()?
                }
                RolloutOutcome::Finished {
                    final_obs,
                    num_steps,
                    needs_reset,
                    ..
                } => {
                    episode_steps += num_steps;
                    if needs_reset
                        || num_steps == 0
                        || episode_steps >= self.config.max_episode_steps
                    {
                        episode_steps = 0;
                        env.reset()?
                    } else {
                        final_obs
                    }
                }
            };
        }

        for option in self.options.iter() {
            info!(
                "{}: {} executions, success rate {:.2}",
                option.name(),
                option.num_executions(),
                option.success_rate()
            );
        }
        Ok(())
    }
}
