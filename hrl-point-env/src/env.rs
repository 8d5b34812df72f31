//! Point environment.
use anyhow::Result;
use hrl_core::{
    record::{Record, RecordValue::Scalar},
    GoalEnv, Step,
};
use log::trace;
use ndarray::{array, Array1, ArrayView1};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`PointEnv`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PointEnvConfig {
    /// Start position.
    pub start: [f32; 2],

    /// Half-width of the start region.
    pub start_tolerance: f32,

    /// Uniform noise added to the start position on reset.
    pub start_noise: f32,

    /// Task goal.
    pub goal: [f32; 2],

    /// Distance under which a goal is reached.
    pub goal_tolerance: f32,

    /// The maximum absolute velocity on every axis.
    pub max_speed: f32,

    /// Positions are clamped to `[-size, size]`.
    pub size: f32,

    /// If `true`, the reward is the negated distance to the goal.
    pub dense_reward: bool,

    /// Steps after which an episode is truncated.
    pub max_steps: usize,

    /// Centers of pits; the agent dies in them.
    #[serde(default)]
    pub pits: Vec<[f32; 2]>,

    /// Radius of pits.
    pub pit_radius: f32,
}

impl Default for PointEnvConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            start_tolerance: 0.5,
            start_noise: 0.0,
            goal: [4.0, 4.0],
            goal_tolerance: 0.5,
            max_speed: 0.5,
            size: 10.0,
            dense_reward: false,
            max_steps: 500,
            pits: vec![],
            pit_radius: 0.5,
        }
    }
}

impl PointEnvConfig {
    /// Sets the start position.
    pub fn start(mut self, v: [f32; 2]) -> Self {
        self.start = v;
        self
    }

    /// Sets the noise of the start position.
    pub fn start_noise(mut self, v: f32) -> Self {
        self.start_noise = v;
        self
    }

    /// Sets the task goal.
    pub fn goal(mut self, v: [f32; 2]) -> Self {
        self.goal = v;
        self
    }

    /// Sets the goal tolerance.
    pub fn goal_tolerance(mut self, v: f32) -> Self {
        self.goal_tolerance = v;
        self
    }

    /// Sets the maximum velocity.
    pub fn max_speed(mut self, v: f32) -> Self {
        self.max_speed = v;
        self
    }

    /// Sets if the reward is dense.
    pub fn dense_reward(mut self, v: bool) -> Self {
        self.dense_reward = v;
        self
    }

    /// Sets the maximum number of steps of an episode.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Adds a pit.
    pub fn pit(mut self, center: [f32; 2]) -> Self {
        self.pits.push(center);
        self
    }
}

fn distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// A point in a square arena.
pub struct PointEnv {
    config: PointEnvConfig,
    pos: Array1<f32>,
    count_steps: usize,
    rng: SmallRng,
}

impl PointEnv {
    /// Current position.
    pub fn pos(&self) -> &Array1<f32> {
        &self.pos
    }

    /// Task goal.
    pub fn goal(&self) -> Array1<f32> {
        Array1::from(self.config.goal.to_vec())
    }

    /// Configuration.
    pub fn config(&self) -> &PointEnvConfig {
        &self.config
    }

    fn is_in_pit(&self, pos: ArrayView1<f32>) -> bool {
        self.config
            .pits
            .iter()
            .any(|c| distance(pos, array![c[0], c[1]].view()) <= self.config.pit_radius)
    }
}

impl GoalEnv for PointEnv {
    type Config = PointEnvConfig;
    type Obs = Array1<f32>;
    type Act = Array1<f32>;
    type Info = ();

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        Ok(Self {
            pos: array![config.start[0], config.start[1]],
            config: config.clone(),
            count_steps: 0,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        let noise = self.config.start_noise;
        let start = self.config.start;
        self.pos = if noise > 0.0 {
            array![
                start[0] + self.rng.gen_range(-noise..=noise),
                start[1] + self.rng.gen_range(-noise..=noise)
            ]
        } else {
            array![start[0], start[1]]
        };
        self.count_steps = 0;
        Ok(self.pos.clone())
    }

    fn step(&mut self, act: &Self::Act) -> (Step<Self>, Record) {
        let (max_speed, size) = (self.config.max_speed, self.config.size);
        for (p, a) in self.pos.iter_mut().zip(act.iter()) {
            *p = (*p + a.clamp(-max_speed, max_speed)).clamp(-size, size);
        }
        self.count_steps += 1;

        let goal = self.goal();
        let (reward, reached) = self.reward_func(&self.pos, goal.view());
        let is_dead = self.is_in_pit(self.pos.view());
        let is_truncated = self.count_steps >= self.config.max_steps;
        trace!("pos = {:?}, reward = {}", self.pos.to_vec(), reward);

        let mut record = Record::from_scalar("reward", reward);
        if reached || is_dead || is_truncated {
            record.insert("episode_length", Scalar(self.count_steps as _));
        }

        (
            Step::new(
                self.pos.clone(),
                act.clone(),
                reward,
                reached || is_dead,
                is_truncated,
                is_dead,
                (),
            ),
            record,
        )
    }

    fn extract_features(&self, obs: &Self::Obs) -> Array1<f32> {
        obs.clone()
    }

    fn position(&self, obs: &Self::Obs) -> Array1<f32> {
        obs.iter().take(2).copied().collect()
    }

    fn reward_func(&self, obs: &Self::Obs, goal: ArrayView1<f32>) -> (f32, bool) {
        let dist = distance(obs.view(), goal);
        let done = dist <= self.config.goal_tolerance;
        let reward = if self.config.dense_reward {
            -dist
        } else if done {
            0.0
        } else {
            -1.0
        };
        (reward, done)
    }

    fn sample_action(&mut self) -> Self::Act {
        let m = self.config.max_speed;
        array![self.rng.gen_range(-m..=m), self.rng.gen_range(-m..=m)]
    }

    fn is_start_region(&self, obs: &Self::Obs) -> bool {
        let tol = self.config.start_tolerance;
        obs.iter()
            .zip(self.config.start.iter())
            .all(|(p, s)| (p - s).abs() <= tol)
    }
}
