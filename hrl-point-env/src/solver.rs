//! Solvers for [`PointEnv`](crate::PointEnv).
use anyhow::Result;
use hrl_core::{Configurable, ModelBasedSolver, ModelFreeSolver, Simulation, Transition, ValueFn};
use log::{debug, trace};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

fn distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Configuration of [`GreedySolver`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct GreedySolverConfig {
    /// Dimension of observations in augmented states.
    pub obs_dim: usize,

    /// The maximum absolute velocity on every axis.
    pub max_speed: f32,
}

impl Default for GreedySolverConfig {
    fn default() -> Self {
        Self {
            obs_dim: 2,
            max_speed: 0.5,
        }
    }
}

/// Moves straight to the goal in the augmented state.
///
/// The value of an augmented state is the negated distance to its goal. The
/// solver keeps the running mean of the rewards it receives as its only
/// parameter.
pub struct GreedySolver {
    config: GreedySolverConfig,
    mean_reward: f32,
    n_transitions: usize,
    n_terminal: usize,
}

impl GreedySolver {
    /// Number of transitions received by [`ModelFreeSolver::step`].
    pub fn n_transitions(&self) -> usize {
        self.n_transitions
    }

    /// Number of received transitions flagged as terminal.
    pub fn n_terminal(&self) -> usize {
        self.n_terminal
    }

    /// Running mean of the received rewards.
    pub fn mean_reward(&self) -> f32 {
        self.mean_reward
    }
}

impl Configurable for GreedySolver {
    type Config = GreedySolverConfig;

    fn build(config: Self::Config) -> Self {
        Self {
            config,
            mean_reward: 0.0,
            n_transitions: 0,
            n_terminal: 0,
        }
    }
}

impl ModelFreeSolver<Array1<f32>> for GreedySolver {
    fn act(&mut self, augmented_state: ArrayView1<f32>) -> Array1<f32> {
        let d = self.config.obs_dim;
        let m = self.config.max_speed;
        let obs = augmented_state.slice(s![..d]);
        let goal = augmented_state.slice(s![d..]);
        goal.iter()
            .zip(obs.iter())
            .map(|(g, o)| (g - o).clamp(-m, m))
            .collect()
    }

    fn step(&mut self, transition: Transition<Array1<f32>, Array1<f32>>) {
        self.n_transitions += 1;
        if transition.is_terminated {
            self.n_terminal += 1;
        }
        self.mean_reward += (transition.reward - self.mean_reward) / self.n_transitions as f32;
    }

    fn get_values(&self, augmented_states: ArrayView2<f32>) -> Array1<f32> {
        let d = self.config.obs_dim;
        augmented_states
            .rows()
            .into_iter()
            .map(|row| -distance(row.slice(s![..d]), row.slice(s![d..])))
            .collect()
    }

    fn sync_from(&mut self, src: &Self) {
        self.mean_reward = src.mean_reward;
    }
}

/// Configuration of [`RandomShootingPlanner`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RandomShootingPlannerConfig {
    /// Number of candidate action sequences per action.
    pub num_candidates: usize,

    /// Length of candidate action sequences.
    pub horizon: usize,

    /// The maximum absolute velocity on every axis.
    pub max_speed: f32,

    /// Random seed.
    pub seed: u64,
}

impl Default for RandomShootingPlannerConfig {
    fn default() -> Self {
        Self {
            num_candidates: 64,
            horizon: 5,
            max_speed: 0.5,
            seed: 42,
        }
    }
}

impl RandomShootingPlannerConfig {
    /// Sets the number of candidate action sequences.
    pub fn num_candidates(mut self, v: usize) -> Self {
        self.num_candidates = v;
        self
    }

    /// Sets the length of candidate action sequences.
    pub fn horizon(mut self, v: usize) -> Self {
        self.horizon = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }
}

/// Dynamics model `pos' = pos + gain * act` of [`RandomShootingPlanner`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PlannerModel {
    /// Gain of actions.
    pub gain: f32,
}

/// Picks the best of random action sequences under a linear dynamics model.
///
/// The gain of the model is fitted online from observed transitions.
pub struct RandomShootingPlanner {
    config: RandomShootingPlannerConfig,
    model: PlannerModel,
    rng: SmallRng,
    n_transitions: usize,
}

impl RandomShootingPlanner {
    /// Number of transitions received by [`ModelBasedSolver::step`].
    pub fn n_transitions(&self) -> usize {
        self.n_transitions
    }

    /// Dynamics model.
    pub fn model(&self) -> &PlannerModel {
        &self.model
    }

    fn sample_action(&mut self) -> Array1<f32> {
        let m = self.config.max_speed;
        Array1::from_shape_fn(2, |_| self.rng.gen_range(-m..=m))
    }

    /// Rolls out random action sequences, returning final states and actions.
    fn shoot(
        &mut self,
        obs: &Array1<f32>,
        num_rollouts: usize,
        num_steps: usize,
    ) -> (Array2<f32>, Vec<Vec<Array1<f32>>>) {
        let mut final_states = Array2::zeros((num_rollouts, obs.len()));
        let mut actions = Vec::with_capacity(num_rollouts);
        for mut row in final_states.rows_mut() {
            let mut pos = obs.clone();
            let seq: Vec<_> = (0..num_steps).map(|_| self.sample_action()).collect();
            for a in seq.iter() {
                pos.iter_mut()
                    .zip(a.iter())
                    .for_each(|(p, a)| *p += self.model.gain * a);
            }
            row.assign(&pos);
            actions.push(seq);
        }
        (final_states, actions)
    }
}

impl Configurable for RandomShootingPlanner {
    type Config = RandomShootingPlannerConfig;

    fn build(config: Self::Config) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            model: PlannerModel { gain: 1.0 },
            config,
            n_transitions: 0,
        }
    }
}

impl ModelBasedSolver<Array1<f32>, Array1<f32>> for RandomShootingPlanner {
    fn act(&mut self, obs: &Array1<f32>, goal: ArrayView1<f32>, vf: Option<ValueFn>) -> Array1<f32> {
        let (n, h) = (self.config.num_candidates, self.config.horizon.max(1));
        let (final_states, mut actions) = self.shoot(obs, n, h);
        let costs: Array1<f32> = match vf {
            Some(vf) => {
                let goals = goal.insert_axis(Axis(0));
                vf(final_states.view(), goals).mapv(|v| -v)
            }
            None => final_states
                .rows()
                .into_iter()
                .map(|row| distance(row, goal))
                .collect(),
        };

        let best = costs
            .iter()
            .enumerate()
            .fold((0, f32::INFINITY), |(bi, bc), (i, &c)| {
                if c < bc {
                    (i, c)
                } else {
                    (bi, bc)
                }
            })
            .0;
        trace!("best candidate {} with cost {}", best, costs[best]);
        actions.swap_remove(best).swap_remove(0)
    }

    fn step(&mut self, transition: Transition<Array1<f32>, Array1<f32>>) {
        self.n_transitions += 1;
        let a2: f32 = transition.act.iter().map(|a| a * a).sum();
        if a2 > 1e-6 {
            let dp = &transition.next_obs - &transition.obs;
            let gain = dp.dot(&transition.act) / a2;
            self.model.gain += 0.1 * (gain - self.model.gain);
        }
    }

    fn simulate(
        &mut self,
        obs: &Array1<f32>,
        goal: ArrayView1<f32>,
        num_rollouts: usize,
        num_steps: usize,
    ) -> Simulation<Array1<f32>> {
        let (final_states, actions) = self.shoot(obs, num_rollouts, num_steps);
        let costs = final_states
            .rows()
            .into_iter()
            .map(|row| distance(row, goal))
            .collect();
        Simulation {
            final_states,
            actions,
            costs,
        }
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        let rdr = BufReader::new(File::open(path)?);
        self.model = serde_yaml::from_reader(rdr)?;
        debug!("Loaded planner model {:?} from {:?}", self.model, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_greedy_solver_heads_to_goal() {
        let mut solver = GreedySolver::build(GreedySolverConfig::default());
        let act = solver.act(array![0.0, 0.0, 2.0, -0.1].view());
        assert_eq!(act, array![0.5, -0.1]);

        let values = solver.get_values(array![[0.0, 0.0, 3.0, 4.0]].view());
        assert_eq!(values, array![-5.0]);
    }

    #[test]
    fn test_planner_moves_toward_goal() {
        let config = RandomShootingPlannerConfig::default().horizon(1);
        let mut planner = RandomShootingPlanner::build(config);
        let obs = array![0.0, 0.0];
        let goal = array![3.0, 0.0];
        let act = planner.act(&obs, goal.view(), None);
        assert!(act[0] > 0.0);
    }

    #[test]
    fn test_planner_fits_gain() {
        let mut planner = RandomShootingPlanner::build(RandomShootingPlannerConfig::default());
        for _ in 0..100 {
            planner.step(Transition::new(
                array![0.0, 0.0],
                array![0.5, 0.0],
                -1.0,
                array![0.25, 0.0],
                false,
            ));
        }
        assert!((planner.model().gain - 0.5).abs() < 1e-3);
        assert_eq!(planner.n_transitions(), 100);
    }

    #[test]
    fn test_load_model() -> Result<()> {
        let dir = TempDir::new("planner_model")?;
        let path = dir.path().join("model.yaml");
        File::create(&path)?.write_all(b"gain: 0.25\n")?;

        let mut planner = RandomShootingPlanner::build(RandomShootingPlannerConfig::default());
        planner.load_model(&path)?;
        assert_eq!(planner.model(), &PlannerModel { gain: 0.25 });
        Ok(())
    }
}
