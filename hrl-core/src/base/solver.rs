//! Solvers selecting the actions of an option.
//!
//! An option owns exactly one solver: either a model-free value learner
//! working on augmented states (observation followed by goal features), or a
//! model-based planner that optimizes actions with forward simulation.
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::path::Path;

/// A transition `(o_t, a_t, r_t, o_t+1, done)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<O, A> {
    /// Observation.
    pub obs: O,

    /// Action.
    pub act: A,

    /// Reward.
    pub reward: f32,

    /// Next observation.
    pub next_obs: O,

    /// Flag denoting if the transition ends in a terminal state.
    pub is_terminated: bool,
}

impl<O, A> Transition<O, A> {
    /// Constructs a transition.
    pub fn new(obs: O, act: A, reward: f32, next_obs: O, is_terminated: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_terminated,
        }
    }
}

/// Value function given to a planner for leaf evaluation.
///
/// Takes a batch of states and a batch of goals (one row each) and returns
/// one value per row.
pub type ValueFn<'a> = &'a dyn Fn(ArrayView2<f32>, ArrayView2<f32>) -> Array1<f32>;

/// Off-policy goal-conditioned actor-critic.
pub trait ModelFreeSolver<A> {
    /// Selects an action for an augmented state.
    fn act(&mut self, augmented_state: ArrayView1<f32>) -> A;

    /// Stores a transition over augmented states and performs an update.
    fn step(&mut self, transition: Transition<Array1<f32>, A>);

    /// Returns the values of a batch of augmented states.
    fn get_values(&self, augmented_states: ArrayView2<f32>) -> Array1<f32>;

    /// Copies the parameters of `src` into `self`.
    fn sync_from(&mut self, src: &Self)
    where
        Self: Sized;
}

/// Result of [`ModelBasedSolver::simulate`].
#[derive(Clone, Debug)]
pub struct Simulation<A> {
    /// Final states of the rollouts, one row per rollout.
    pub final_states: Array2<f32>,

    /// Action sequences of the rollouts.
    pub actions: Vec<Vec<A>>,

    /// Costs of the rollouts.
    pub costs: Array1<f32>,
}

/// Planner selecting actions by forward simulation.
pub trait ModelBasedSolver<O, A> {
    /// Selects an action for `obs` heading to `goal`.
    ///
    /// When given, `vf` evaluates the leaves of the simulated rollouts.
    fn act(&mut self, obs: &O, goal: ArrayView1<f32>, vf: Option<ValueFn>) -> A;

    /// Updates the dynamics model with an observed transition.
    fn step(&mut self, transition: Transition<O, A>);

    /// Runs `num_rollouts` simulated rollouts of `num_steps` steps from `obs`.
    ///
    /// Rollouts may run in parallel internally; the result is returned as a
    /// completed batch.
    fn simulate(
        &mut self,
        obs: &O,
        goal: ArrayView1<f32>,
        num_rollouts: usize,
        num_steps: usize,
    ) -> Simulation<A>;

    /// Loads the dynamics model from the given path.
    fn load_model(&mut self, path: &Path) -> Result<()>;
}
