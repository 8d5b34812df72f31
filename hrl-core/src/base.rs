//! Core functionalities.
mod classifier;
mod configurable;
mod env;
mod solver;
mod step;
pub use classifier::{ClassWeight, Classifier, ClassifierFactory};
pub use configurable::Configurable;
pub use env::GoalEnv;
pub use solver::{ModelBasedSolver, ModelFreeSolver, Simulation, Transition, ValueFn};
pub use step::{Info, Step};
use ndarray::Array1;
use std::fmt::Debug;

/// An observation of an environment.
///
/// Value learners work on flat vectors, so every observation must be able to
/// flatten itself. The goal-conditioned input of a value learner is the
/// flattened observation followed by the goal features.
pub trait Obs: Clone + Debug {
    /// Returns the observation as a flat vector.
    fn flatten(&self) -> Array1<f32>;
}

impl Obs for Array1<f32> {
    fn flatten(&self) -> Array1<f32> {
        self.clone()
    }
}

/// An action of an environment.
pub trait Act: Clone + Debug {}

impl Act for Array1<f32> {}

impl Act for usize {}
