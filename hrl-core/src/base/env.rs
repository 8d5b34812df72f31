//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;
use ndarray::{Array1, ArrayView1};

/// Represents a goal-conditioned environment.
///
/// Besides the usual interaction, an option needs three projections of an
/// observation: the features its initiation classifiers are trained on, the
/// low-dimensional position tested by salient events, and a goal-conditioned
/// reward used for hindsight relabeling.
pub trait GoalEnv {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performs an environment step.
    fn step(&mut self, a: &Self::Act) -> (Step<Self>, Record)
    where
        Self: Sized;

    /// Features of an observation used by initiation classifiers.
    ///
    /// Goals are expressed in this feature space.
    fn extract_features(&self, obs: &Self::Obs) -> Array1<f32>;

    /// Low-dimensional position of an observation.
    fn position(&self, obs: &Self::Obs) -> Array1<f32>;

    /// Goal-conditioned reward of arriving at `obs`, with a flag telling if the
    /// goal is reached.
    fn reward_func(&self, obs: &Self::Obs, goal: ArrayView1<f32>) -> (f32, bool);

    /// Samples an action uniformly from the action space.
    fn sample_action(&mut self) -> Self::Act;

    /// Returns `true` if `obs` is in the start region of the task.
    fn is_start_region(&self, _obs: &Self::Obs) -> bool {
        false
    }
}
