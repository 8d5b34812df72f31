#![warn(missing_docs)]
//! Core traits for options in hierarchical reinforcement learning.
//!
//! An option is a temporally-extended skill: it decides when it may start,
//! acts until a stopping condition fires and refines itself from its own
//! rollouts. This crate defines the collaborators an option consumes without
//! knowing their implementation:
//!
//! * [`GoalEnv`] - a goal-conditioned environment emitting [`Step`]s,
//! * [`ModelFreeSolver`] and [`ModelBasedSolver`] - value learners and planners,
//! * [`Classifier`] and [`ClassifierFactory`] - discriminators over features.
//!
//! Options themselves live in the `hrl-option` crate.
pub mod error;
pub mod record;

mod base;
pub use base::{
    Act, ClassWeight, Classifier, ClassifierFactory, Configurable, GoalEnv, Info,
    ModelBasedSolver, ModelFreeSolver, Obs, Simulation, Step, Transition, ValueFn,
};
pub use error::HrlError;
