#![warn(missing_docs)]
//! Options with learned initiation sets for hierarchical reinforcement learning.
//!
//! An option (skill) is a sub-policy that starts only where its initiation
//! classifiers accept the state, acts toward a goal until its termination
//! condition fires, and refines both its classifiers and its goal-conditioned
//! value function from its own rollouts.
//!
//! Options are chained: a root option terminates in a [`SalientEvent`], and
//! every other option terminates where its parent may start. The
//! [`OptionChain`] owns all options of a chain together with the value learner
//! and planner they share, and drives rollouts.
//!
//! ```mermaid
//! graph LR
//!     Global[global option] -.shares solvers.-> O1
//!     O2[option 2] -- terminates in --> O1[option 1]
//!     O1 -- terminates in --> SE[salient event]
//! ```
pub mod chain;
pub mod classifier;
pub mod option;
mod salient_event;
mod util;
pub use chain::{OptionChain, OptionChainConfig, RolloutOutcome};
pub use option::{
    exploration_epsilon, DistanceMetric, ModelBasedOption, OptionConfig, OptionId, Solver,
    SolverKind, TrainingPhase,
};
pub use salient_event::SalientEvent;
