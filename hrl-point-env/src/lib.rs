#![warn(missing_docs)]
//! Goal-conditioned point navigation.
//!
//! A point moves in a square arena by velocity actions. Observations are its
//! 2-D position, which also serves as features and position for options.
//! [`GreedySolver`] and [`RandomShootingPlanner`] are simple solvers over this
//! environment; they count the transitions they receive.
mod env;
mod solver;
pub use env::{PointEnv, PointEnvConfig};
pub use solver::{
    GreedySolver, GreedySolverConfig, PlannerModel, RandomShootingPlanner,
    RandomShootingPlannerConfig,
};
