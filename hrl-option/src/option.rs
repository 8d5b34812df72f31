//! Options.
//!
//! [`ModelBasedOption`] is a goal-conditioned option. Its life cycle:
//!
//! 1. During [`TrainingPhase::Gestation`] the option may start anywhere.
//!    After `gestation_period` successful rollouts it switches, once and for
//!    all, to [`TrainingPhase::InitiationDone`], where its initiation set is
//!    given by an optimistic and a pessimistic classifier.
//! 2. A rollout repeatedly calls [`ModelBasedOption::act`] and
//!    [`ModelBasedOption::observe`].
//! 3. [`ModelBasedOption::refine`] then relabels the collected transitions
//!    with the pursued and the reached goal to train the value learners, and
//!    refits the initiation classifiers.
//!
//! Termination of an option depends on its parent, so the methods that need
//! it take the parent explicitly. [`OptionChain`](crate::OptionChain) resolves
//! parents from [`OptionId`]s.
mod base;
mod config;
mod initiation;
mod sampling;
mod solver;
pub use base::ModelBasedOption;
pub use config::OptionConfig;
pub use sampling::{ClassifierKind, DistanceMetric, NUM_FEASIBILITY_ROLLOUTS};
pub use solver::{
    exploration_epsilon, resolve_solvers, solver_plan, GlobalSolvers, ResolvedSolvers, Shared,
    Solver, SolverKind, SolverPlan, SolverSource,
};
use std::fmt;

/// Index of an option in its [`OptionChain`](crate::OptionChain).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub usize);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Training phase of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingPhase {
    /// The option initiates everywhere to collect bootstrap data.
    Gestation,

    /// Initiation is gated by the classifiers.
    InitiationDone,
}
