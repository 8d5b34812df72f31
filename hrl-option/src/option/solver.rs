//! Resolution of the solvers of an option.
use super::OptionConfig;
use anyhow::Result;
use hrl_core::{Configurable, GoalEnv, ModelBasedSolver, ModelFreeSolver};
use std::{cell::RefCell, rc::Rc};

/// A solver shared between options of a chain.
pub type Shared<T> = Rc<RefCell<T>>;

/// Type of the solver selecting the actions of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverKind {
    /// Goal-conditioned value learner over augmented states.
    ModelFree,

    /// Planner with a learned dynamics model.
    ModelBased,
}

/// The solver selecting the actions of an option.
pub enum Solver<V, P> {
    /// Model-free value learner.
    ModelFree(Shared<V>),

    /// Model-based planner.
    ModelBased(Shared<P>),
}

impl<V, P> Solver<V, P> {
    /// Type of the solver.
    pub fn kind(&self) -> SolverKind {
        match self {
            Self::ModelFree(_) => SolverKind::ModelFree,
            Self::ModelBased(_) => SolverKind::ModelBased,
        }
    }
}

impl<V, P> Clone for Solver<V, P> {
    fn clone(&self) -> Self {
        match self {
            Self::ModelFree(s) => Self::ModelFree(s.clone()),
            Self::ModelBased(s) => Self::ModelBased(s.clone()),
        }
    }
}

/// Where a solver of an option comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverSource {
    /// Not used.
    Absent,

    /// A fresh instance owned by the option.
    Own,

    /// The instance of the global option.
    Global,
}

/// Sources of the solvers of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverPlan {
    /// The value learner trained on the option's own data.
    pub value_learner: SolverSource,

    /// The value learner shared by all options.
    pub global_value_learner: SolverSource,

    /// The solver acting when the option is model-free.
    pub model_free_solver: SolverSource,

    /// The solver acting when the option is model-based.
    pub planner: SolverSource,
}

/// Decides the sources of the solvers from `global_init` and `use_global_vf`.
///
/// | global_init | use_global_vf | value learner | global value learner | model-free | model-based |
/// |---|---|---|---|---|---|
/// | true  | any   | own    | absent | own    | own    |
/// | false | true  | absent | global | global | global |
/// | false | false | own    | global | own    | global |
pub fn solver_plan(global_init: bool, use_global_vf: bool) -> SolverPlan {
    use SolverSource::*;
    match (global_init, use_global_vf) {
        (true, _) => SolverPlan {
            value_learner: Own,
            global_value_learner: Absent,
            model_free_solver: Own,
            planner: Own,
        },
        (false, true) => SolverPlan {
            value_learner: Absent,
            global_value_learner: Global,
            model_free_solver: Global,
            planner: Global,
        },
        (false, false) => SolverPlan {
            value_learner: Own,
            global_value_learner: Global,
            model_free_solver: Own,
            planner: Global,
        },
    }
}

/// Solvers of the global option, shared with the other options of a chain.
pub struct GlobalSolvers<V, P> {
    /// Global value learner.
    pub value_learner: Shared<V>,

    /// Global planner, if options are model-based.
    pub planner: Option<Shared<P>>,
}

impl<V, P> Clone for GlobalSolvers<V, P> {
    fn clone(&self) -> Self {
        Self {
            value_learner: self.value_learner.clone(),
            planner: self.planner.clone(),
        }
    }
}

/// Solvers of an option after resolving its [`SolverPlan`].
pub struct ResolvedSolvers<V, P> {
    /// The value learner trained on the option's own data.
    pub value_learner: Option<Shared<V>>,

    /// The value learner shared by all options.
    pub global_value_learner: Option<Shared<V>>,

    /// The solver selecting actions.
    pub solver: Solver<V, P>,

    /// The value learner queried for state values.
    pub critic: Shared<V>,
}

fn pick<T>(source: SolverSource, own: impl FnOnce() -> T, global: Option<&T>) -> Option<T>
where
    T: Clone,
{
    match source {
        SolverSource::Absent => None,
        SolverSource::Own => Some(own()),
        SolverSource::Global => match global {
            Some(global) => Some(global.clone()),
            None => panic!("A non-global option needs the solvers of the global option"),
        },
    }
}

/// Builds or borrows the solvers of an option.
///
/// `global` must be given unless `global_init` is `true`. A fresh planner
/// loads the dynamics model at `config.path_to_model`, if any.
pub fn resolve_solvers<E, V, P>(
    config: &OptionConfig,
    global_init: bool,
    global: Option<&GlobalSolvers<V, P>>,
    value_learner_config: &V::Config,
    planner_config: &P::Config,
) -> Result<ResolvedSolvers<V, P>>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act> + Configurable,
    P: ModelBasedSolver<E::Obs, E::Act> + Configurable,
{
    let plan = solver_plan(global_init, config.use_global_vf);
    let fresh_vl = || Rc::new(RefCell::new(V::build(value_learner_config.clone())));

    let value_learner = pick(plan.value_learner, fresh_vl, None);
    let global_value_learner = pick(
        plan.global_value_learner,
        fresh_vl,
        global.map(|g| &g.value_learner),
    );

    let solver = if config.use_model {
        let planner = pick(
            plan.planner,
            || Rc::new(RefCell::new(P::build(planner_config.clone()))),
            global.and_then(|g| g.planner.as_ref()),
        );
        let planner = match planner {
            Some(planner) => planner,
            None => panic!("Model-based options need a planner"),
        };
        if plan.planner == SolverSource::Own {
            if let Some(path) = &config.path_to_model {
                planner.borrow_mut().load_model(path)?;
            }
        }
        Solver::ModelBased(planner)
    } else {
        assert!(
            config.use_vf,
            "Model-free options must learn a value function (use_vf = false)"
        );
        let learner = match plan.model_free_solver {
            SolverSource::Global => global_value_learner.clone(),
            _ => value_learner.clone(),
        };
        match learner {
            Some(learner) => Solver::ModelFree(learner),
            None => panic!("No value learner to act with"),
        }
    };

    let critic = match (&value_learner, &global_value_learner) {
        (Some(vl), _) => vl.clone(),
        (None, Some(vl)) => vl.clone(),
        (None, None) => panic!("An option needs a value learner"),
    };

    Ok(ResolvedSolvers {
        value_learner,
        global_value_learner,
        solver,
        critic,
    })
}

/// Probability of taking a random action.
///
/// Model-based options explore with 0.1. Model-free options explore with 0.8
/// under sparse rewards until they have more than 3 goal hits, and with 0.2
/// otherwise.
pub fn exploration_epsilon(kind: SolverKind, dense_reward: bool, num_goal_hits: usize) -> f32 {
    match kind {
        SolverKind::ModelBased => 0.1,
        SolverKind::ModelFree if !dense_reward && num_goal_hits <= 3 => 0.8,
        SolverKind::ModelFree => 0.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_plan_resolves_every_combination() {
        use SolverSource::*;

        for use_global_vf in [false, true] {
            let plan = solver_plan(true, use_global_vf);
            assert_eq!(plan.value_learner, Own);
            assert_eq!(plan.global_value_learner, Absent);
            assert_eq!(plan.model_free_solver, Own);
            assert_eq!(plan.planner, Own);
        }

        let plan = solver_plan(false, true);
        assert_eq!(plan.value_learner, Absent);
        assert_eq!(plan.global_value_learner, Global);
        assert_eq!(plan.model_free_solver, Global);
        assert_eq!(plan.planner, Global);

        let plan = solver_plan(false, false);
        assert_eq!(plan.value_learner, Own);
        assert_eq!(plan.global_value_learner, Global);
        assert_eq!(plan.model_free_solver, Own);
        assert_eq!(plan.planner, Global);
    }

    #[test]
    fn test_exploration_epsilon() {
        for hits in [0, 2, 4, 100] {
            assert_eq!(exploration_epsilon(SolverKind::ModelBased, false, hits), 0.1);
            assert_eq!(exploration_epsilon(SolverKind::ModelBased, true, hits), 0.1);
        }
        assert_eq!(exploration_epsilon(SolverKind::ModelFree, false, 2), 0.8);
        assert_eq!(exploration_epsilon(SolverKind::ModelFree, false, 3), 0.8);
        assert_eq!(exploration_epsilon(SolverKind::ModelFree, false, 4), 0.2);
        assert_eq!(exploration_epsilon(SolverKind::ModelFree, true, 0), 0.2);
    }
}
