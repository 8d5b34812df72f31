use super::OptionChainConfig;
use crate::{
    option::{resolve_solvers, GlobalSolvers, Solver},
    DistanceMetric, ModelBasedOption, OptionId, SalientEvent, SolverKind, TrainingPhase,
};
use anyhow::Result;
use hrl_core::{
    record::Record, ClassifierFactory, Configurable, GoalEnv, HrlError, ModelBasedSolver,
    ModelFreeSolver, Transition,
};
use log::info;
use ndarray::{Array1, ArrayView1};
use rand::{rngs::SmallRng, SeedableRng};
use std::rc::Rc;

/// Name of the option initializing a chain.
pub const GLOBAL_OPTION_NAME: &str = "global-option";

/// Owns the options of a chain and the solvers they share.
///
/// The global option is created with the chain and has id `OptionId(0)`. Its
/// value learner and planner are the instances shared with the other options.
/// Options refer to their parents by [`OptionId`].
pub struct OptionChain<E, V, P>
where
    E: GoalEnv,
    V: Configurable,
    P: Configurable,
{
    pub(super) config: OptionChainConfig,
    pub(super) options: Vec<ModelBasedOption<E, V, P>>,
    global_solvers: GlobalSolvers<V, P>,
    value_learner_config: V::Config,
    planner_config: P::Config,
    classifier_factory: Rc<dyn ClassifierFactory>,
    pub(super) rng: SmallRng,
}

type Opt<E, V, P> = ModelBasedOption<E, V, P>;

/// The option at `ix` and its parent.
pub(super) fn option_and_parent<E, V, P>(
    options: &[Opt<E, V, P>],
    ix: usize,
) -> (&Opt<E, V, P>, Option<&Opt<E, V, P>>)
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act>,
    P: ModelBasedSolver<E::Obs, E::Act>,
{
    let option = &options[ix];
    let parent = option.parent().map(|p| &options[p.0]);
    (option, parent)
}

/// The option at `ix`, mutable, and its parent.
pub(super) fn option_and_parent_mut<E, V, P>(
    options: &mut [Opt<E, V, P>],
    ix: usize,
) -> (&mut Opt<E, V, P>, Option<&Opt<E, V, P>>)
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act>,
    P: ModelBasedSolver<E::Obs, E::Act>,
{
    match options[ix].parent().map(|p| p.0) {
        None => (&mut options[ix], None),
        Some(pix) if pix < ix => {
            let (left, right) = options.split_at_mut(ix);
            (&mut right[0], Some(&left[pix]))
        }
        Some(pix) => {
            let (left, right) = options.split_at_mut(pix);
            (&mut left[ix], Some(&right[0]))
        }
    }
}

impl<E, V, P> OptionChain<E, V, P>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act> + Configurable,
    P: ModelBasedSolver<E::Obs, E::Act> + Configurable,
{
    /// Creates a chain with its global option heading to `goal_salient_event`.
    pub fn new(
        config: OptionChainConfig,
        goal_salient_event: SalientEvent<E::Obs>,
        value_learner_config: V::Config,
        planner_config: P::Config,
        classifier_factory: Rc<dyn ClassifierFactory>,
    ) -> Result<Self> {
        let resolved = resolve_solvers::<E, V, P>(
            &config.option,
            true,
            None,
            &value_learner_config,
            &planner_config,
        )?;
        let global_solvers = GlobalSolvers {
            value_learner: resolved.critic.clone(),
            planner: match &resolved.solver {
                Solver::ModelBased(planner) => Some(planner.clone()),
                Solver::ModelFree(_) => None,
            },
        };
        let global = ModelBasedOption::new(
            GLOBAL_OPTION_NAME,
            OptionId(0),
            config.option.clone(),
            true,
            resolved,
            classifier_factory.clone(),
        )
        .with_target_salient_event(goal_salient_event);

        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            options: vec![global],
            global_solvers,
            value_learner_config,
            planner_config,
            classifier_factory,
        })
    }

    /// Adds an option.
    ///
    /// A child without its own salient event inherits the one of its parent.
    /// A root option needs a salient event.
    pub fn add_option(
        &mut self,
        name: impl Into<String>,
        parent: Option<OptionId>,
        target_salient_event: Option<SalientEvent<E::Obs>>,
    ) -> Result<OptionId> {
        let name = name.into();
        let target_salient_event = match parent {
            Some(pid) => {
                let parent = self.option(pid)?;
                let max = parent.config().max_num_children;
                if parent.children().len() >= max {
                    return Err(HrlError::TooManyChildren {
                        name: parent.name().to_string(),
                        max,
                    }
                    .into());
                }
                target_salient_event.or_else(|| parent.target_salient_event().cloned())
            }
            None => {
                assert!(
                    target_salient_event.is_some(),
                    "Root option {} needs a salient event",
                    name
                );
                target_salient_event
            }
        };

        let id = OptionId(self.options.len());
        let resolved = resolve_solvers::<E, V, P>(
            &self.config.option,
            false,
            Some(&self.global_solvers),
            &self.value_learner_config,
            &self.planner_config,
        )?;
        let mut option = ModelBasedOption::new(
            name,
            id,
            self.config.option.clone(),
            false,
            resolved,
            self.classifier_factory.clone(),
        );
        if let Some(pid) = parent {
            option = option.with_parent(pid);
            self.options[pid.0].add_child(id);
        }
        if let Some(event) = target_salient_event {
            info!("{} heads to {}", option.name(), event);
            option = option.with_target_salient_event(event);
        }
        option.initialize_value_function_with_global_value_function();

        self.options.push(option);
        Ok(id)
    }

    pub(super) fn index(&self, id: OptionId) -> Result<usize> {
        if id.0 < self.options.len() {
            Ok(id.0)
        } else {
            Err(HrlError::UnknownOption(id.0).into())
        }
    }

    /// The option of the given id.
    pub fn option(&self, id: OptionId) -> Result<&ModelBasedOption<E, V, P>> {
        Ok(&self.options[self.index(id)?])
    }

    /// All options, the global one first.
    pub fn options(&self) -> impl Iterator<Item = &ModelBasedOption<E, V, P>> {
        self.options.iter()
    }

    /// Number of options including the global one.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always `false`, the global option exists from the start.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Id of the global option.
    pub fn global_option(&self) -> OptionId {
        OptionId(0)
    }

    /// Configuration.
    pub fn config(&self) -> &OptionChainConfig {
        &self.config
    }

    /// Solvers of the global option.
    pub fn global_solvers(&self) -> &GlobalSolvers<V, P> {
        &self.global_solvers
    }

    /// See [`ModelBasedOption::is_init_true`].
    pub fn is_init_true(&self, id: OptionId, env: &E, obs: &E::Obs) -> Result<bool> {
        Ok(self.option(id)?.is_init_true(env, obs))
    }

    /// See [`ModelBasedOption::pessimistic_is_init_true`].
    pub fn pessimistic_is_init_true(&self, id: OptionId, env: &E, obs: &E::Obs) -> Result<bool> {
        Ok(self.option(id)?.pessimistic_is_init_true(env, obs))
    }

    /// See [`ModelBasedOption::is_term_true`].
    pub fn is_term_true(&self, id: OptionId, env: &E, obs: &E::Obs) -> Result<bool> {
        let (option, parent) = option_and_parent(&self.options, self.index(id)?);
        Ok(option.is_term_true(env, obs, parent))
    }

    /// See [`ModelBasedOption::is_at_local_goal`].
    pub fn is_at_local_goal(
        &self,
        id: OptionId,
        env: &E,
        obs: &E::Obs,
        goal: ArrayView1<f32>,
    ) -> Result<bool> {
        let (option, parent) = option_and_parent(&self.options, self.index(id)?);
        Ok(option.is_at_local_goal(env, obs, goal, parent))
    }

    /// See [`ModelBasedOption::act`].
    pub fn act(
        &mut self,
        id: OptionId,
        env: &mut E,
        obs: &E::Obs,
        goal: ArrayView1<f32>,
    ) -> Result<E::Act> {
        let ix = self.index(id)?;
        Ok(self.options[ix].act(env, obs, goal, &mut self.rng))
    }

    /// See [`ModelBasedOption::observe`].
    pub fn observe(
        &mut self,
        id: OptionId,
        transition: Transition<E::Obs, E::Act>,
        is_dead: bool,
    ) -> Result<()> {
        let ix = self.index(id)?;
        self.options[ix].observe(transition, is_dead);
        Ok(())
    }

    /// See [`ModelBasedOption::refine`].
    pub fn refine(&mut self, id: OptionId, env: &E, goal: ArrayView1<f32>) -> Result<Record> {
        let ix = self.index(id)?;
        let (option, parent) = option_and_parent_mut(&mut self.options, ix);
        option.refine(env, goal, parent)
    }

    /// Samples the goal of a rollout of an option.
    ///
    /// A root option heads to the target of its salient event. Other options
    /// head to the features of an observation sampled from the initiation
    /// region of their parent. `None` means no goal was found.
    pub fn goal_for_rollout(&mut self, id: OptionId, env: &E) -> Result<Option<Array1<f32>>> {
        let (option, parent) = option_and_parent(&self.options, self.index(id)?);
        let goal = match parent {
            None => option
                .target_salient_event()
                .map(|event| event.target_position().clone()),
            Some(parent) => {
                let tolerance = parent
                    .target_salient_event()
                    .map_or(0.0, |event| event.tolerance());
                parent
                    .sample_from_initiation_region_fast_and_epsilon(env, tolerance, &mut self.rng)
                    .map(|obs| env.extract_features(&obs))
            }
        };
        Ok(goal)
    }

    /// See [`ModelBasedOption::distance_to_state`].
    pub fn distance_to_state(
        &self,
        id: OptionId,
        env: &E,
        obs: &E::Obs,
        metric: DistanceMetric,
    ) -> Result<Option<f32>> {
        Ok(self.option(id)?.distance_to_state(env, obs, metric))
    }

    /// Samples a goal and checks if the planner of the option reaches it from
    /// `obs` in simulation. `false` if no goal is found.
    pub fn does_model_rollout_reach_goal(
        &mut self,
        id: OptionId,
        env: &E,
        obs: &E::Obs,
    ) -> Result<bool> {
        let option = self.option(id)?;
        if option.solver_kind() != SolverKind::ModelBased {
            return Err(HrlError::NotModelBased(option.name().to_string()).into());
        }
        let goal = match self.goal_for_rollout(id, env)? {
            Some(goal) => goal,
            None => return Ok(false),
        };
        let (option, parent) = option_and_parent(&self.options, id.0);
        option.does_model_rollout_reach_goal(obs, goal.view(), parent)
    }

    /// Runs [`does_model_rollout_reach_goal`](Self::does_model_rollout_reach_goal)
    /// from the start of every negative example of an option.
    pub fn should_change_negative_examples(&mut self, id: OptionId, env: &E) -> Result<Vec<bool>> {
        let starts: Vec<E::Obs> = self
            .option(id)?
            .negative_examples()
            .filter_map(|example| example.first().cloned())
            .collect();
        starts
            .iter()
            .map(|obs| self.does_model_rollout_reach_goal(id, env, obs))
            .collect()
    }

    /// Selects the option to run from `obs`.
    ///
    /// Prefers an option out of gestation that can start at `obs`, then an
    /// option still in gestation, then the global option.
    pub fn select_option(&self, env: &E, obs: &E::Obs) -> OptionId {
        let local = || self.options.iter().filter(|o| !o.is_global());
        local()
            .find(|o| o.training_phase() == TrainingPhase::InitiationDone && o.is_init_true(env, obs))
            .or_else(|| local().find(|o| o.training_phase() == TrainingPhase::Gestation))
            .map_or(self.global_option(), |o| o.option_idx())
    }
}
