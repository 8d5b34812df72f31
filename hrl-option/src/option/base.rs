use super::{
    exploration_epsilon, OptionConfig, OptionId, ResolvedSolvers, Shared, Solver, SolverKind,
    TrainingPhase,
};
use crate::{util::push_bounded, SalientEvent};
use anyhow::Result;
use hrl_core::{
    record::{Record, RecordValue},
    Classifier, ClassifierFactory, GoalEnv, ModelBasedSolver, ModelFreeSolver, Obs, Transition,
    ValueFn,
};
use log::{debug, info, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use std::{collections::VecDeque, rc::Rc};

/// A goal-conditioned option with learned initiation classifiers.
///
/// `V` is the model-free value learner and `P` the model-based planner. Which
/// of them selects actions is fixed at construction by
/// [`OptionConfig::use_model`].
pub struct ModelBasedOption<E: GoalEnv, V, P> {
    pub(super) name: String,
    pub(super) option_idx: OptionId,
    pub(super) parent: Option<OptionId>,
    pub(super) children: Vec<OptionId>,
    pub(super) global_init: bool,
    pub(super) config: OptionConfig,

    pub(super) phase: TrainingPhase,
    pub(super) num_executions: usize,
    pub(super) num_goal_hits: usize,
    pub(super) success_curve: VecDeque<bool>,

    pub(super) positive_examples: VecDeque<Vec<E::Obs>>,
    pub(super) negative_examples: VecDeque<Vec<E::Obs>>,
    pub(super) optimistic_classifier: Option<Box<dyn Classifier>>,
    pub(super) pessimistic_classifier: Option<Box<dyn Classifier>>,
    pub(super) classifier_factory: Rc<dyn ClassifierFactory>,
    pub(super) effect_set: VecDeque<E::Obs>,

    pub(super) value_learner: Option<Shared<V>>,
    pub(super) global_value_learner: Option<Shared<V>>,
    pub(super) critic: Shared<V>,
    pub(super) solver: Solver<V, P>,
    pub(super) target_salient_event: Option<SalientEvent<E::Obs>>,

    // Cleared by refine.
    pub(super) option_transitions: Vec<Transition<E::Obs, E::Act>>,
    pub(super) visited_states: Vec<E::Obs>,
    pub(super) last_is_dead: bool,
}

impl<E, V, P> ModelBasedOption<E, V, P>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act>,
    P: ModelBasedSolver<E::Obs, E::Act>,
{
    /// Creates an option with the solvers given by
    /// [`resolve_solvers`](super::resolve_solvers).
    pub fn new(
        name: impl Into<String>,
        option_idx: OptionId,
        config: OptionConfig,
        global_init: bool,
        solvers: ResolvedSolvers<V, P>,
        classifier_factory: Rc<dyn ClassifierFactory>,
    ) -> Self {
        let name = name.into();
        let phase = if config.gestation_period == 0 {
            TrainingPhase::InitiationDone
        } else {
            TrainingPhase::Gestation
        };
        info!(
            "Created option {} ({}), solver: {:?}, global: {}",
            name,
            option_idx,
            solvers.solver.kind(),
            global_init
        );

        Self {
            name,
            option_idx,
            parent: None,
            children: vec![],
            global_init,
            phase,
            num_executions: 0,
            num_goal_hits: 0,
            success_curve: VecDeque::with_capacity(config.buffer_length),
            positive_examples: VecDeque::with_capacity(config.buffer_length),
            negative_examples: VecDeque::with_capacity(config.buffer_length),
            optimistic_classifier: None,
            pessimistic_classifier: None,
            classifier_factory,
            effect_set: VecDeque::with_capacity(config.buffer_length),
            value_learner: solvers.value_learner,
            global_value_learner: solvers.global_value_learner,
            critic: solvers.critic,
            solver: solvers.solver,
            target_salient_event: None,
            option_transitions: vec![],
            visited_states: vec![],
            last_is_dead: false,
            config,
        }
    }

    /// Sets the parent option.
    pub fn with_parent(mut self, parent: OptionId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the salient event the option terminates in when it is a root.
    pub fn with_target_salient_event(mut self, event: SalientEvent<E::Obs>) -> Self {
        self.target_salient_event = Some(event);
        self
    }

    pub(crate) fn add_child(&mut self, child: OptionId) {
        self.children.push(child);
    }

    fn check_parent(&self, parent: Option<&Self>) {
        debug_assert_eq!(
            parent.map(|p| p.option_idx),
            self.parent,
            "Wrong parent given to option {}",
            self.name
        );
    }

    pub(super) fn optimistic_accepts(&self, features: ArrayView1<f32>) -> bool {
        self.optimistic_classifier
            .as_ref()
            .is_some_and(|clf| clf.predict_one(features))
    }

    pub(super) fn pessimistic_accepts(&self, features: ArrayView1<f32>) -> bool {
        self.pessimistic_classifier
            .as_ref()
            .is_some_and(|clf| clf.predict_one(features))
    }

    fn initiates_everywhere(&self) -> bool {
        self.global_init || self.phase == TrainingPhase::Gestation
    }

    /// Returns `true` if the option can start at `obs`.
    pub fn is_init_true(&self, env: &E, obs: &E::Obs) -> bool {
        if self.initiates_everywhere() || env.is_start_region(obs) {
            return true;
        }
        let features = env.extract_features(obs);
        self.optimistic_accepts(features.view()) || self.pessimistic_accepts(features.view())
    }

    /// Returns `true` if the pessimistic classifier accepts `obs`.
    pub fn pessimistic_is_init_true(&self, env: &E, obs: &E::Obs) -> bool {
        if self.initiates_everywhere() {
            return true;
        }
        self.pessimistic_accepts(env.extract_features(obs).view())
    }

    /// Returns `true` if the option terminates at `obs`.
    ///
    /// `parent` must be the parent of this option, or `None` for a root.
    pub fn is_term_true(&self, env: &E, obs: &E::Obs, parent: Option<&Self>) -> bool {
        self.check_parent(parent);
        match parent {
            Some(parent) => parent.pessimistic_is_init_true(env, obs),
            None => self
                .target_salient_event
                .as_ref()
                .is_some_and(|event| event.contains(env.position(obs).view())),
        }
    }

    /// Same as [`is_term_true`](Self::is_term_true), but `false` if the agent died.
    pub fn is_term_true_unless_dead(
        &self,
        env: &E,
        obs: &E::Obs,
        is_dead: bool,
        parent: Option<&Self>,
    ) -> bool {
        !is_dead && self.is_term_true(env, obs, parent)
    }

    /// Termination test on a point used both as position and as features.
    pub fn is_term_true_at(&self, point: ArrayView1<f32>, parent: Option<&Self>) -> bool {
        self.check_parent(parent);
        match parent {
            Some(parent) => parent.initiates_everywhere() || parent.pessimistic_accepts(point),
            None => self
                .target_salient_event
                .as_ref()
                .is_some_and(|event| event.contains(point)),
        }
    }

    /// Returns `true` if `obs` reaches `goal` and the option terminates there.
    pub fn is_at_local_goal(
        &self,
        env: &E,
        obs: &E::Obs,
        goal: ArrayView1<f32>,
        parent: Option<&Self>,
    ) -> bool {
        let (_, done) = env.reward_func(obs, goal);
        done && self.is_term_true(env, obs, parent)
    }

    /// Observation followed by the first `goal_dim` entries of `goal`.
    pub fn augmented_state(&self, obs: &E::Obs, goal: ArrayView1<f32>) -> Array1<f32> {
        let goal_dim = self.config.goal_dim;
        assert!(
            goal.len() >= goal_dim,
            "Goal of length {} is shorter than goal_dim = {}",
            goal.len(),
            goal_dim
        );
        obs.flatten()
            .iter()
            .chain(goal.iter().take(goal_dim))
            .copied()
            .collect()
    }

    /// Values of states heading to goals, one per row.
    ///
    /// A single state or goal row is paired with every row of the other.
    pub fn value_function(&self, states: ArrayView2<f32>, goals: ArrayView2<f32>) -> Array1<f32> {
        let goal_dim = self.config.goal_dim;
        assert!(
            goals.ncols() >= goal_dim,
            "Goals of length {} are shorter than goal_dim = {}",
            goals.ncols(),
            goal_dim
        );
        let (ns, ng) = (states.nrows(), goals.nrows());
        assert!(
            ns == ng || ns == 1 || ng == 1,
            "Cannot pair {} states with {} goals",
            ns,
            ng
        );
        let n = ns.max(ng);
        let d = states.ncols();
        let augmented = Array2::from_shape_fn((n, d + goal_dim), |(i, j)| {
            if j < d {
                states[[i.min(ns - 1), j]]
            } else {
                goals[[i.min(ng - 1), j - d]]
            }
        });
        self.critic.borrow().get_values(augmented.view())
    }

    /// Selects an action for `obs` heading to `goal`, exploring epsilon-greedily.
    pub fn act(
        &self,
        env: &mut E,
        obs: &E::Obs,
        goal: ArrayView1<f32>,
        rng: &mut impl Rng,
    ) -> E::Act {
        let epsilon = exploration_epsilon(
            self.solver.kind(),
            self.config.dense_reward,
            self.num_goal_hits,
        );
        if rng.gen::<f32>() < epsilon {
            return env.sample_action();
        }

        match &self.solver {
            Solver::ModelBased(planner) => {
                if self.config.use_vf {
                    let vf: ValueFn = &|s, g| self.value_function(s, g);
                    planner.borrow_mut().act(obs, goal, Some(vf))
                } else {
                    planner.borrow_mut().act(obs, goal, None)
                }
            }
            Solver::ModelFree(learner) => {
                let state = self.augmented_state(obs, goal);
                learner.borrow_mut().act(state.view())
            }
        }
    }

    /// Starts an execution from `obs`, dropping any unrefined one.
    ///
    /// An execution started this way is counted by [`refine`](Self::refine)
    /// even when no transition follows.
    pub fn start_execution(&mut self, obs: E::Obs) {
        self.option_transitions.clear();
        self.visited_states.clear();
        self.visited_states.push(obs);
        self.last_is_dead = false;
    }

    /// Stores a transition of the current execution.
    ///
    /// Model-based options also feed it to the planner's dynamics model.
    pub fn observe(&mut self, transition: Transition<E::Obs, E::Act>, is_dead: bool) {
        if self.visited_states.is_empty() {
            self.visited_states.push(transition.obs.clone());
        }
        self.visited_states.push(transition.next_obs.clone());
        self.last_is_dead = is_dead;

        if let Solver::ModelBased(planner) = &self.solver {
            planner.borrow_mut().step(transition.clone());
        }
        trace!("{}: reward = {}", self.name, transition.reward);
        self.option_transitions.push(transition);
    }

    /// Updates the option from the current execution and clears it.
    ///
    /// An execution started without any step is judged on its start
    /// observation. Without a started execution or observed transitions
    /// nothing changes.
    pub fn refine(&mut self, env: &E, goal: ArrayView1<f32>, parent: Option<&Self>) -> Result<Record> {
        let final_obs = match self.visited_states.last() {
            Some(obs) => obs.clone(),
            None => {
                debug!("{}: nothing to refine", self.name);
                return Ok(Record::empty());
            }
        };

        let success = self.is_term_true_unless_dead(env, &final_obs, self.last_is_dead, parent);
        self.num_executions += 1;
        push_bounded(&mut self.success_curve, success, self.config.buffer_length);

        if success {
            self.num_goal_hits += 1;
            push_bounded(
                &mut self.effect_set,
                final_obs.clone(),
                self.config.buffer_length,
            );
            if parent.is_none() {
                if let Some(event) = self.target_salient_event.as_mut() {
                    event.add_to_effect_set(final_obs.clone(), env.position(&final_obs));
                }
            }
            info!(
                "{} reached its goal ({}/{})",
                self.name, self.num_goal_hits, self.num_executions
            );
        }
        self.update_training_phase();

        if self.config.use_vf {
            let reached_goal = env.extract_features(&final_obs);
            self.experience_replay(env, goal, parent);
            self.experience_replay(env, reached_goal.view(), parent);
        }

        let num_transitions = self.option_transitions.len();
        self.derive_positive_and_negative_examples(success);
        self.option_transitions.clear();
        self.visited_states.clear();
        self.last_is_dead = false;

        if !self.global_init {
            self.fit_initiation_classifier(env)?;
        }

        let mut record = Record::from_scalar("success", if success { 1.0 } else { 0.0 });
        record.insert(
            "num_transitions",
            RecordValue::Scalar(num_transitions as f32),
        );
        record.insert(
            "num_executions",
            RecordValue::Scalar(self.num_executions as f32),
        );
        record.insert(
            "num_goal_hits",
            RecordValue::Scalar(self.num_goal_hits as f32),
        );
        record.insert("success_rate", RecordValue::Scalar(self.success_rate()));
        Ok(record)
    }

    fn update_training_phase(&mut self) {
        if self.phase == TrainingPhase::Gestation
            && self.num_goal_hits >= self.config.gestation_period
        {
            self.phase = TrainingPhase::InitiationDone;
            info!(
                "{} finished gestation after {} goal hits",
                self.name, self.num_goal_hits
            );
        }
    }

    /// Relabels the current execution with `goal` and trains the value learners.
    fn experience_replay(&self, env: &E, goal: ArrayView1<f32>, parent: Option<&Self>) {
        for t in self.option_transitions.iter() {
            let (reward, global_done) = env.reward_func(&t.next_obs, goal);
            let done = self.is_at_local_goal(env, &t.next_obs, goal, parent);
            let state = self.augmented_state(&t.obs, goal);
            let next_state = self.augmented_state(&t.next_obs, goal);

            if let Some(vl) = &self.value_learner {
                vl.borrow_mut().step(Transition::new(
                    state.clone(),
                    t.act.clone(),
                    reward,
                    next_state.clone(),
                    done,
                ));
            }
            if !self.global_init {
                if let Some(vl) = &self.global_value_learner {
                    vl.borrow_mut().step(Transition::new(
                        state,
                        t.act.clone(),
                        reward,
                        next_state,
                        global_done,
                    ));
                }
            }
        }
    }

    /// Copies the global value learner into the own one.
    ///
    /// Applies to child options learning their own value function.
    pub fn initialize_value_function_with_global_value_function(&self) {
        if !self.config.use_vf || self.config.use_global_vf || self.parent.is_none() {
            return;
        }
        if let (Some(vl), Some(global)) = (&self.value_learner, &self.global_value_learner) {
            vl.borrow_mut().sync_from(&global.borrow());
            debug!("{}: initialized value function with the global one", self.name);
        }
    }

    /// Goal hits per execution, `1.0` before the first execution.
    pub fn success_rate(&self) -> f32 {
        if self.num_executions == 0 {
            1.0
        } else {
            self.num_goal_hits as f32 / self.num_executions as f32
        }
    }

    /// Mean of the recent outcomes, `0.0` before the first execution.
    pub fn recent_success_rate(&self) -> f32 {
        if self.success_curve.is_empty() {
            0.0
        } else {
            let hits = self.success_curve.iter().filter(|&&s| s).count();
            hits as f32 / self.success_curve.len() as f32
        }
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index in the chain.
    pub fn option_idx(&self) -> OptionId {
        self.option_idx
    }

    /// Parent option.
    pub fn parent(&self) -> Option<OptionId> {
        self.parent
    }

    /// Child options.
    pub fn children(&self) -> &[OptionId] {
        &self.children
    }

    /// Returns `true` for the option initializing the chain.
    pub fn is_global(&self) -> bool {
        self.global_init
    }

    /// Configuration.
    pub fn config(&self) -> &OptionConfig {
        &self.config
    }

    /// Training phase.
    pub fn training_phase(&self) -> TrainingPhase {
        self.phase
    }

    /// Number of refined executions.
    pub fn num_executions(&self) -> usize {
        self.num_executions
    }

    /// Number of executions reaching the goal.
    pub fn num_goal_hits(&self) -> usize {
        self.num_goal_hits
    }

    /// Type of the solver.
    pub fn solver_kind(&self) -> SolverKind {
        self.solver.kind()
    }

    /// The solver selecting actions.
    pub fn solver(&self) -> &Solver<V, P> {
        &self.solver
    }

    /// The value learner trained on the option's own data.
    pub fn value_learner(&self) -> Option<&Shared<V>> {
        self.value_learner.as_ref()
    }

    /// The value learner shared by all options.
    pub fn global_value_learner(&self) -> Option<&Shared<V>> {
        self.global_value_learner.as_ref()
    }

    /// Salient event the option terminates in as a root.
    pub fn target_salient_event(&self) -> Option<&SalientEvent<E::Obs>> {
        self.target_salient_event.as_ref()
    }

    /// Positive trajectories, oldest first.
    pub fn positive_examples(&self) -> impl Iterator<Item = &Vec<E::Obs>> {
        self.positive_examples.iter()
    }

    /// Negative trajectories, oldest first.
    pub fn negative_examples(&self) -> impl Iterator<Item = &Vec<E::Obs>> {
        self.negative_examples.iter()
    }

    /// Final observations of successful executions, oldest first.
    pub fn effect_set(&self) -> impl Iterator<Item = &E::Obs> {
        self.effect_set.iter()
    }

    /// Optimistic classifier, if fitted.
    pub fn optimistic_classifier(&self) -> Option<&dyn Classifier> {
        self.optimistic_classifier.as_deref()
    }

    /// Pessimistic classifier, if fitted.
    pub fn pessimistic_classifier(&self) -> Option<&dyn Classifier> {
        self.pessimistic_classifier.as_deref()
    }

    /// Number of transitions of the current execution.
    pub fn num_pending_transitions(&self) -> usize {
        self.option_transitions.len()
    }
}
