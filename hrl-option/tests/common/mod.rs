#![allow(dead_code)]
use anyhow::Result;
use anyhow::bail;
use hrl_core::{ClassWeight, Classifier, ClassifierFactory, GoalEnv, Transition};
use hrl_option::{
    classifier::KernelClassifierFactory, ModelBasedOption, OptionChain, OptionChainConfig,
    OptionConfig, OptionId, SalientEvent,
};
use hrl_point_env::{
    GreedySolver, GreedySolverConfig, PointEnv, PointEnvConfig, RandomShootingPlanner,
    RandomShootingPlannerConfig,
};
use ndarray::{array, Array1, ArrayView2};
use std::{cell::RefCell, rc::Rc};

pub type Chain = OptionChain<PointEnv, GreedySolver, RandomShootingPlanner>;
pub type PointOption = ModelBasedOption<PointEnv, GreedySolver, RandomShootingPlanner>;

pub const GOAL: [f32; 2] = [4.0, 4.0];
pub const TOLERANCE: f32 = 0.5;

pub fn env(dense_reward: bool) -> Result<PointEnv> {
    let config = PointEnvConfig::default()
        .goal(GOAL)
        .goal_tolerance(TOLERANCE)
        .dense_reward(dense_reward);
    PointEnv::build(&config, 0)
}

pub fn goal_event() -> SalientEvent<Array1<f32>> {
    let goal = array![GOAL[0], GOAL[1]];
    SalientEvent::new(goal.clone(), goal, TOLERANCE)
}

pub fn chain(option_config: OptionConfig) -> Result<Chain> {
    chain_with(OptionChainConfig::default().option(option_config))
}

pub fn chain_with(config: OptionChainConfig) -> Result<Chain> {
    chain_with_factory(config, Rc::new(KernelClassifierFactory::default()))
}

pub fn chain_with_factory(
    config: OptionChainConfig,
    factory: Rc<dyn ClassifierFactory>,
) -> Result<Chain> {
    Chain::new(
        config,
        goal_event(),
        GreedySolverConfig::default(),
        RandomShootingPlannerConfig::default().num_candidates(16),
        factory,
    )
}

/// Accepts the rows whose first feature is `0`.
pub struct OnVerticalAxis;

impl Classifier for OnVerticalAxis {
    fn predict(&self, x: ArrayView2<f32>) -> Vec<bool> {
        x.rows().into_iter().map(|row| row[0].abs() < 1e-3).collect()
    }
}

/// Fits [`OnVerticalAxis`] and keeps the class weights of two-class fits.
#[derive(Default)]
pub struct RecordingFactory {
    pub class_weights: RefCell<Vec<ClassWeight>>,
    pub num_negatives: RefCell<Vec<usize>>,
}

impl ClassifierFactory for RecordingFactory {
    fn fit_two_class(
        &self,
        x: ArrayView2<f32>,
        y: &[bool],
        class_weight: ClassWeight,
    ) -> Result<Box<dyn Classifier>> {
        if x.nrows() != y.len() {
            bail!("{} rows for {} labels", x.nrows(), y.len());
        }
        self.class_weights.borrow_mut().push(class_weight);
        self.num_negatives
            .borrow_mut()
            .push(y.iter().filter(|&&l| !l).count());
        Ok(Box::new(OnVerticalAxis))
    }

    fn fit_one_class(&self, _x: ArrayView2<f32>, _nu: f32) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(OnVerticalAxis))
    }
}

/// A chain with a root option heading to the goal event.
pub fn chain_with_root(option_config: OptionConfig) -> Result<(Chain, OptionId)> {
    let mut chain = chain(option_config)?;
    let root = chain.add_option("root", None, Some(goal_event()))?;
    Ok((chain, root))
}

/// `n` evenly spaced points from `from` to `to`.
pub fn path(from: [f32; 2], to: [f32; 2], n: usize) -> Vec<Array1<f32>> {
    (0..n)
        .map(|i| {
            let t = i as f32 / (n - 1) as f32;
            array![
                from[0] + t * (to[0] - from[0]),
                from[1] + t * (to[1] - from[1])
            ]
        })
        .collect()
}

/// Feeds the transitions along `path` to an option; the last one may be deadly.
pub fn observe_path(chain: &mut Chain, id: OptionId, path: &[Array1<f32>], dies: bool) -> Result<()> {
    let n = path.len();
    for (i, w) in path.windows(2).enumerate() {
        let is_dead = dies && i + 2 == n;
        let act = &w[1] - &w[0];
        chain.observe(
            id,
            Transition::new(w[0].clone(), act, -1.0, w[1].clone(), is_dead),
            is_dead,
        )?;
    }
    Ok(())
}

/// Runs a rollout along `path` by hand and refines the option.
pub fn execute(
    chain: &mut Chain,
    id: OptionId,
    env: &PointEnv,
    path: &[Array1<f32>],
    dies: bool,
) -> Result<()> {
    observe_path(chain, id, path, dies)?;
    chain.refine(id, env, array![GOAL[0], GOAL[1]].view())?;
    Ok(())
}

/// A successful execution from an offset start.
pub fn succeed(chain: &mut Chain, id: OptionId, env: &PointEnv, offset: f32) -> Result<()> {
    let p = path([offset, -offset], GOAL, 10);
    execute(chain, id, env, &p, false)
}

/// A failed execution from `start`.
pub fn fail(chain: &mut Chain, id: OptionId, env: &PointEnv, start: [f32; 2]) -> Result<()> {
    let p = path(start, [start[0], start[1] + 1.0], 5);
    execute(chain, id, env, &p, false)
}

/// Points of a grid over `[-2, 6]^2`.
pub fn grid() -> Vec<Array1<f32>> {
    (0..17)
        .flat_map(|i| (0..17).map(move |j| array![i as f32 * 0.5 - 2.0, j as f32 * 0.5 - 2.0]))
        .collect()
}
