use anyhow::Result;
use clap::Parser;
use hrl_core::{record::BufferedRecorder, GoalEnv};
use hrl_option::{
    classifier::KernelClassifierFactory, DistanceMetric, OptionChain, OptionChainConfig,
    OptionConfig, SalientEvent,
};
use hrl_point_env::{
    GreedySolver, GreedySolverConfig, PointEnv, PointEnvConfig, RandomShootingPlanner,
    RandomShootingPlannerConfig,
};
use log::info;
use ndarray::array;
use std::rc::Rc;

type Chain = OptionChain<PointEnv, GreedySolver, RandomShootingPlanner>;

/// Trains a chain of two options reaching a goal in the point environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of rollouts
    #[arg(long, default_value_t = 200)]
    n_rollouts: usize,

    /// Select actions with the model-based planner
    #[arg(long, default_value_t = false)]
    use_model: bool,

    /// Use dense rewards
    #[arg(long, default_value_t = false)]
    dense_reward: bool,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path to save the configuration of the chain
    #[arg(long)]
    save_config: Option<String>,
}

fn env_config(args: &Args) -> PointEnvConfig {
    PointEnvConfig::default()
        .goal([6.0, 6.0])
        .start_noise(0.2)
        .dense_reward(args.dense_reward)
        .max_steps(300)
}

fn chain_config(args: &Args) -> OptionChainConfig {
    OptionChainConfig::default().seed(args.seed).option(
        OptionConfig::default()
            .use_model(args.use_model)
            .dense_reward(args.dense_reward)
            .timeout(40),
    )
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let env_config = env_config(&args);
    let mut env = PointEnv::build(&env_config, args.seed)?;
    let goal = env.goal();
    let goal_event = SalientEvent::new(goal.clone(), goal, env_config.goal_tolerance);

    let config = chain_config(&args);
    if let Some(path) = &args.save_config {
        config.save(path)?;
    }
    let mut chain = Chain::new(
        config,
        goal_event.clone(),
        GreedySolverConfig::default(),
        RandomShootingPlannerConfig::default().seed(args.seed),
        Rc::new(KernelClassifierFactory::default()),
    )?;
    let root = chain.add_option("option-1", None, Some(goal_event))?;
    let child = chain.add_option("option-2", Some(root), None)?;

    let mut recorder = BufferedRecorder::new();
    chain.train(&mut env, args.n_rollouts, &mut recorder)?;

    let start = array![0.0, 0.0];
    for id in [root, child] {
        let option = chain.option(id)?;
        info!(
            "{}: phase {:?}, success rate {:.2}, distance from start {:?}",
            option.name(),
            option.training_phase(),
            option.success_rate(),
            chain.distance_to_state(id, &env, &start, DistanceMetric::Euclidean)?
        );
    }
    info!("{} rollouts recorded", recorder.len());

    Ok(())
}
