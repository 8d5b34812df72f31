mod common;
use anyhow::Result;
use common::*;
use hrl_core::{ClassWeight, Classifier, HrlError};
use hrl_option::{
    exploration_epsilon, OptionChainConfig, OptionConfig, SolverKind, TrainingPhase,
};
use ndarray::{array, Array2};
use rand::{rngs::SmallRng, SeedableRng};
use std::{fs::File, io::Write, rc::Rc};
use tempdir::TempDir;
use test_log::test;

#[test]
fn test_success_rate_before_execution() -> Result<()> {
    let (chain, root) = chain_with_root(OptionConfig::default())?;
    let option = chain.option(root)?;

    assert_eq!(option.success_rate(), 1.0);
    assert_eq!(option.recent_success_rate(), 0.0);
    assert_eq!(option.training_phase(), TrainingPhase::Gestation);
    assert!(option.optimistic_classifier().is_none());
    assert!(option.pessimistic_classifier().is_none());
    Ok(())
}

#[test]
fn test_gestation_ends_after_third_success() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().gestation_period(3))?;

    for i in 0..3 {
        assert_eq!(
            chain.option(root)?.training_phase(),
            TrainingPhase::Gestation
        );
        succeed(&mut chain, root, &env, 0.2 * i as f32)?;
    }
    assert_eq!(
        chain.option(root)?.training_phase(),
        TrainingPhase::InitiationDone
    );

    // Failures never bring the option back to gestation.
    fail(&mut chain, root, &env, [-3.0, -3.0])?;
    fail(&mut chain, root, &env, [-4.0, 2.0])?;
    let option = chain.option(root)?;
    assert_eq!(option.training_phase(), TrainingPhase::InitiationDone);
    assert_eq!(option.num_executions(), 5);
    assert_eq!(option.num_goal_hits(), 3);
    assert_eq!(option.success_rate(), 0.6);
    Ok(())
}

#[test]
fn test_zero_gestation_period_starts_with_classifiers() -> Result<()> {
    let env = env(false)?;
    let (chain, root) = chain_with_root(OptionConfig::default().gestation_period(0))?;
    let option = chain.option(root)?;

    assert_eq!(option.training_phase(), TrainingPhase::InitiationDone);
    // Unset classifiers reject outside the start region.
    assert!(!option.is_init_true(&env, &array![2.0, 2.0]));
    assert!(option.is_init_true(&env, &array![0.1, 0.1]));
    assert!(!option.pessimistic_is_init_true(&env, &array![0.1, 0.1]));
    Ok(())
}

#[test]
fn test_one_class_fit_nests_pessimistic_in_optimistic() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    for i in 0..5 {
        succeed(&mut chain, root, &env, 0.3 * i as f32)?;
    }

    let option = chain.option(root)?;
    assert_eq!(option.positive_examples().count(), 5);
    assert_eq!(option.negative_examples().count(), 0);
    let optimistic = option.optimistic_classifier().expect("optimistic classifier");
    let pessimistic = option.pessimistic_classifier().expect("pessimistic classifier");

    let points = grid();
    let x = Array2::from_shape_fn((points.len(), 2), |(i, j)| points[i][j]);
    let po = optimistic.predict(x.view());
    let pp = pessimistic.predict(x.view());
    assert!(pp.iter().any(|&p| p));
    assert!(pp.iter().zip(po.iter()).all(|(&p, &o)| !p || o));
    Ok(())
}

#[test]
fn test_two_class_fit_sets_both_classifiers() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    for i in 0..3 {
        succeed(&mut chain, root, &env, 0.2 * i as f32)?;
    }
    for i in 0..3 {
        fail(&mut chain, root, &env, [-6.0, -6.0 + i as f32])?;
    }

    let option = chain.option(root)?;
    assert_eq!(option.negative_examples().count(), 3);
    assert!(option.negative_examples().all(|example| example.len() == 1));
    assert!(option.optimistic_classifier().is_some());
    assert!(option.pessimistic_classifier().is_some());
    assert!(option.is_init_true(&env, &array![2.0, 2.0]));
    Ok(())
}

#[test]
fn test_positive_example_is_start_and_trailing_states() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().buffer_length(4))?;
    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, false)?;

    let option = chain.option(root)?;
    let example = option.positive_examples().next().expect("positive example");
    assert_eq!(example.len(), 5);
    assert_eq!(example[0], p[0]);
    assert_eq!(&example[1..], &p[6..]);
    Ok(())
}

#[test]
fn test_example_buffers_are_bounded() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().buffer_length(3))?;
    for i in 0..5 {
        fail(&mut chain, root, &env, [-5.0 + i as f32, -5.0])?;
    }

    let option = chain.option(root)?;
    let starts: Vec<_> = option.negative_examples().map(|e| e[0].clone()).collect();
    assert_eq!(
        starts,
        vec![array![-3.0, -5.0], array![-2.0, -5.0], array![-1.0, -5.0]]
    );
    Ok(())
}

#[test]
fn test_zero_transition_refine_is_noop() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    let record = chain.refine(root, &env, array![GOAL[0], GOAL[1]].view())?;

    let option = chain.option(root)?;
    assert!(record.is_empty());
    assert_eq!(option.num_executions(), 0);
    assert_eq!(option.success_rate(), 1.0);
    assert_eq!(
        chain.global_solvers().value_learner.borrow().n_transitions(),
        0
    );
    Ok(())
}

#[test]
fn test_hindsight_relabeling_feeds_both_learners() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, false)?;

    let option = chain.option(root)?;
    let own = option.value_learner().expect("own value learner").borrow();
    let global = chain.global_solvers().value_learner.borrow();
    assert_eq!(own.n_transitions(), 2 * 9);
    assert_eq!(global.n_transitions(), 2 * 9);
    // Only the last transition reaches the goal in either pass.
    assert_eq!(own.n_terminal(), 2);
    assert_eq!(global.n_terminal(), 2);
    assert_eq!(option.num_pending_transitions(), 0);
    Ok(())
}

#[test]
fn test_hindsight_relabeling_with_global_value_learner() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().use_global_vf(true))?;
    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, false)?;

    let option = chain.option(root)?;
    assert!(option.value_learner().is_none());
    assert_eq!(
        chain.global_solvers().value_learner.borrow().n_transitions(),
        2 * 9
    );
    Ok(())
}

#[test]
fn test_no_value_learning_without_use_vf() -> Result<()> {
    let env = env(false)?;
    let config = OptionConfig::default().use_vf(false).use_model(true);
    let (mut chain, root) = chain_with_root(config)?;
    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, false)?;

    assert_eq!(
        chain.global_solvers().value_learner.borrow().n_transitions(),
        0
    );
    assert_eq!(chain.option(root)?.num_goal_hits(), 1);
    Ok(())
}

#[test]
#[should_panic]
fn test_model_free_option_needs_value_function() {
    let _ = chain(OptionConfig::default().use_vf(false));
}

#[test]
fn test_death_forces_failure() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, true)?;

    let option = chain.option(root)?;
    let goal = array![GOAL[0], GOAL[1]];
    assert!(option.is_term_true(&env, &goal, None));
    assert!(!option.is_term_true_unless_dead(&env, &goal, true, None));
    assert_eq!(option.num_executions(), 1);
    assert_eq!(option.num_goal_hits(), 0);
    assert_eq!(option.negative_examples().count(), 1);
    assert_eq!(option.positive_examples().count(), 0);
    assert_eq!(option.target_salient_event().map(|e| e.effect_set_len()), Some(1));
    Ok(())
}

#[test]
fn test_success_grows_effect_sets() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    succeed(&mut chain, root, &env, 0.0)?;
    succeed(&mut chain, root, &env, 0.5)?;

    let option = chain.option(root)?;
    assert_eq!(option.effect_set().count(), 2);
    assert_eq!(option.target_salient_event().map(|e| e.effect_set_len()), Some(3));
    assert_eq!(option.recent_success_rate(), 1.0);
    Ok(())
}

#[test]
fn test_robust_sampler_keeps_shifted_points_inside() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    for i in 0..3 {
        succeed(&mut chain, root, &env, 0.2 * i as f32)?;
    }
    let option = chain.option(root)?;
    let clf = option.pessimistic_classifier().expect("pessimistic classifier");

    let mut n_found = 0;
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        if let Some(obs) = option.robust_sample(&env, TOLERANCE, &mut rng) {
            n_found += 1;
            let t = TOLERANCE;
            let probes = array![
                [obs[0], obs[1]],
                [obs[0] + t, obs[1]],
                [obs[0] - t, obs[1]],
                [obs[0], obs[1] + t],
                [obs[0], obs[1] - t]
            ];
            assert!(clf.predict(probes.view()).iter().all(|&p| p));
        }
    }
    assert!(n_found > 0);
    Ok(())
}

#[test]
fn test_robust_sampler_needs_classifier() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    let p = path([0.0, 0.0], GOAL, 10);
    observe_path(&mut chain, root, &p, false)?;

    let option = chain.option(root)?;
    let mut rng = SmallRng::seed_from_u64(0);
    assert!(option.robust_sample(&env, TOLERANCE, &mut rng).is_none());
    assert!(option
        .sample_from_initiation_region_fast_and_epsilon(&env, TOLERANCE, &mut rng)
        .is_none());
    Ok(())
}

#[test]
fn test_sampler_falls_back_to_fast_sampling() -> Result<()> {
    let env = env(false)?;
    let config = OptionChainConfig::default().option(OptionConfig::default().gestation_period(0));
    let mut chain = chain_with_factory(config, Rc::new(RecordingFactory::default()))?;
    let root = chain.add_option("root", None, Some(goal_event()))?;
    succeed(&mut chain, root, &env, 0.0)?;

    let option = chain.option(root)?;
    assert_eq!(option.training_phase(), TrainingPhase::InitiationDone);
    let mut rng = SmallRng::seed_from_u64(0);
    // Only the start is accepted, and none of its shifted copies.
    assert!(option.robust_sample(&env, TOLERANCE, &mut rng).is_none());
    let sample = option
        .sample_from_initiation_region_fast_and_epsilon(&env, TOLERANCE, &mut rng)
        .expect("sample from the fast sampler");
    assert_eq!(sample, array![0.0, 0.0]);
    Ok(())
}

#[test]
fn test_class_weights_balanced_from_ten_negatives() -> Result<()> {
    let env = env(false)?;
    let factory = Rc::new(RecordingFactory::default());
    let config = OptionChainConfig::default().option(OptionConfig::default());
    let mut chain = chain_with_factory(config, factory.clone())?;
    let root = chain.add_option("root", None, Some(goal_event()))?;

    succeed(&mut chain, root, &env, 0.0)?;
    assert!(factory.class_weights.borrow().is_empty());

    for i in 0..9 {
        fail(&mut chain, root, &env, [-8.0, -8.0 + i as f32])?;
    }
    assert_eq!(factory.num_negatives.borrow().last(), Some(&9));
    assert_eq!(
        factory.class_weights.borrow().last(),
        Some(&ClassWeight::Uniform)
    );

    fail(&mut chain, root, &env, [-8.0, 1.0])?;
    assert_eq!(factory.num_negatives.borrow().last(), Some(&10));
    assert_eq!(
        factory.class_weights.borrow().last(),
        Some(&ClassWeight::Balanced)
    );
    assert_eq!(factory.class_weights.borrow().len(), 10);
    Ok(())
}

#[test]
fn test_model_based_option_shares_planner() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().use_model(true))?;
    let option = chain.option(root)?;
    assert_eq!(option.solver_kind(), SolverKind::ModelBased);
    assert_eq!(
        exploration_epsilon(option.solver_kind(), false, option.num_goal_hits()),
        0.1
    );

    let p = path([0.0, 0.0], GOAL, 10);
    execute(&mut chain, root, &env, &p, false)?;
    let planner = chain.global_solvers().planner.clone().expect("global planner");
    assert_eq!(planner.borrow().n_transitions(), 9);
    Ok(())
}

#[test]
fn test_planner_loads_model() -> Result<()> {
    let dir = TempDir::new("planner_model")?;
    let path = dir.path().join("model.yaml");
    File::create(&path)?.write_all(b"gain: 0.25\n")?;

    let config = OptionConfig::default().use_model(true).path_to_model(&path);
    let (chain, _) = chain_with_root(config)?;
    let planner = chain.global_solvers().planner.clone().expect("global planner");
    assert_eq!(planner.borrow().model().gain, 0.25);
    Ok(())
}

#[test]
fn test_model_rollout_feasibility() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default().use_model(true).timeout(1))?;

    assert!(chain.does_model_rollout_reach_goal(root, &env, &array![4.0, 4.0])?);
    assert!(!chain.does_model_rollout_reach_goal(root, &env, &array![0.0, 0.0])?);

    fail(&mut chain, root, &env, [0.0, 0.0])?;
    assert_eq!(chain.should_change_negative_examples(root, &env)?, vec![false]);
    Ok(())
}

#[test]
fn test_feasibility_needs_model_based_option() -> Result<()> {
    let env = env(false)?;
    let (mut chain, root) = chain_with_root(OptionConfig::default())?;
    let err = chain
        .does_model_rollout_reach_goal(root, &env, &array![0.0, 0.0])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HrlError>(),
        Some(HrlError::NotModelBased(_))
    ));
    Ok(())
}
