//! Goal sampling, distances and lookahead feasibility.
use super::{ModelBasedOption, Solver};
use crate::util::median;
use anyhow::Result;
use hrl_core::{GoalEnv, HrlError, ModelBasedSolver, ModelFreeSolver, Obs};
use ndarray::{s, Array2, ArrayView1, Axis};
use rand::{seq::SliceRandom, Rng};

/// Number of simulated rollouts of the lookahead feasibility check.
pub const NUM_FEASIBILITY_ROLLOUTS: usize = 14_000;

/// Number of trajectory draws of the fast sampler.
const NUM_FAST_SAMPLING_TRIES: usize = 200;

/// Distance between an observation and the initiation region of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Euclidean distance between positions.
    Euclidean,

    /// Negated value of heading to the region.
    Value,
}

/// One of the initiation classifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    /// The permissive classifier.
    Optimistic,

    /// The conservative classifier.
    Pessimistic,
}

/// The center and its shifts by `±tolerance` on axes 0 and 1.
fn probe_points(center: ArrayView1<f32>, tolerance: f32) -> Array2<f32> {
    Array2::from_shape_fn((5, center.len()), |(i, j)| {
        let shift = match (i, j) {
            (1, 0) | (3, 1) => tolerance,
            (2, 0) | (4, 1) => -tolerance,
            _ => 0.0,
        };
        center[j] + shift
    })
}

impl<E, V, P> ModelBasedOption<E, V, P>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act>,
    P: ModelBasedSolver<E::Obs, E::Act>,
{
    /// First observation of `trajectory` accepted by the given classifier test.
    pub fn first_state_in_classifier(
        &self,
        env: &E,
        trajectory: &[E::Obs],
        kind: ClassifierKind,
    ) -> Option<E::Obs> {
        trajectory
            .iter()
            .find(|obs| match kind {
                ClassifierKind::Optimistic => self.is_init_true(env, obs),
                ClassifierKind::Pessimistic => self.pessimistic_is_init_true(env, obs),
            })
            .cloned()
    }

    /// Samples a positive observation whose features stay inside the
    /// pessimistic classifier when shifted by `±tolerance` on axes 0 and 1.
    ///
    /// Features are assumed to lead with the position axes.
    pub fn robust_sample(
        &self,
        env: &E,
        tolerance: f32,
        rng: &mut impl Rng,
    ) -> Option<E::Obs> {
        let clf = self.pessimistic_classifier.as_ref()?;
        let mut order: Vec<usize> = (0..self.positive_examples.len()).collect();
        order.shuffle(rng);

        order.into_iter().find_map(|ix| {
            self.positive_examples[ix]
                .iter()
                .find(|obs| {
                    let probes = probe_points(env.extract_features(obs).view(), tolerance);
                    clf.predict(probes.view()).iter().all(|&p| p)
                })
                .cloned()
        })
    }

    /// Samples a positive observation passing the pessimistic initiation test.
    pub fn sample_from_initiation_region_fast(
        &self,
        env: &E,
        rng: &mut impl Rng,
    ) -> Option<E::Obs> {
        if self.positive_examples.is_empty() {
            return None;
        }
        (0..NUM_FAST_SAMPLING_TRIES).find_map(|_| {
            let ix = rng.gen_range(0..self.positive_examples.len());
            self.first_state_in_classifier(
                env,
                &self.positive_examples[ix],
                ClassifierKind::Pessimistic,
            )
        })
    }

    /// [`robust_sample`](Self::robust_sample), falling back to
    /// [`sample_from_initiation_region_fast`](Self::sample_from_initiation_region_fast).
    pub fn sample_from_initiation_region_fast_and_epsilon(
        &self,
        env: &E,
        tolerance: f32,
        rng: &mut impl Rng,
    ) -> Option<E::Obs> {
        self.robust_sample(env, tolerance, rng)
            .or_else(|| self.sample_from_initiation_region_fast(env, rng))
    }

    /// Features of the positive observations accepted by the pessimistic classifier.
    pub fn states_inside_pessimistic_region(&self, env: &E) -> Option<Array2<f32>> {
        let clf = self.pessimistic_classifier.as_ref()?;
        let x = self.construct_feature_matrix(env, &self.positive_examples);
        let rows: Vec<usize> = clf
            .predict(x.view())
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect();
        if rows.is_empty() {
            None
        } else {
            Some(x.select(Axis(0), &rows))
        }
    }

    /// Median distance from `obs` to the pessimistic initiation region.
    pub fn distance_to_state(&self, env: &E, obs: &E::Obs, metric: DistanceMetric) -> Option<f32> {
        let targets = self.states_inside_pessimistic_region(env)?;
        let distances = match metric {
            DistanceMetric::Euclidean => {
                let pos = env.position(obs);
                targets
                    .rows()
                    .into_iter()
                    .map(|row| {
                        row.iter()
                            .zip(pos.iter())
                            .map(|(a, b)| (a - b).powi(2))
                            .sum::<f32>()
                            .sqrt()
                    })
                    .collect()
            }
            DistanceMetric::Value => {
                let state = obs.flatten().insert_axis(Axis(0));
                self.value_function(state.view(), targets.view())
                    .iter()
                    .map(|v| v.min(0.0).abs())
                    .collect()
            }
        };
        median(distances)
    }

    /// Checks if the planner reaches `goal` from `obs` in simulation.
    ///
    /// The coordinate-wise maximum of the first two coordinates of the final
    /// simulated states is tested for termination.
    pub fn does_model_rollout_reach_goal(
        &self,
        obs: &E::Obs,
        goal: ArrayView1<f32>,
        parent: Option<&Self>,
    ) -> Result<bool> {
        let planner = match &self.solver {
            Solver::ModelBased(planner) => planner,
            Solver::ModelFree(_) => return Err(HrlError::NotModelBased(self.name.clone()).into()),
        };
        let simulation = planner.borrow_mut().simulate(
            obs,
            goal,
            NUM_FEASIBILITY_ROLLOUTS,
            self.config.timeout,
        );
        let states = simulation.final_states;
        if states.nrows() == 0 {
            return Ok(false);
        }
        let n_cols = states.ncols().min(2);
        let farthest = states
            .slice(s![.., ..n_cols])
            .fold_axis(Axis(0), f32::NEG_INFINITY, |&a, &b| a.max(b));
        Ok(self.is_term_true_at(farthest.view(), parent))
    }
}
