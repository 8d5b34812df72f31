//! Fitting of the initiation classifiers.
use super::ModelBasedOption;
use crate::util::{push_bounded, stack_rows};
use anyhow::Result;
use hrl_core::{ClassWeight, GoalEnv, ModelBasedSolver, ModelFreeSolver};
use itertools::repeat_n;
use log::debug;
use ndarray::{concatenate, Array2, Axis};
use std::collections::VecDeque;

/// Number of negative rows from which classes are balanced.
const MIN_NEGATIVES_FOR_BALANCING: usize = 10;

impl<E, V, P> ModelBasedOption<E, V, P>
where
    E: GoalEnv,
    V: ModelFreeSolver<E::Act>,
    P: ModelBasedSolver<E::Obs, E::Act>,
{
    /// Turns the current execution into a training example.
    ///
    /// A success gives the start followed by the last `buffer_length` visited
    /// observations as a positive example; a failure gives the start alone as
    /// a negative one.
    pub(super) fn derive_positive_and_negative_examples(&mut self, success: bool) {
        let start = match self.visited_states.first() {
            Some(start) => start.clone(),
            None => return,
        };
        let capacity = self.config.buffer_length;

        if success {
            let skip = self.visited_states.len().saturating_sub(capacity);
            let example = std::iter::once(start)
                .chain(self.visited_states[skip..].iter().cloned())
                .collect();
            push_bounded(&mut self.positive_examples, example, capacity);
        } else {
            push_bounded(&mut self.negative_examples, vec![start], capacity);
        }
    }

    /// Stacks the features of every observation of the examples.
    pub(super) fn construct_feature_matrix(
        &self,
        env: &E,
        examples: &VecDeque<Vec<E::Obs>>,
    ) -> Array2<f32> {
        let rows: Vec<_> = examples
            .iter()
            .flatten()
            .map(|obs| env.extract_features(obs))
            .collect();
        stack_rows(&rows)
    }

    /// Refits the classifiers from the example buffers.
    pub(super) fn fit_initiation_classifier(&mut self, env: &E) -> Result<()> {
        match (
            self.positive_examples.is_empty(),
            self.negative_examples.is_empty(),
        ) {
            (false, false) => self.train_two_class_classifier(env),
            (false, true) => self.train_one_class_classifier(env),
            (true, _) => Ok(()),
        }
    }

    fn train_two_class_classifier(&mut self, env: &E) -> Result<()> {
        let positive = self.construct_feature_matrix(env, &self.positive_examples);
        let negative = self.construct_feature_matrix(env, &self.negative_examples);
        let x = concatenate(Axis(0), &[positive.view(), negative.view()])?;
        let y: Vec<bool> = repeat_n(true, positive.nrows())
            .chain(repeat_n(false, negative.nrows()))
            .collect();
        let class_weight = if negative.nrows() >= MIN_NEGATIVES_FOR_BALANCING {
            ClassWeight::Balanced
        } else {
            ClassWeight::Uniform
        };

        let optimistic = self
            .classifier_factory
            .fit_two_class(x.view(), &y, class_weight)?;
        let accepted: Vec<usize> = optimistic
            .predict(x.view())
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect();
        debug!(
            "{}: two-class fit on {} rows, {} accepted",
            self.name,
            x.nrows(),
            accepted.len()
        );
        self.optimistic_classifier = Some(optimistic);

        if !accepted.is_empty() {
            let inliers = x.select(Axis(0), &accepted);
            self.pessimistic_classifier = Some(
                self.classifier_factory
                    .fit_one_class(inliers.view(), self.config.nu)?,
            );
        }
        Ok(())
    }

    fn train_one_class_classifier(&mut self, env: &E) -> Result<()> {
        let x = self.construct_feature_matrix(env, &self.positive_examples);
        let nu = self.config.nu;
        self.pessimistic_classifier = Some(self.classifier_factory.fit_one_class(x.view(), nu)?);
        self.optimistic_classifier = Some(
            self.classifier_factory
                .fit_one_class(x.view(), nu / 10.0)?,
        );
        debug!("{}: one-class fit on {} rows", self.name, x.nrows());
        Ok(())
    }
}
