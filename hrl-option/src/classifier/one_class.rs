//! One-class classifier.
use super::{Gamma, RbfKernel};
use anyhow::Result;
use hrl_core::{Classifier, HrlError};
use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;

/// One-class classifier estimating the support of the training data.
///
/// The score of a point is its mean RBF kernel value against the training
/// rows. The acceptance threshold is chosen so that `floor(nu * n)` of the `n`
/// training rows fall below it. With the same data and kernel, a smaller `nu`
/// gives a threshold no larger than a bigger one, so the accepted regions nest.
#[derive(Clone, Debug)]
pub struct OneClassDensity {
    kernel: RbfKernel,
    support: Array2<f32>,
    threshold: f32,
}

impl OneClassDensity {
    /// Fits the classifier on the rows of `x`.
    pub fn fit(gamma: Gamma, x: ArrayView2<f32>, nu: f32) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(HrlError::ClassifierFit("empty feature matrix".to_string()).into());
        }
        if !(nu > 0.0 && nu <= 1.0) {
            return Err(HrlError::ClassifierFit(format!("nu must be in (0, 1], got {}", nu)).into());
        }

        let kernel = RbfKernel::new(gamma.resolve(x.ncols()));
        let mut clf = Self {
            kernel,
            support: x.to_owned(),
            threshold: 0.0,
        };

        let mut scores: Vec<f32> = x.rows().into_iter().map(|r| clf.score(r)).collect();
        scores.sort_by_key(|&s| OrderedFloat(s));
        let n_outliers = ((nu * x.nrows() as f32).floor() as usize).min(x.nrows() - 1);
        clf.threshold = scores[n_outliers];
        debug!(
            "Fitted one-class classifier on {} rows, nu = {}, threshold = {}",
            x.nrows(),
            nu,
            clf.threshold
        );

        Ok(clf)
    }

    /// Mean kernel value of `x` against the training rows.
    pub fn score(&self, x: ArrayView1<f32>) -> f32 {
        let sum: f32 = self
            .support
            .rows()
            .into_iter()
            .map(|s| self.kernel.eval(s, x))
            .sum();
        sum / self.support.nrows() as f32
    }

    /// Acceptance threshold on [`OneClassDensity::score`].
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Classifier for OneClassDensity {
    fn predict(&self, x: ArrayView2<f32>) -> Vec<bool> {
        x.rows()
            .into_iter()
            .map(|r| self.score(r) >= self.threshold)
            .collect()
    }
}
