//! Discriminators over feature vectors.
use anyhow::Result;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A fitted binary or one-class discriminator.
pub trait Classifier {
    /// Predicts acceptance of every row of `x`.
    fn predict(&self, x: ArrayView2<f32>) -> Vec<bool>;

    /// Predicts acceptance of a single feature vector.
    fn predict_one(&self, x: ArrayView1<f32>) -> bool {
        self.predict(x.insert_axis(Axis(0)))
            .first()
            .copied()
            .unwrap_or(false)
    }
}

/// Weighting of classes in two-class fitting.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ClassWeight {
    /// Every example has the same weight.
    Uniform,

    /// Classes are weighted inversely proportional to their frequencies.
    Balanced,
}

/// Fits classifiers.
pub trait ClassifierFactory {
    /// Fits a two-class classifier; `y[i]` is the label of row `i` of `x`.
    fn fit_two_class(
        &self,
        x: ArrayView2<f32>,
        y: &[bool],
        class_weight: ClassWeight,
    ) -> Result<Box<dyn Classifier>>;

    /// Fits a one-class classifier treating a `nu` fraction of `x` as outliers.
    fn fit_one_class(&self, x: ArrayView2<f32>, nu: f32) -> Result<Box<dyn Classifier>>;
}
