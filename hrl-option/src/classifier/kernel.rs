//! RBF kernel.
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Kernel coefficient of an RBF kernel.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub enum Gamma {
    /// `1 / n_features`.
    Auto,

    /// A fixed value.
    Value(f32),
}

impl Default for Gamma {
    fn default() -> Self {
        Self::Auto
    }
}

impl Gamma {
    /// Returns the coefficient for data with `n_features` columns.
    pub fn resolve(&self, n_features: usize) -> f32 {
        match self {
            Self::Auto => 1.0 / n_features.max(1) as f32,
            Self::Value(v) => *v,
        }
    }
}

/// `k(a, b) = exp(-gamma * |a - b|^2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RbfKernel {
    gamma: f32,
}

impl RbfKernel {
    /// Constructs the kernel.
    pub fn new(gamma: f32) -> Self {
        Self { gamma }
    }

    /// Evaluates the kernel on a pair of vectors.
    #[inline]
    pub fn eval(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        let d2: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        (-self.gamma * d2).exp()
    }

    /// Gram matrix between the rows of `a` and the rows of `b`.
    pub fn matrix(&self, a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f32> {
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            self.eval(a.row(i), b.row(j))
        })
    }
}
