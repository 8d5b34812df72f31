//! Two-class support vector classifier.
use super::{Gamma, RbfKernel};
use anyhow::Result;
use hrl_core::{ClassWeight, Classifier, HrlError};
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

const TAU: f64 = 1e-12;

/// Configuration of [`Svc`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SvcConfig {
    /// Regularization parameter.
    pub c: f32,

    /// Kernel coefficient.
    pub gamma: Gamma,

    /// Tolerance of the stopping criterion.
    pub tol: f32,

    /// The maximum number of SMO iterations.
    pub max_iter: usize,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: Gamma::Auto,
            tol: 1e-3,
            max_iter: 100_000,
        }
    }
}

impl SvcConfig {
    /// Sets the regularization parameter.
    pub fn c(mut self, v: f32) -> Self {
        self.c = v;
        self
    }

    /// Sets the kernel coefficient.
    pub fn gamma(mut self, v: Gamma) -> Self {
        self.gamma = v;
        self
    }
}

/// C-support vector classifier with an RBF kernel.
///
/// The dual problem is solved with SMO, choosing the maximal violating pair
/// as the working set, so fitting is deterministic.
#[derive(Clone, Debug)]
pub struct Svc {
    kernel: RbfKernel,
    support_vectors: Array2<f32>,
    /// `alpha_i * y_i` of the support vectors.
    dual_coef: Array1<f32>,
    bias: f32,
}

impl Svc {
    /// Fits the classifier; `y[i]` is the label of row `i` of `x`.
    pub fn fit(
        config: &SvcConfig,
        x: ArrayView2<f32>,
        y: &[bool],
        class_weight: ClassWeight,
    ) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(HrlError::ClassifierFit("empty feature matrix".to_string()).into());
        }
        if y.len() != n {
            return Err(HrlError::ClassifierFit(format!(
                "{} labels for {} rows",
                y.len(),
                n
            ))
            .into());
        }
        let n_pos = y.iter().filter(|&&l| l).count();
        let n_neg = n - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(HrlError::ClassifierFit(
                "two-class fitting needs examples of both classes".to_string(),
            )
            .into());
        }

        let kernel = RbfKernel::new(config.gamma.resolve(x.ncols()));
        let k = kernel.matrix(x, x).mapv(|v| v as f64);
        let ys: Vec<f64> = y.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let (w_pos, w_neg) = match class_weight {
            ClassWeight::Uniform => (1.0, 1.0),
            ClassWeight::Balanced => (
                n as f64 / (2.0 * n_pos as f64),
                n as f64 / (2.0 * n_neg as f64),
            ),
        };
        let c: Vec<f64> = y
            .iter()
            .map(|&l| config.c as f64 * if l { w_pos } else { w_neg })
            .collect();

        let mut alpha = vec![0f64; n];
        let mut grad = vec![-1f64; n];
        let mut n_iter = 0;

        loop {
            let (i, g_max, j, g_min) = select_working_set(&ys, &alpha, &grad, &c);
            let (i, j) = match (i, j) {
                (Some(i), Some(j)) if g_max - g_min > config.tol as f64 => (i, j),
                _ => break,
            };
            if n_iter == config.max_iter {
                warn!("SMO stopped at the maximum number of iterations ({})", n_iter);
                break;
            }
            n_iter += 1;

            let eta = (k[[i, i]] + k[[j, j]] - 2.0 * k[[i, j]]).max(TAU);
            let bound_i = if ys[i] > 0.0 { c[i] - alpha[i] } else { alpha[i] };
            let bound_j = if ys[j] > 0.0 { alpha[j] } else { c[j] - alpha[j] };
            let t = ((g_max - g_min) / eta).min(bound_i).min(bound_j);

            // Variables at their bounds are set exactly to keep the working set selection stable.
            alpha[i] = if t >= bound_i {
                if ys[i] > 0.0 { c[i] } else { 0.0 }
            } else {
                alpha[i] + ys[i] * t
            };
            alpha[j] = if t >= bound_j {
                if ys[j] > 0.0 { 0.0 } else { c[j] }
            } else {
                alpha[j] - ys[j] * t
            };

            for s in 0..n {
                grad[s] += ys[s] * t * (k[[s, i]] - k[[s, j]]);
            }
        }

        let bias = {
            let free = (0..n).filter(|&t| alpha[t] > 0.0 && alpha[t] < c[t]);
            let (sum, n_free) = free.fold((0.0, 0usize), |(s, m), t| (s - ys[t] * grad[t], m + 1));
            if n_free > 0 {
                sum / n_free as f64
            } else {
                let (_, g_max, _, g_min) = select_working_set(&ys, &alpha, &grad, &c);
                match (g_max.is_finite(), g_min.is_finite()) {
                    (true, true) => (g_max + g_min) / 2.0,
                    (true, false) => g_max,
                    (false, true) => g_min,
                    (false, false) => 0.0,
                }
            }
        };

        let sv: Vec<usize> = (0..n).filter(|&t| alpha[t] > 0.0).collect();
        let dual_coef = sv.iter().map(|&t| (alpha[t] * ys[t]) as f32).collect();
        debug!(
            "Fitted SVC on {} rows ({} positive) in {} iterations, {} support vectors",
            n,
            n_pos,
            n_iter,
            sv.len()
        );

        Ok(Self {
            kernel,
            support_vectors: x.select(Axis(0), &sv),
            dual_coef,
            bias: bias as f32,
        })
    }

    /// Signed distance-like score; positive values are classified as positive.
    pub fn decision_function(&self, x: ArrayView1<f32>) -> f32 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.dual_coef.iter())
            .map(|(sv, a)| a * self.kernel.eval(sv, x))
            .sum::<f32>()
            + self.bias
    }
}

/// Returns `(i, max_{I_up} -y G, j, min_{I_low} -y G)`.
fn select_working_set(
    ys: &[f64],
    alpha: &[f64],
    grad: &[f64],
    c: &[f64],
) -> (Option<usize>, f64, Option<usize>, f64) {
    let mut i = None;
    let mut g_max = f64::NEG_INFINITY;
    let mut j = None;
    let mut g_min = f64::INFINITY;

    for t in 0..ys.len() {
        let v = -ys[t] * grad[t];
        let is_up = (ys[t] > 0.0 && alpha[t] < c[t]) || (ys[t] < 0.0 && alpha[t] > 0.0);
        let is_low = (ys[t] < 0.0 && alpha[t] < c[t]) || (ys[t] > 0.0 && alpha[t] > 0.0);
        if is_up && v > g_max {
            g_max = v;
            i = Some(t);
        }
        if is_low && v < g_min {
            g_min = v;
            j = Some(t);
        }
    }

    (i, g_max, j, g_min)
}

impl Classifier for Svc {
    fn predict(&self, x: ArrayView2<f32>) -> Vec<bool> {
        x.rows()
            .into_iter()
            .map(|r| self.decision_function(r) > 0.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn two_clusters(n_neg: usize) -> (Array2<f32>, Vec<bool>) {
        let mut rows = vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let neg = [[5.0, 5.0], [5.0, 6.0], [6.0, 5.0], [6.0, 6.0]];
        for i in 0..n_neg {
            rows.push(neg[i % neg.len()]);
        }
        let x = Array2::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j]);
        let y = (0..rows.len()).map(|i| i < 4).collect();
        (x, y)
    }

    #[test]
    fn test_separates_two_clusters() -> Result<()> {
        let (x, y) = two_clusters(4);
        let svc = Svc::fit(&SvcConfig::default(), x.view(), &y, ClassWeight::Uniform)?;

        assert_eq!(svc.predict(x.view()), y);
        assert!(svc.predict_one(array![0.5, 0.5].view()));
        assert!(!svc.predict_one(array![5.5, 5.5].view()));
        Ok(())
    }

    #[test]
    fn test_fit_is_deterministic() -> Result<()> {
        let (x, y) = two_clusters(12);
        let config = SvcConfig::default();
        let a = Svc::fit(&config, x.view(), &y, ClassWeight::Balanced)?;
        let b = Svc::fit(&config, x.view(), &y, ClassWeight::Balanced)?;

        let grid = Array2::from_shape_fn((64, 2), |(i, j)| {
            if j == 0 {
                (i / 8) as f32
            } else {
                (i % 8) as f32
            }
        });
        assert_eq!(a.predict(grid.view()), b.predict(grid.view()));
        Ok(())
    }

    #[test]
    fn test_needs_both_classes() {
        let x = array![[0.0f32, 0.0], [1.0, 1.0]];
        let res = Svc::fit(
            &SvcConfig::default(),
            x.view(),
            &[true, true],
            ClassWeight::Uniform,
        );
        assert!(res.is_err());
    }
}
