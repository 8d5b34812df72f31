//! Kernel classifiers for initiation sets.
//!
//! * [`Svc`] - two-class support vector classifier with an RBF kernel,
//! * [`OneClassDensity`] - one-class support estimate with an RBF kernel,
//! * [`KernelClassifierFactory`] - fits both behind [`ClassifierFactory`].
mod kernel;
mod one_class;
mod svc;
use anyhow::Result;
use hrl_core::{ClassWeight, Classifier, ClassifierFactory};
pub use kernel::{Gamma, RbfKernel};
use ndarray::ArrayView2;
pub use one_class::OneClassDensity;
use serde::{Deserialize, Serialize};
pub use svc::{Svc, SvcConfig};

/// Fits [`Svc`] and [`OneClassDensity`] classifiers.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct KernelClassifierFactory {
    /// Configuration of two-class classifiers.
    pub svc: SvcConfig,

    /// Kernel coefficient of one-class classifiers.
    pub one_class_gamma: Gamma,
}

impl KernelClassifierFactory {
    /// Sets the configuration of two-class classifiers.
    pub fn svc(mut self, v: SvcConfig) -> Self {
        self.svc = v;
        self
    }

    /// Sets the kernel coefficient of one-class classifiers.
    pub fn one_class_gamma(mut self, v: Gamma) -> Self {
        self.one_class_gamma = v;
        self
    }
}

impl ClassifierFactory for KernelClassifierFactory {
    fn fit_two_class(
        &self,
        x: ArrayView2<f32>,
        y: &[bool],
        class_weight: ClassWeight,
    ) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(Svc::fit(&self.svc, x, y, class_weight)?))
    }

    fn fit_one_class(&self, x: ArrayView2<f32>, nu: f32) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(OneClassDensity::fit(
            self.one_class_gamma,
            x,
            nu,
        )?))
    }
}
