use dimred::{Float, ParamGuard};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};
use crate::metric::Metric;
use crate::pairwise::Backend;

/// Negative potential distance hyperparameters
///
/// The affinity diffuses an alpha-decay kernel for `t` steps, takes the logarithm of the
/// diffused transition probabilities and compares samples by the Euclidean distance between
/// their potentials.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct NegPotentialValidParams<F> {
    k: usize,
    alpha: F,
    t: usize,
    eps: F,
    metric: Metric,
    zero_diag: bool,
    backend: Backend,
}

impl<F: Float> NegPotentialValidParams<F> {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn alpha(&self) -> F {
        self.alpha
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn eps(&self) -> F {
        self.eps
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn zero_diag(&self) -> bool {
        self.zero_diag
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

/// Negative potential distance hyperparameters
///
/// See [`NegPotentialValidParams`] for the checked version.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct NegPotentialParams<F>(NegPotentialValidParams<F>);

impl<F: Float> Default for NegPotentialParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> NegPotentialParams<F> {
    /// Creates the set of default parameters
    ///
    /// K = 7, alpha = 10, t = 5, eps = 1e-5, Euclidean cost, masked diagonal and the dense
    /// backend.
    pub fn new() -> Self {
        Self(NegPotentialValidParams {
            k: 7,
            alpha: F::cast(10.0),
            t: 5,
            eps: F::cast(1e-5),
            metric: Metric::Euclidean,
            zero_diag: true,
            backend: Backend::Dense,
        })
    }

    pub fn k(mut self, k: usize) -> Self {
        self.0.k = k;
        self
    }

    /// Set the decay exponent of the kernel
    pub fn alpha(mut self, alpha: F) -> Self {
        self.0.alpha = alpha;
        self
    }

    /// Set the number of diffusion steps
    pub fn t(mut self, t: usize) -> Self {
        self.0.t = t;
        self
    }

    /// Set the offset added to the diffused probabilities before the logarithm
    pub fn eps(mut self, eps: F) -> Self {
        self.0.eps = eps;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.metric = metric;
        self
    }

    pub fn zero_diag(mut self, zero_diag: bool) -> Self {
        self.0.zero_diag = zero_diag;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.0.backend = backend;
        self
    }
}

impl<F: Float> ParamGuard for NegPotentialParams<F> {
    type Checked = NegPotentialValidParams<F>;
    type Error = AffinityError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.backend == Backend::Sparse {
            Err(AffinityError::UnsupportedBackend(
                "potential distances need all diffused transition probabilities, use the dense or lazy backend".into(),
            ))
        } else if self.0.alpha.is_nan() || self.0.alpha <= F::zero() {
            Err(AffinityError::InvalidParameter(format!(
                "alpha must be positive, got {}",
                self.0.alpha
            )))
        } else if self.0.eps.is_nan() || self.0.eps <= F::zero() {
            Err(AffinityError::InvalidParameter(format!(
                "eps must be positive, got {}",
                self.0.eps
            )))
        } else if self.0.t == 0 {
            Err(AffinityError::InvalidParameter(
                "at least one diffusion step needed".into(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
