use dimred::ParamGuard;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};
use crate::metric::Metric;
use crate::pairwise::Backend;

/// MAGIC affinity hyperparameters
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct MagicValidParams {
    k: usize,
    metric: Metric,
    zero_diag: bool,
    backend: Backend,
}

impl MagicValidParams {
    pub fn k(&self) -> usize {
        self.k
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

/// MAGIC affinity hyperparameters
///
/// The bandwidth of every sample is the cost to its K-th nearest neighbour. Unlike the
/// self-tuning affinity the kernel only uses the bandwidth of the row sample, the asymmetry is
/// removed afterwards by averaging with the transpose.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct MagicParams(MagicValidParams);

impl Default for MagicParams {
    fn default() -> Self {
        Self::new()
    }
}

impl MagicParams {
    /// Creates the set of default parameters
    ///
    /// K = 7, squared Euclidean cost, masked diagonal and the dense backend.
    pub fn new() -> Self {
        Self(MagicValidParams {
            k: 7,
            metric: Metric::SqEuclidean,
            zero_diag: true,
            backend: Backend::Dense,
        })
    }

    pub fn k(mut self, k: usize) -> Self {
        self.0.k = k;
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

impl ParamGuard for MagicParams {
    type Checked = MagicValidParams;
    type Error = AffinityError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
