use dimred::ParamGuard;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};
use crate::metric::Metric;
use crate::pairwise::{Backend, NormAxis};

/// Self-tuning affinity hyperparameters
///
/// The affinity has a bandwidth per sample, the distance to its K-th nearest neighbour. Locally
/// dense regions therefore get a sharper kernel than sparse regions. By default the
/// log-affinity is normalized jointly over both axes, so the whole matrix sums to one.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTuningValidParams {
    k: usize,
    normalization: Option<NormAxis>,
    metric: Metric,
    zero_diag: bool,
    backend: Backend,
}

impl SelfTuningValidParams {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn normalization(&self) -> Option<NormAxis> {
        self.normalization
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

/// Self-tuning affinity hyperparameters
///
/// See [`SelfTuningValidParams`] for the checked version.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTuningParams(SelfTuningValidParams);

impl Default for SelfTuningParams {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfTuningParams {
    /// Creates the set of default parameters
    ///
    /// K = 7, joint normalization, squared Euclidean cost, masked diagonal and the dense
    /// backend.
    pub fn new() -> Self {
        Self(SelfTuningValidParams {
            k: 7,
            normalization: Some(NormAxis::Joint),
            metric: Metric::SqEuclidean,
            zero_diag: true,
            backend: Backend::Dense,
        })
    }

    /// Set the neighbour whose distance defines the bandwidth
    pub fn k(mut self, k: usize) -> Self {
        self.0.k = k;
        self
    }

    /// Set the normalization, `None` keeps the raw log-affinity
    pub fn normalization(mut self, normalization: Option<NormAxis>) -> Self {
        self.0.normalization = normalization;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.metric = metric;
        self
    }

    /// Exclude self-affinities
    pub fn zero_diag(mut self, zero_diag: bool) -> Self {
        self.0.zero_diag = zero_diag;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.0.backend = backend;
        self
    }
}

impl ParamGuard for SelfTuningParams {
    type Checked = SelfTuningValidParams;
    type Error = AffinityError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        match self.0.normalization {
            Some(NormAxis::Single(ax)) if ax > 1 => Err(AffinityError::InvalidParameter(format!(
                "normalization axis {} out of bounds",
                ax
            ))),
            _ => Ok(&self.0),
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
