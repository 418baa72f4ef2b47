//! Negated pairwise cost
use dimred::{traits::Fit, Float, ParamGuard};
use ndarray::{ArrayBase, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::distance::pairwise_distances;
use crate::error::{AffinityError, Result};
use crate::metric::Metric;
use crate::output::DifferentiableAffinity;
use crate::pairwise::{Backend, Pairwise, PairwiseMatrix};
use crate::FittedAffinity;

/// Negative cost hyperparameters
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegativeCostValidParams {
    metric: Metric,
    zero_diag: bool,
    backend: Backend,
}

impl NegativeCostValidParams {
    pub fn backend(&self) -> Backend {
        self.backend
    }
}

/// Negative cost hyperparameters
///
/// The affinity is `A[i, j] = -C[i, j]`. It has no bandwidth and serves as the output affinity
/// when an embedding should reproduce a matrix of negated distances. The diagonal is zero for
/// every metric, `zero_diag` only decides whether it takes part in a loss.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegativeCostParams(NegativeCostValidParams);

impl Default for NegativeCostParams {
    fn default() -> Self {
        Self::new()
    }
}

impl NegativeCostParams {
    /// Squared Euclidean cost, zero diagonal and the dense backend
    pub fn new() -> Self {
        Self(NegativeCostValidParams {
            metric: Metric::SqEuclidean,
            zero_diag: true,
            backend: Backend::Dense,
        })
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

impl ParamGuard for NegativeCostParams {
    type Checked = NegativeCostValidParams;
    type Error = AffinityError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.backend == Backend::Sparse {
            Err(AffinityError::UnsupportedBackend(
                "a negated cost has no neighbourhood to restrict to".into(),
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

impl DifferentiableAffinity for NegativeCostValidParams {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn zero_diag(&self) -> bool {
        self.zero_diag
    }

    fn value<F: Float>(&self, cost: F) -> F {
        -cost
    }

    fn derivative<F: Float>(&self, _cost: F) -> F {
        -F::one()
    }
}

/// Fitted negative cost affinity
#[derive(Debug, Clone)]
pub struct NegativeCostAffinity<F: Float> {
    affinity: Pairwise<F>,
}

impl<F: Float> FittedAffinity<F> for NegativeCostAffinity<F> {
    fn affinity(&self) -> Pairwise<F> {
        self.affinity.clone()
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, AffinityError> for NegativeCostValidParams {
    type Object = NegativeCostAffinity<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        // self-pairs are not masked, the metric already puts a zero there
        let cost = pairwise_distances(records, self.metric, false, self.backend, 1)?;

        Ok(NegativeCostAffinity {
            affinity: cost.neg(),
        })
    }
}
