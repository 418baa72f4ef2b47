use dimred::{traits::Fit, Float};
use ndarray::{Array1, ArrayBase, Data, Ix2};
use tracing::debug;

use super::SelfTuningValidParams;
use crate::bandwidth::KnnBandwidthEstimator;
use crate::distance::{neighbour_graph_size, pairwise_distances};
use crate::error::{AffinityError, Result};
use crate::kernel::KernelShape;
use crate::normalize::log_normalize;
use crate::pairwise::{LogNormalization, Pairwise, PairwiseMatrix};
use crate::FittedAffinity;

/// Fitted self-tuning affinity
///
/// The affinity between samples `i` and `j` is
///
/// ```text
/// P[i, j] = exp(-C[i, j] / (sigma_i * sigma_j))
/// ```
///
/// with `C` the pairwise cost and `sigma_i` the cost to the K-th nearest neighbour of sample
/// `i`. It is kept in the log domain, where it can be normalized without the exponential
/// underflowing for large costs.
///
/// # Example
///
/// ```
/// use dimred::traits::Fit;
/// use dimred_affinity::{FittedAffinity, SelfTuningParams};
/// use ndarray::array;
///
/// let records = array![[0.0, 0.0], [0.1, 0.0], [1.0, 1.0], [1.1, 1.0], [5.0, 5.0]];
/// let fitted = SelfTuningParams::new().k(2).fit(&records).unwrap();
///
/// // joint normalization, the whole matrix sums to one
/// let total: f64 = fitted.affinity().sum();
/// assert!((total - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct SelfTuningAffinity<F: Float> {
    log_affinity: Pairwise<F>,
    sigma: Array1<F>,
    log_normalization: Option<LogNormalization<F>>,
}

impl<F: Float> SelfTuningAffinity<F> {
    /// Per-sample bandwidth
    pub fn sigma(&self) -> &Array1<F> {
        &self.sigma
    }

    /// Log-partition term subtracted during normalization
    pub fn log_normalization(&self) -> Option<&LogNormalization<F>> {
        self.log_normalization.as_ref()
    }

    /// Affinity in the log domain
    pub fn log_affinity(&self) -> &Pairwise<F> {
        &self.log_affinity
    }
}

impl<F: Float> FittedAffinity<F> for SelfTuningAffinity<F> {
    fn affinity(&self) -> Pairwise<F> {
        self.log_affinity.clone().exp()
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, AffinityError> for SelfTuningValidParams {
    type Object = SelfTuningAffinity<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let cost = pairwise_distances(
            records,
            self.metric(),
            self.zero_diag(),
            self.backend(),
            neighbour_graph_size(self.k(), records.nrows()),
        )?;

        let sigma = KnnBandwidthEstimator::new(self.k()).estimate(&cost)?;
        let log_affinity = cost.apply_kernel(&sigma, KernelShape::SelfTuning)?;
        let (log_affinity, log_normalization) = log_normalize(log_affinity, self.normalization())?;

        debug!(
            backend = ?log_affinity.backend(),
            normalization = ?self.normalization(),
            "fitted self-tuning affinity"
        );

        Ok(SelfTuningAffinity {
            log_affinity,
            sigma,
            log_normalization,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use dimred::ParamGuard;
    use ndarray::{arr2, Array2, Axis};

    use super::*;
    use crate::metric::Metric;
    use crate::pairwise::{Backend, NormAxis};
    use crate::self_tuning::SelfTuningParams;

    fn records() -> Array2<f64> {
        arr2(&[
            [0.0, 0.0],
            [0.5, 0.1],
            [0.2, 0.9],
            [3.0, 3.0],
            [3.5, 2.7],
            [2.9, 3.8],
        ])
    }

    #[test]
    fn matches_direct_evaluation() {
        let x = records();
        let fitted = SelfTuningParams::new()
            .k(2)
            .normalization(None)
            .fit(&x)
            .unwrap();

        let sigma = fitted.sigma();
        let affinity = fitted.affinity().to_dense();
        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j {
                    0.0
                } else {
                    let c = Metric::SqEuclidean.distance(x.row(i), x.row(j));
                    (-c / (sigma[i] * sigma[j])).exp()
                };
                assert_abs_diff_eq!(affinity[(i, j)], expected, epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(affinity, affinity.t(), epsilon = 1e-12);
    }

    #[test]
    fn row_normalization() {
        let fitted = SelfTuningParams::new()
            .k(3)
            .normalization(Some(NormAxis::Single(1)))
            .fit(&records())
            .unwrap();

        assert!(matches!(
            fitted.log_normalization(),
            Some(LogNormalization::Rows(_))
        ));
        assert_abs_diff_eq!(
            fitted.affinity().sum_axis(Axis(1)),
            ndarray::Array1::ones(6),
            epsilon = 1e-12
        );
    }

    #[test]
    fn invalid_configurations() {
        assert!(SelfTuningParams::new()
            .normalization(Some(NormAxis::Single(2)))
            .check()
            .is_err());

        let res = SelfTuningParams::new().k(6).fit(&records());
        assert!(matches!(
            res,
            Err(AffinityError::InvalidK { k: 6, available: 5 })
        ));

        let res = SelfTuningParams::new()
            .k(3)
            .backend(Backend::Sparse)
            .fit(&records().slice(ndarray::s![..3, ..]));
        assert!(res.is_err());
    }
}
