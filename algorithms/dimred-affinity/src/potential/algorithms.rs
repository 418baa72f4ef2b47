use dimred::{traits::Fit, Float};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use tracing::debug;

use super::NegPotentialValidParams;
use crate::bandwidth::KnnBandwidthEstimator;
use crate::distance::{dense_distances, pairwise_distances};
use crate::error::{AffinityError, Result};
use crate::kernel::KernelShape;
use crate::metric::Metric;
use crate::normalize::{log_normalize, symmetric_row_normalize};
use crate::pairwise::{Backend, LazyMatrix, NormAxis, Pairwise, PairwiseMatrix};
use crate::FittedAffinity;

/// Fitted negative potential distance
///
/// Starting from the alpha-decay kernel
///
/// ```text
/// log P[i, j] = -(C[i, j] / sigma_i)^alpha
/// ```
///
/// the rows are normalized, the kernel is symmetrized and turned into a transition matrix,
/// which is then diffused for `t` steps. The potential of a sample is `-log(P^t[i, :] + eps)`
/// and the affinity is the negated Euclidean distance between potentials:
///
/// ```text
/// A[i, j] = -|| pot_i - pot_j ||
/// ```
///
/// The diffusion is carried out on the materialized transition matrix. With the lazy backend
/// only the final affinity is evaluated on demand from the potentials.
#[derive(Debug, Clone)]
pub struct NegPotentialAffinity<F: Float> {
    affinity: Pairwise<F>,
    sigma: Array1<F>,
    potential: Array2<F>,
}

impl<F: Float> NegPotentialAffinity<F> {
    /// Per-sample bandwidth
    pub fn sigma(&self) -> &Array1<F> {
        &self.sigma
    }

    /// Potential of every sample, one row per sample
    pub fn potential(&self) -> &Array2<F> {
        &self.potential
    }
}

impl<F: Float> FittedAffinity<F> for NegPotentialAffinity<F> {
    fn affinity(&self) -> Pairwise<F> {
        self.affinity.clone()
    }
}

/// Raises a square matrix to the power `power` by repeated squaring
fn matrix_power<F: Float>(matrix: &Array2<F>, power: usize) -> Array2<F> {
    if power == 0 {
        return Array2::eye(matrix.nrows());
    }

    let mut result = matrix.clone();
    let mut current = matrix.clone();
    let mut p = power - 1;

    while p > 0 {
        if p % 2 == 1 {
            result = result.dot(&current);
        }
        p /= 2;
        if p > 0 {
            current = current.dot(&current);
        }
    }

    result
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, AffinityError>
    for NegPotentialValidParams<F>
{
    type Object = NegPotentialAffinity<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let cost = pairwise_distances(
            records,
            self.metric(),
            self.zero_diag(),
            self.backend(),
            self.k(),
        )?;

        let sigma = KnnBandwidthEstimator::new(self.k()).estimate(&cost)?;
        let log_affinity = cost.apply_kernel(&sigma, KernelShape::AlphaDecay(self.alpha()))?;
        let (log_affinity, _) = log_normalize(log_affinity, Some(NormAxis::Single(1)))?;
        let transition = symmetric_row_normalize(log_affinity)?.to_dense();

        let diffused = matrix_power(&transition, self.t());
        let eps = self.eps();
        let potential = diffused.mapv(|p| -(p + eps).ln());

        // the sparse backend is rejected when checking the parameters
        let affinity = match self.backend() {
            Backend::Lazy => {
                Pairwise::Lazy(LazyMatrix::from_records(potential.clone(), Metric::Euclidean, false))
            }
            _ => Pairwise::Dense(dense_distances(&potential, Metric::Euclidean, false)),
        }
        .neg();

        debug!(t = self.t(), backend = ?affinity.backend(), "fitted potential distances");

        Ok(NegPotentialAffinity {
            affinity,
            sigma,
            potential,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use dimred::ParamGuard;
    use ndarray::{arr2, Array2, Axis};

    use super::*;
    use crate::potential::NegPotentialParams;

    fn records() -> Array2<f64> {
        arr2(&[
            [0.0, 0.0],
            [0.3, 0.1],
            [0.1, 0.4],
            [0.5, 0.5],
            [5.0, 5.0],
            [5.2, 4.9],
            [4.8, 5.3],
            [5.4, 5.4],
        ])
    }

    #[test]
    fn repeated_squaring() {
        let m = arr2(&[[0.5, 0.5], [0.2, 0.8]]);
        let mut naive = Array2::eye(2);
        for t in 0..7 {
            assert_abs_diff_eq!(matrix_power(&m, t), naive, epsilon = 1e-12);
            naive = naive.dot(&m);
        }
    }

    #[test]
    fn potential_distances() {
        let fitted = NegPotentialParams::new().k(2).fit(&records()).unwrap();
        let affinity = fitted.affinity().to_dense();

        assert_eq!(fitted.potential().dim(), (8, 8));
        assert!(fitted.potential().iter().all(|x| x.is_finite()));
        assert_abs_diff_eq!(affinity.diag().sum(), 0.0);
        assert_abs_diff_eq!(affinity, affinity.t(), epsilon = 1e-12);
        assert!(affinity.iter().all(|x| *x <= 0.0));

        // samples of the same cluster have closer potentials
        assert!(affinity[(0, 1)] > affinity[(0, 5)]);
        assert!(affinity[(4, 6)] > affinity[(3, 7)]);
    }

    #[test]
    fn lazy_backend_matches_dense() {
        let dense = NegPotentialParams::new().k(2).fit(&records()).unwrap();
        let lazy = NegPotentialParams::new()
            .k(2)
            .backend(Backend::Lazy)
            .fit(&records())
            .unwrap();

        assert_eq!(lazy.affinity().backend(), Backend::Lazy);
        assert_abs_diff_eq!(
            lazy.affinity().to_dense(),
            dense.affinity().to_dense(),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            lazy.affinity().sum_axis(Axis(1)),
            dense.affinity().sum_axis(Axis(1)),
            epsilon = 1e-8
        );
    }

    #[test]
    fn sparse_backend_is_rejected_before_fitting() {
        let params = NegPotentialParams::<f64>::new().backend(Backend::Sparse);
        assert!(matches!(
            params.check_ref(),
            Err(AffinityError::UnsupportedBackend(_))
        ));
        assert!(NegPotentialParams::<f64>::new().eps(0.0).check().is_err());
        assert!(NegPotentialParams::<f64>::new().t(0).check().is_err());
    }
}
