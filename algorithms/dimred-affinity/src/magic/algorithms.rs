use dimred::{traits::Fit, Float};
use ndarray::{Array1, ArrayBase, Data, Ix2};
use tracing::debug;

use super::MagicValidParams;
use crate::bandwidth::KnnBandwidthEstimator;
use crate::distance::{neighbour_graph_size, pairwise_distances};
use crate::error::{AffinityError, Result};
use crate::kernel::KernelShape;
use crate::normalize::symmetric_row_normalize;
use crate::pairwise::{Pairwise, PairwiseMatrix};
use crate::FittedAffinity;

/// Fitted MAGIC affinity
///
/// The construction follows three steps
///
/// ```text
/// P[i, j] <- exp(-C[i, j] / sigma_i)
/// P[i, j] <- (P[i, j] + P[j, i]) / 2
/// P[i, j] <- P[i, j] / sum_t P[i, t]
/// ```
///
/// The result is a row-stochastic transition matrix of a diffusion process on the samples. Only
/// the intermediate matrix is symmetric, the transition matrix itself is generally not.
#[derive(Debug, Clone)]
pub struct MagicAffinity<F: Float> {
    affinity: Pairwise<F>,
    sigma: Array1<F>,
}

impl<F: Float> MagicAffinity<F> {
    /// Per-sample bandwidth
    pub fn sigma(&self) -> &Array1<F> {
        &self.sigma
    }

    /// Transition matrix, borrowed
    pub fn transition(&self) -> &Pairwise<F> {
        &self.affinity
    }
}

impl<F: Float> FittedAffinity<F> for MagicAffinity<F> {
    fn affinity(&self) -> Pairwise<F> {
        self.affinity.clone()
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, AffinityError> for MagicValidParams {
    type Object = MagicAffinity<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let cost = pairwise_distances(
            records,
            self.metric(),
            self.zero_diag(),
            self.backend(),
            neighbour_graph_size(self.k(), records.nrows()),
        )?;

        let sigma = KnnBandwidthEstimator::new(self.k()).estimate(&cost)?;
        let log_affinity = cost.apply_kernel(&sigma, KernelShape::Magic)?;
        let affinity = symmetric_row_normalize(log_affinity)?;

        debug!(backend = ?affinity.backend(), "fitted MAGIC affinity");

        Ok(MagicAffinity { affinity, sigma })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, Array1, Array2, Axis};

    use super::*;
    use crate::magic::MagicParams;
    use crate::metric::Metric;
    use crate::pairwise::Backend;

    fn records() -> Array2<f64> {
        arr2(&[
            [0.0, 0.0],
            [0.4, 0.2],
            [0.1, 1.1],
            [4.0, 4.0],
            [4.2, 3.1],
            [3.3, 4.5],
            [9.0, 0.0],
        ])
    }

    #[test]
    fn matches_direct_evaluation() {
        let x = records();
        let fitted = MagicParams::new().k(2).fit(&x).unwrap();
        let sigma = fitted.sigma();

        let kernel = Array2::from_shape_fn((7, 7), |(i, j)| {
            if i == j {
                0.0
            } else {
                (-Metric::SqEuclidean.distance(x.row(i), x.row(j)) / sigma[i]).exp()
            }
        });
        let sym = (&kernel + &kernel.t()) / 2.0;
        let expected = &sym / &sym.sum_axis(Axis(1)).insert_axis(Axis(1));

        assert_abs_diff_eq!(fitted.affinity().to_dense(), expected, epsilon = 1e-12);
    }

    #[test]
    fn transition_matrix_is_row_stochastic() {
        for backend in &[Backend::Dense, Backend::Lazy, Backend::Sparse] {
            let fitted = MagicParams::new()
                .k(2)
                .backend(*backend)
                .fit(&records())
                .unwrap();
            let transition = fitted.affinity();

            assert_abs_diff_eq!(
                transition.sum_axis(Axis(1)),
                Array1::ones(7),
                epsilon = 1e-12
            );
            let dense = transition.to_dense();
            assert!(dense.diag().iter().all(|x| *x == 0.0));
            assert!(dense.iter().all(|x| *x >= 0.0));
        }
    }

    #[test]
    fn only_the_intermediate_matrix_is_symmetric() {
        let fitted = MagicParams::new().k(3).fit(&records()).unwrap();
        let dense = fitted.affinity().to_dense();

        let asymmetry = (&dense - &dense.t()).mapv(f64::abs).sum();
        assert!(asymmetry > 1e-3);
    }
}
