//! Adaptive bandwidth from the distance to the K-th nearest neighbour
use dimred::Float;
use ndarray::{Array1, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AffinityError, Result};
use crate::pairwise::PairwiseMatrix;

/// Estimates a per-sample bandwidth `sigma_i`, the K-th smallest entry of row `i` of a cost
/// matrix
///
/// `K` is one-indexed, `K = 1` selects the smallest entry. Whether the sample itself takes part
/// depends on the cost matrix: a masked diagonal (`+inf`) excludes it, a zero diagonal makes
/// it the first neighbour.
///
/// ```
/// use dimred_affinity::KnnBandwidthEstimator;
/// use ndarray::{arr1, arr2};
///
/// let cost = arr2(&[[f64::INFINITY, 1.0, 4.0], [1.0, f64::INFINITY, 2.0], [4.0, 2.0, f64::INFINITY]]);
/// let sigma = KnnBandwidthEstimator::new(2).estimate(&cost).unwrap();
///
/// assert_eq!(sigma, arr1(&[4.0, 2.0, 4.0]));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnBandwidthEstimator {
    k: usize,
}

impl KnnBandwidthEstimator {
    pub fn new(k: usize) -> Self {
        KnnBandwidthEstimator { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Bandwidth of every row of `cost`
    ///
    /// # Errors
    ///
    /// * [`AffinityError::InvalidK`] if `K` is zero, exceeds the number of columns or a row has
    ///   fewer than `K` finite entries
    /// * [`AffinityError::DegenerateBandwidth`] if the K-th smallest entry is zero, for example
    ///   for duplicated samples
    pub fn estimate<F: Float, M: PairwiseMatrix<F>>(&self, cost: &M) -> Result<Array1<F>> {
        let (values, _) = cost.k_min(self.k, Axis(1))?;
        let sigma = values.column(self.k - 1).to_owned();

        for (index, (s, row)) in sigma.iter().zip(values.rows()).enumerate() {
            if !s.is_finite() {
                return Err(AffinityError::InvalidK {
                    k: self.k,
                    available: row.iter().filter(|x| x.is_finite()).count(),
                });
            }
            if *s <= F::zero() {
                return Err(AffinityError::DegenerateBandwidth { index });
            }
        }

        debug!(
            k = self.k,
            min = %sigma.fold(F::infinity(), |acc, x| acc.min(*x)),
            max = %sigma.fold(F::neg_infinity(), |acc, x| acc.max(*x)),
            "estimated bandwidths"
        );

        Ok(sigma)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, Array2};

    use super::*;
    use crate::pairwise::SparseMatrix;

    #[test]
    fn kth_smallest_of_every_row() {
        // rows are shuffled permutations of 1..=5
        let cost = arr2(&[
            [3.0, 1.0, 5.0, 2.0, 4.0],
            [5.0, 4.0, 3.0, 2.0, 1.0],
            [2.0, 5.0, 1.0, 4.0, 3.0],
        ]);

        for k in 1..=5 {
            let sigma = KnnBandwidthEstimator::new(k).estimate(&cost).unwrap();
            assert_abs_diff_eq!(sigma, Array1::from_elem(3, k as f64));
        }
    }

    #[test]
    fn too_few_finite_entries() {
        let cost = arr2(&[
            [f64::INFINITY, 1.0, 2.0],
            [1.0, f64::INFINITY, f64::INFINITY],
            [2.0, 3.0, f64::INFINITY],
        ]);

        assert!(matches!(
            KnnBandwidthEstimator::new(2).estimate(&cost),
            Err(AffinityError::InvalidK { k: 2, available: 1 })
        ));
        assert!(matches!(
            KnnBandwidthEstimator::new(4).estimate(&cost),
            Err(AffinityError::InvalidK { k: 4, available: 3 })
        ));
        assert!(matches!(
            KnnBandwidthEstimator::new(0).estimate(&cost),
            Err(AffinityError::InvalidK { k: 0, .. })
        ));
    }

    #[test]
    fn duplicated_samples_are_degenerate() {
        let cost = arr2(&[
            [f64::INFINITY, 0.0, 2.0],
            [0.0, f64::INFINITY, 2.0],
            [2.0, 2.0, f64::INFINITY],
        ]);

        assert!(matches!(
            KnnBandwidthEstimator::new(1).estimate(&cost),
            Err(AffinityError::DegenerateBandwidth { index: 0 })
        ));
        assert!(KnnBandwidthEstimator::new(2).estimate(&cost).is_ok());
    }

    #[test]
    fn sparse_cost_graph() {
        let graph = SparseMatrix::from_rows(
            (3, 3),
            vec![vec![(1, 1.0), (2, 2.0)], vec![(0, 1.0)], vec![(0, 2.0), (1, 3.0)]],
            f64::INFINITY,
        )
        .unwrap();

        let sigma = KnnBandwidthEstimator::new(1).estimate(&graph).unwrap();
        assert_abs_diff_eq!(sigma, ndarray::arr1(&[1.0, 1.0, 2.0]));
        assert!(KnnBandwidthEstimator::new(2).estimate(&graph).is_err());

        let dense: Array2<f64> = graph.to_dense();
        assert_eq!(
            KnnBandwidthEstimator::new(1).estimate(&dense).unwrap(),
            sigma
        );
    }
}
