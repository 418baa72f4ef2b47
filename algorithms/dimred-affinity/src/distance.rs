//! Pairwise cost matrices
//!
//! The cost between two samples is their distance under a [`Metric`]. Depending on the backend
//! the cost is materialized, kept as a symbolic expression over the records, or restricted to
//! a nearest-neighbour graph.
use dimred::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};
use tracing::debug;

use crate::error::{AffinityError, Result};
use crate::heap_elem::KSmallest;
use crate::metric::Metric;
use crate::pairwise::{Backend, LazyMatrix, Pairwise, SparseMatrix};

/// Number of neighbours stored by the sparse backend when bandwidths use the `k`-th neighbour
///
/// The graph keeps three times as many neighbours as the bandwidth needs, but never more than
/// the other samples available.
pub fn neighbour_graph_size(k: usize, n_samples: usize) -> usize {
    (3 * k).min(n_samples.saturating_sub(1)).max(1)
}

/// Computes the cost matrix between all pairs of rows of `records`
///
/// # Parameters
///
/// * `records`: the samples, one per row
/// * `metric`: distance between two samples
/// * `zero_diag`: mask self-pairs with an infinite cost
/// * `backend`: storage of the resulting matrix
/// * `n_neighbours`: neighbours kept per sample by the sparse backend, ignored otherwise
///
/// # Errors
///
/// Fails with fewer than two samples or when a record contains non-finite values.
pub fn pairwise_distances<F: Float, D: Data<Elem = F>>(
    records: &ArrayBase<D, Ix2>,
    metric: Metric,
    zero_diag: bool,
    backend: Backend,
    n_neighbours: usize,
) -> Result<Pairwise<F>> {
    let n_samples = records.nrows();
    if n_samples < 2 {
        return Err(AffinityError::NotEnoughSamples);
    }
    if let Some(pos) = records.iter().position(|x| !x.is_finite()) {
        return Err(AffinityError::InvalidParameter(format!(
            "record {} contains a non-finite value",
            pos / records.ncols().max(1)
        )));
    }

    debug!(
        n_samples,
        n_features = records.ncols(),
        ?metric,
        ?backend,
        "computing pairwise distances"
    );

    Ok(match backend {
        Backend::Dense => Pairwise::Dense(dense_distances(records, metric, zero_diag)),
        Backend::Lazy => Pairwise::Lazy(LazyMatrix::from_records(
            records.to_owned(),
            metric,
            zero_diag,
        )),
        Backend::Sparse => Pairwise::Sparse(knn_graph(records, metric, zero_diag, n_neighbours)?),
    })
}

/// Materialized cost matrix, exploiting the symmetry of the metric
pub fn dense_distances<F: Float, D: Data<Elem = F>>(
    records: &ArrayBase<D, Ix2>,
    metric: Metric,
    zero_diag: bool,
) -> Array2<F> {
    let n_samples = records.nrows();
    let mut cost = Array2::zeros((n_samples, n_samples));

    for i in 0..n_samples {
        for j in (i + 1)..n_samples {
            let dist = metric.distance(records.row(i), records.row(j));
            cost[(i, j)] = dist;
            cost[(j, i)] = dist;
        }
    }

    if zero_diag {
        cost.diag_mut().fill(F::infinity());
    }

    cost
}

/// Nearest-neighbour cost graph found by a linear scan
///
/// Every row stores the costs to its `n_neighbours` closest samples, all other entries are
/// implicitly `+inf`. Self-pairs are skipped when `zero_diag` is set and count as a neighbour
/// at distance zero otherwise.
pub fn knn_graph<F: Float, D: Data<Elem = F>>(
    records: &ArrayBase<D, Ix2>,
    metric: Metric,
    zero_diag: bool,
    n_neighbours: usize,
) -> Result<SparseMatrix<F>> {
    let n_samples = records.nrows();
    let available = if zero_diag { n_samples - 1 } else { n_samples };
    if n_neighbours == 0 || n_neighbours > available {
        return Err(AffinityError::InvalidK {
            k: n_neighbours,
            available,
        });
    }

    let rows = records
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, point)| {
            let mut selection = KSmallest::new(n_neighbours);
            for (j, other) in records.rows().into_iter().enumerate() {
                if zero_diag && i == j {
                    continue;
                }
                selection.push(metric.distance(point, other), j);
            }

            selection
                .into_sorted()
                .into_iter()
                .map(|(dist, j)| (j, dist))
                .collect()
        })
        .collect();

    SparseMatrix::from_rows((n_samples, n_samples), rows, F::infinity())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    use super::*;
    use crate::pairwise::PairwiseMatrix;

    fn line() -> Array2<f64> {
        arr2(&[[0.0], [1.0], [3.0], [7.0], [15.0]])
    }

    #[test]
    fn dense_is_symmetric_with_masked_diagonal() {
        let cost = dense_distances(&line(), Metric::Euclidean, true);
        assert_eq!(cost, cost.t());
        assert!(cost.diag().iter().all(|x| *x == f64::INFINITY));
        assert_abs_diff_eq!(cost[(0, 4)], 15.0);

        let cost = dense_distances(&line(), Metric::SqEuclidean, false);
        assert_abs_diff_eq!(cost.diag().sum(), 0.0);
        assert_abs_diff_eq!(cost[(1, 3)], 36.0);
    }

    #[test]
    fn backends_agree_on_nearest_neighbours() {
        let records = line();
        for backend in &[Backend::Dense, Backend::Lazy, Backend::Sparse] {
            let cost = pairwise_distances(&records, Metric::SqEuclidean, true, *backend, 2).unwrap();
            assert_eq!(cost.backend(), *backend);

            let (values, indices) = cost.k_min(2, ndarray::Axis(1)).unwrap();
            assert_eq!(indices.row(2).to_vec(), vec![1, 0]);
            assert_abs_diff_eq!(values.row(4), arr1(&[64.0, 144.0]));
        }
    }

    #[test]
    fn knn_graph_keeps_closest_samples() {
        let graph = knn_graph(&line(), Metric::Euclidean, true, 2).unwrap();
        assert_eq!(graph.nnz(), 10);
        assert!(graph.is_stored(3, 2));
        assert!(graph.is_stored(3, 1));
        assert!(!graph.is_stored(3, 4));
        assert_eq!(graph.get(3, 4), f64::INFINITY);

        let with_self = knn_graph(&line(), Metric::Euclidean, false, 1).unwrap();
        assert!((0..5).all(|i| with_self.is_stored(i, i)));

        assert!(matches!(
            knn_graph(&line(), Metric::Euclidean, true, 5),
            Err(AffinityError::InvalidK { k: 5, available: 4 })
        ));
    }

    #[test]
    fn rejects_degenerate_records() {
        let single = arr2(&[[1.0, 2.0]]);
        assert!(matches!(
            pairwise_distances(&single, Metric::Euclidean, true, Backend::Dense, 1),
            Err(AffinityError::NotEnoughSamples)
        ));

        let nan = arr2(&[[1.0, 2.0], [f64::NAN, 0.0]]);
        assert!(matches!(
            pairwise_distances(&nan, Metric::Euclidean, true, Backend::Lazy, 1),
            Err(AffinityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn graph_size() {
        assert_eq!(neighbour_graph_size(7, 100), 21);
        assert_eq!(neighbour_graph_size(7, 10), 9);
    }
}
