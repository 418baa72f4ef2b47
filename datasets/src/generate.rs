//! Utility functions for randomly generating datasets

use ndarray::{s, Array, Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, StandardNormal},
    RandomExt,
};

/// Special case of `blobs_with_distribution` with a standard normal distribution.
pub fn blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    blobs_with_distribution(blob_size, blob_centroids, StandardNormal, rng)
}

/// Given an input matrix `blob_centroids`, with shape `(n_blobs, n_features)`,
/// generate `blob_size` data points (a "blob") around each of the blob centroids.
///
/// More specifically, each blob is formed by `blob_size` points sampled from a distribution
/// centered in the blob centroid. Points of blob `b` occupy rows
/// `b * blob_size..(b + 1) * blob_size`.
pub fn blobs_with_distribution(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    distribution: impl Distribution<f64> + Clone,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let (n_centroids, n_features) = blob_centroids.dim();
    let mut blobs: Array2<f64> = Array2::zeros((n_centroids * blob_size, n_features));

    for (blob_index, blob_centroid) in blob_centroids.rows().into_iter().enumerate() {
        let blob = make_blob(blob_size, &blob_centroid, distribution.clone(), rng);

        let indexes = s![blob_index * blob_size..(blob_index + 1) * blob_size, ..];
        blobs.slice_mut(indexes).assign(&blob);
    }
    blobs
}

/// Gaussian blobs together with the index of the blob every point was drawn from
///
/// Useful to check that an embedding keeps points of the same cluster together.
pub fn labelled_blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> (Array2<f64>, Array1<usize>) {
    let records = blobs(blob_size, blob_centroids, rng);
    let labels = Array1::from_shape_fn(records.nrows(), |i| i / blob_size.max(1));

    (records, labels)
}

/// Generate `blob_size` data points (a "blob") around `blob_centroid` using the given distribution.
fn make_blob(
    blob_size: usize,
    blob_centroid: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let shape = (blob_size, blob_centroid.len());
    let origin_blob: Array2<f64> = Array::random_using(shape, distribution, rng);
    origin_blob + blob_centroid
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, Axis};
    use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256Plus};

    use super::*;

    #[test]
    fn blobs_are_centred_around_their_centroid() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let centroids = arr2(&[[0.0, 0.0], [50.0, -50.0]]);
        let (records, labels) = labelled_blobs(400, &centroids, &mut rng);

        assert_eq!(records.dim(), (800, 2));
        assert_eq!(labels[399], 0);
        assert_eq!(labels[400], 1);

        let first = records.slice(s![..400, ..]).mean_axis(Axis(0)).unwrap();
        let second = records.slice(s![400.., ..]).mean_axis(Axis(0)).unwrap();
        assert_abs_diff_eq!(first, centroids.row(0), epsilon = 0.2);
        assert_abs_diff_eq!(second, centroids.row(1), epsilon = 0.2);
    }

    #[test]
    fn same_seed_same_blobs() {
        let centroids = arr2(&[[1.0, 2.0, 3.0]]);
        let a = blobs(10, &centroids, &mut Xoshiro256Plus::seed_from_u64(7));
        let b = blobs(10, &centroids, &mut Xoshiro256Plus::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
