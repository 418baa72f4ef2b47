use approx::assert_abs_diff_eq;
use dimred::traits::{Fit, Transformer};
use dimred::ParamGuard;
use dimred_affinity::{AffinityError, Backend, PairwiseMatrix};
use dimred_datasets::generate;
use dimred_phate::{EmbeddingError, FitState, Init, OptimizerKind, PhateParams};
use ndarray::{arr2, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn two_blobs(blob_size: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let centroids = arr2(&[[0.0, 0.0, 0.0], [10.0, -10.0, 10.0]]);
    generate::labelled_blobs(blob_size, &centroids, &mut rng)
}

fn centroid(embedding: &Array2<f64>, labels: &Array1<usize>, label: usize) -> Array1<f64> {
    let members: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == label)
        .map(|(i, _)| i)
        .collect();

    embedding
        .select(Axis(0), &members)
        .mean_axis(Axis(0))
        .unwrap()
}

#[test]
fn separates_two_clusters() {
    let (records, labels) = two_blobs(25, 42);
    let fitted = PhateParams::new().fit(&records).unwrap();

    assert!(matches!(
        fitted.state(),
        FitState::Converged | FitState::MaxIterReached
    ));
    assert!(fitted.n_iter() <= 1000);
    assert!(fitted.loss().is_finite());

    let embedding = fitted.embedding();
    assert_eq!(embedding.dim(), (50, 2));

    let centroids = [
        centroid(embedding, &labels, 0),
        centroid(embedding, &labels, 1),
    ];
    for (point, label) in embedding.rows().into_iter().zip(labels.iter()) {
        let own = (&point - &centroids[*label]).mapv(|x| x * x).sum();
        let other = (&point - &centroids[1 - label]).mapv(|x| x * x).sum();
        assert!(own < other);
    }
}

#[test]
fn input_affinity_is_kept() {
    let (records, _) = two_blobs(10, 3);
    let fitted = PhateParams::new()
        .n_neighbors(4)
        .max_iter(10)
        .fit(&records)
        .unwrap();

    let affinity = fitted.input_affinity();
    assert_eq!(affinity.shape(), (20, 20));
    assert_eq!(affinity.backend(), Backend::Dense);

    // negated distances between potentials
    let dense = affinity.to_dense();
    assert_abs_diff_eq!(dense.diag().sum(), 0.0);
    assert!(dense.iter().all(|x| *x <= 0.0));
    assert_abs_diff_eq!(dense, dense.t(), epsilon = 1e-12);
}

#[test]
fn refitting_is_reproducible() {
    let (records, _) = two_blobs(15, 7);
    let params = PhateParams::new()
        .n_neighbors(5)
        .init(Init::Random)
        .max_iter(100)
        .check_unwrap();

    let first = params.transform(&records).unwrap();
    let second = params.transform(&records).unwrap();
    assert_eq!(first, second);
}

#[test]
fn lazy_backend_follows_dense() {
    let (records, _) = two_blobs(12, 11);
    let params = PhateParams::new()
        .n_neighbors(5)
        .optimizer(OptimizerKind::sgd())
        .lr(1e-4)
        .max_iter(5);

    let dense = params.clone().fit(&records).unwrap();
    let lazy = params.backend(Backend::Lazy).fit(&records).unwrap();

    assert_eq!(lazy.input_affinity().backend(), Backend::Lazy);
    assert_abs_diff_eq!(
        lazy.input_affinity().to_dense(),
        dense.input_affinity().to_dense(),
        epsilon = 1e-8
    );
    assert_abs_diff_eq!(lazy.embedding(), dense.embedding(), epsilon = 1e-6);
}

#[test]
fn too_many_neighbours() {
    let (records, _) = two_blobs(5, 0);
    let result = PhateParams::new().fit(&records);

    assert!(matches!(
        result,
        Err(EmbeddingError::Affinity(AffinityError::InvalidK { k: 10, .. }))
    ));
}

#[test]
fn sparse_backend_is_rejected() {
    let (records, _) = two_blobs(5, 0);
    let result = PhateParams::new()
        .n_neighbors(3)
        .backend(Backend::Sparse)
        .fit(&records);

    assert!(matches!(
        result,
        Err(EmbeddingError::UnsupportedBackendConfiguration(_))
    ));
}
