//! Adaptive-bandwidth affinity matrices
//!
//! An affinity matrix weighs every pair of samples by their similarity. The kernels in this
//! crate adapt their bandwidth to the local density of the data: the bandwidth of sample `i`
//! is the cost to its K-th nearest neighbour. Kernels are evaluated in the log domain, large
//! costs therefore never underflow before the final normalization.
//!
//! The following affinities are provided
//!
//! * [`SelfTuningAffinity`]: `exp(-C[i, j] / (sigma_i * sigma_j))`, optionally normalized over
//!   one axis or jointly over the whole matrix
//! * [`MagicAffinity`]: `exp(-C[i, j] / sigma_i)`, symmetrized and turned into a row-stochastic
//!   transition matrix
//! * [`NegPotentialAffinity`]: negated distances between diffusion potentials of an alpha-decay
//!   kernel
//! * [`NegativeCostAffinity`]: the negated cost itself
//!
//! Every affinity can be computed with one of three [`Backend`]s. The dense backend
//! materializes the full matrix, the lazy backend only keeps the records and evaluates entries
//! on demand and the sparse backend restricts the cost to a nearest-neighbour graph.
//!
//! # Example
//!
//! ```
//! use dimred::traits::Fit;
//! use dimred_affinity::{Backend, FittedAffinity, MagicParams, PairwiseMatrix};
//! use ndarray::{array, Axis};
//!
//! let records = array![[0.0f64, 0.0], [0.2, 0.1], [0.1, 0.3], [4.0, 4.0], [4.1, 3.8], [3.9, 4.2]];
//! let fitted = MagicParams::new()
//!     .k(2)
//!     .backend(Backend::Lazy)
//!     .fit(&records)
//!     .unwrap();
//!
//! // every row of the transition matrix sums to one
//! for sum in fitted.affinity().sum_axis(Axis(1)).iter() {
//!     assert!((sum - 1.0).abs() < 1e-10);
//! }
//! ```

mod bandwidth;
mod distance;
mod error;
mod heap_elem;
mod kernel;
mod magic;
mod metric;
mod negative_cost;
mod normalize;
mod output;
mod pairwise;
mod potential;
mod self_tuning;

use dimred::Float;

pub use bandwidth::KnnBandwidthEstimator;
pub use distance::{dense_distances, knn_graph, neighbour_graph_size, pairwise_distances};
pub use error::{AffinityError, Result};
pub use kernel::KernelShape;
pub use magic::{MagicAffinity, MagicParams, MagicValidParams};
pub use metric::Metric;
pub use negative_cost::{NegativeCostAffinity, NegativeCostParams, NegativeCostValidParams};
pub use normalize::{log_normalize, symmetric_row_normalize};
pub use output::{DifferentiableAffinity, GaussianAffinity, StudentAffinity};
pub use pairwise::{
    Backend, LazyMatrix, LogNormalization, NormAxis, Pairwise, PairwiseMatrix, SparseMatrix,
};
pub use potential::{NegPotentialAffinity, NegPotentialParams, NegPotentialValidParams};
pub use self_tuning::{SelfTuningAffinity, SelfTuningParams, SelfTuningValidParams};

/// A fitted affinity model
///
/// Fitted attributes such as bandwidths are kept next to the matrix and can be inspected on the
/// concrete type. Refitting creates a new object.
pub trait FittedAffinity<F: Float> {
    /// Affinity matrix in the linear domain
    fn affinity(&self) -> Pairwise<F>;
}
