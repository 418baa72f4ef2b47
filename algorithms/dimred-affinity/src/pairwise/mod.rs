//! Pairwise matrix representations
//!
//! Distance and affinity matrices are handled through the [`PairwiseMatrix`] capability
//! interface. It exposes exactly the reductions and element-wise transformations the affinity
//! models need, so that they stay agnostic of how the matrix is stored:
//!
//! * dense: an `ndarray::Array2`, every entry materialized
//! * lazy: a symbolic expression over the records, entries are evaluated on demand and never
//!   stored, memory stays linear in the number of samples
//! * sparse: a k-nearest-neighbour graph in CSR layout, absent entries take an implicit fill
//!   value (`+inf` for costs, `-inf` for log-affinities, `0` for affinities)
mod dense;
mod lazy;
mod sparse;

pub use lazy::LazyMatrix;
pub use sparse::SparseMatrix;

use dimred::Float;
use ndarray::{Array1, Array2, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::Result;
use crate::kernel::KernelShape;

/// Storage strategy for pairwise matrices
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Materialize every entry
    Dense,
    /// Evaluate entries on the fly from the records
    Lazy,
    /// Keep only a k-nearest-neighbour graph
    Sparse,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Dense
    }
}

/// Axes along which a log-domain reduction is performed
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormAxis {
    /// Reduce along a single axis, `Axis(1)` yields one value per row
    Single(usize),
    /// Reduce along both axes jointly, the whole matrix sums to one afterwards
    Joint,
}

/// Log-partition term subtracted by a log-domain normalization
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum LogNormalization<F> {
    /// One term for the whole matrix
    Joint(F),
    /// One term per row
    Rows(Array1<F>),
    /// One term per column
    Columns(Array1<F>),
}

impl<F: Float> LogNormalization<F> {
    /// The term subtracted from entry `(i, j)`
    pub fn at(&self, i: usize, j: usize) -> F {
        match self {
            Self::Joint(val) => *val,
            Self::Rows(vals) => vals[i],
            Self::Columns(vals) => vals[j],
        }
    }

    pub(crate) fn len_matches(&self, shape: (usize, usize)) -> bool {
        match self {
            Self::Joint(_) => true,
            Self::Rows(vals) => vals.len() == shape.0,
            Self::Columns(vals) => vals.len() == shape.1,
        }
    }
}

/// Streaming, numerically stable log-sum-exp accumulator
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogSumExp<F> {
    max: F,
    sum: F,
}

impl<F: Float> LogSumExp<F> {
    pub(crate) fn new() -> Self {
        Self {
            max: F::neg_infinity(),
            sum: F::zero(),
        }
    }

    pub(crate) fn push(&mut self, value: F) {
        self.push_weighted(value, F::one());
    }

    /// Adds `weight` copies of `exp(value)`
    pub(crate) fn push_weighted(&mut self, value: F, weight: F) {
        if value == F::neg_infinity() {
            return;
        }
        if value == F::infinity() || self.max == F::infinity() {
            self.max = F::infinity();
            return;
        }
        if weight <= F::zero() {
            return;
        }
        if value > self.max {
            self.sum = self.sum * (self.max - value).exp() + weight;
            self.max = value;
        } else {
            self.sum += weight * (value - self.max).exp();
        }
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        if other.max == F::neg_infinity() {
            return;
        }
        self.push_weighted(other.max, other.sum);
    }

    pub(crate) fn value(&self) -> F {
        if self.max == F::neg_infinity() || self.max == F::infinity() {
            self.max
        } else {
            self.max + self.sum.ln()
        }
    }
}

/// Capability interface of a pairwise (cost or affinity) matrix
///
/// Element-wise transformations consume the matrix and return a matrix of the same
/// representation. Shape-dependent transformations fail with
/// [`AffinityError::ShapeMismatch`](crate::AffinityError::ShapeMismatch).
pub trait PairwiseMatrix<F: Float>: Sized {
    /// Number of rows and columns
    fn shape(&self) -> (usize, usize);

    /// Single entry, absent sparse entries return the fill value
    fn get(&self, i: usize, j: usize) -> F;

    /// Row `i` as a dense vector
    fn row(&self, i: usize) -> Array1<F> {
        Array1::from_shape_fn(self.shape().1, |j| self.get(i, j))
    }

    /// The `k` smallest entries of every lane along `axis`
    ///
    /// Lanes are rows for `Axis(1)` and columns for `Axis(0)`. The result has one row per lane,
    /// values sorted in ascending order next to their position inside the lane. Fails with
    /// [`AffinityError::InvalidK`](crate::AffinityError::InvalidK) when `k` is zero or
    /// exceeds the lane length.
    fn k_min(&self, k: usize, axis: Axis) -> Result<(Array2<F>, Array2<usize>)>;

    /// Sums along `axis`, `Axis(1)` yields one sum per row
    fn sum_axis(&self, axis: Axis) -> Array1<F>;

    /// Numerically stable log-sum-exp reduction
    fn logsumexp(&self, axis: NormAxis) -> Result<LogNormalization<F>>;

    /// Matrix transpose
    fn transpose(self) -> Self;

    /// Replace every cost `C[i, j]` by its log-affinity under `shape` with per-sample bandwidth
    /// `sigma`
    fn apply_kernel(self, sigma: &Array1<F>, shape: KernelShape<F>) -> Result<Self>;

    /// Subtract a log-partition term from every entry
    fn sub_log_normalization(self, norm: &LogNormalization<F>) -> Result<Self>;

    /// Element-wise exponential
    fn exp(self) -> Self;

    /// Element-wise negation
    fn neg(self) -> Self;

    /// Average with the transpose, `(P + P^t) / 2`
    fn symmetrize(self) -> Result<Self>;

    /// Divide every lane along `axis` by the matching entry of `denom`, `Axis(1)` divides row
    /// `i` by `denom[i]`
    fn div_axis(self, denom: &Array1<F>, axis: Axis) -> Result<Self>;

    /// Materialize all entries
    fn to_dense(&self) -> Array2<F>;
}

pub(crate) fn check_k(k: usize, available: usize) -> Result<()> {
    if k == 0 || k > available {
        Err(crate::AffinityError::InvalidK { k, available })
    } else {
        Ok(())
    }
}

pub(crate) fn check_axis(axis: Axis) -> Result<()> {
    if axis.index() > 1 {
        Err(crate::AffinityError::InvalidParameter(format!(
            "axis {} out of bounds for a matrix",
            axis.index()
        )))
    } else {
        Ok(())
    }
}

/// A pairwise matrix in one of the supported representations
#[derive(Debug, Clone)]
pub enum Pairwise<F: Float> {
    Dense(Array2<F>),
    Lazy(LazyMatrix<F>),
    Sparse(SparseMatrix<F>),
}

impl<F: Float> Pairwise<F> {
    /// The backend this matrix is stored with
    pub fn backend(&self) -> Backend {
        match self {
            Self::Dense(_) => Backend::Dense,
            Self::Lazy(_) => Backend::Lazy,
            Self::Sparse(_) => Backend::Sparse,
        }
    }

    /// Borrow the dense representation, if any
    pub fn as_dense(&self) -> Option<&Array2<F>> {
        match self {
            Self::Dense(inn) => Some(inn),
            _ => None,
        }
    }

    /// Total of all entries
    pub fn sum(&self) -> F {
        self.sum_axis(Axis(1)).sum()
    }
}

impl<F: Float> PairwiseMatrix<F> for Pairwise<F> {
    fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(inn) => inn.dim(),
            Self::Lazy(inn) => inn.shape(),
            Self::Sparse(inn) => inn.shape(),
        }
    }

    fn get(&self, i: usize, j: usize) -> F {
        match self {
            Self::Dense(inn) => PairwiseMatrix::get(inn, i, j),
            Self::Lazy(inn) => inn.get(i, j),
            Self::Sparse(inn) => inn.get(i, j),
        }
    }

    fn row(&self, i: usize) -> Array1<F> {
        match self {
            Self::Dense(inn) => PairwiseMatrix::row(inn, i),
            Self::Lazy(inn) => inn.row(i),
            Self::Sparse(inn) => inn.row(i),
        }
    }

    fn k_min(&self, k: usize, axis: Axis) -> Result<(Array2<F>, Array2<usize>)> {
        match self {
            Self::Dense(inn) => inn.k_min(k, axis),
            Self::Lazy(inn) => inn.k_min(k, axis),
            Self::Sparse(inn) => inn.k_min(k, axis),
        }
    }

    fn sum_axis(&self, axis: Axis) -> Array1<F> {
        match self {
            Self::Dense(inn) => PairwiseMatrix::sum_axis(inn, axis),
            Self::Lazy(inn) => inn.sum_axis(axis),
            Self::Sparse(inn) => inn.sum_axis(axis),
        }
    }

    fn logsumexp(&self, axis: NormAxis) -> Result<LogNormalization<F>> {
        match self {
            Self::Dense(inn) => inn.logsumexp(axis),
            Self::Lazy(inn) => inn.logsumexp(axis),
            Self::Sparse(inn) => inn.logsumexp(axis),
        }
    }

    fn transpose(self) -> Self {
        match self {
            Self::Dense(inn) => Self::Dense(PairwiseMatrix::transpose(inn)),
            Self::Lazy(inn) => Self::Lazy(inn.transpose()),
            Self::Sparse(inn) => Self::Sparse(inn.transpose()),
        }
    }

    fn apply_kernel(self, sigma: &Array1<F>, shape: KernelShape<F>) -> Result<Self> {
        Ok(match self {
            Self::Dense(inn) => Self::Dense(inn.apply_kernel(sigma, shape)?),
            Self::Lazy(inn) => Self::Lazy(inn.apply_kernel(sigma, shape)?),
            Self::Sparse(inn) => Self::Sparse(inn.apply_kernel(sigma, shape)?),
        })
    }

    fn sub_log_normalization(self, norm: &LogNormalization<F>) -> Result<Self> {
        Ok(match self {
            Self::Dense(inn) => Self::Dense(inn.sub_log_normalization(norm)?),
            Self::Lazy(inn) => Self::Lazy(inn.sub_log_normalization(norm)?),
            Self::Sparse(inn) => Self::Sparse(inn.sub_log_normalization(norm)?),
        })
    }

    fn exp(self) -> Self {
        match self {
            Self::Dense(inn) => Self::Dense(PairwiseMatrix::exp(inn)),
            Self::Lazy(inn) => Self::Lazy(inn.exp()),
            Self::Sparse(inn) => Self::Sparse(inn.exp()),
        }
    }

    fn neg(self) -> Self {
        match self {
            Self::Dense(inn) => Self::Dense(PairwiseMatrix::neg(inn)),
            Self::Lazy(inn) => Self::Lazy(inn.neg()),
            Self::Sparse(inn) => Self::Sparse(inn.neg()),
        }
    }

    fn symmetrize(self) -> Result<Self> {
        Ok(match self {
            Self::Dense(inn) => Self::Dense(inn.symmetrize()?),
            Self::Lazy(inn) => Self::Lazy(inn.symmetrize()?),
            Self::Sparse(inn) => Self::Sparse(inn.symmetrize()?),
        })
    }

    fn div_axis(self, denom: &Array1<F>, axis: Axis) -> Result<Self> {
        Ok(match self {
            Self::Dense(inn) => Self::Dense(inn.div_axis(denom, axis)?),
            Self::Lazy(inn) => Self::Lazy(inn.div_axis(denom, axis)?),
            Self::Sparse(inn) => Self::Sparse(inn.div_axis(denom, axis)?),
        })
    }

    fn to_dense(&self) -> Array2<F> {
        match self {
            Self::Dense(inn) => inn.clone(),
            Self::Lazy(inn) => inn.to_dense(),
            Self::Sparse(inn) => inn.to_dense(),
        }
    }
}
