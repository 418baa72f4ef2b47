//! Affinities with a closed-form derivative with respect to the cost
//!
//! An embedding is fitted by comparing an input affinity to the affinity of the embedding. The
//! latter is recomputed after every step, so it uses a cheap kernel of the pairwise cost whose
//! derivative is known in closed form. Chained with the gradient of the [`Metric`] this yields
//! the gradient of the output affinity with respect to the embedding.
use dimred::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::metric::Metric;

/// Affinity computed entry-wise from a cost, with derivative
pub trait DifferentiableAffinity {
    /// Metric between two samples
    fn metric(&self) -> Metric;

    /// Whether self-affinities are excluded
    fn zero_diag(&self) -> bool;

    /// Affinity of a single cost
    fn value<F: Float>(&self, cost: F) -> F;

    /// Derivative of [`value`](Self::value) with respect to the cost
    fn derivative<F: Float>(&self, cost: F) -> F;

    /// Dense affinity between all pairs of rows of `embedding`
    fn evaluate<F: Float, D: Data<Elem = F>>(&self, embedding: &ArrayBase<D, Ix2>) -> Array2<F> {
        let n = embedding.nrows();
        let metric = self.metric();
        let mut affinity = Array2::from_shape_fn((n, n), |(i, j)| {
            self.value(metric.distance(embedding.row(i), embedding.row(j)))
        });

        if self.zero_diag() {
            affinity.diag_mut().fill(F::zero());
        }

        affinity
    }
}

macro_rules! output_kernel {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(
            feature = "serde",
            derive(Serialize, Deserialize),
            serde(crate = "serde_crate")
        )]
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            metric: Metric,
            zero_diag: bool,
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Squared Euclidean cost with a zero diagonal
            pub fn new() -> Self {
                $name {
                    metric: Metric::SqEuclidean,
                    zero_diag: true,
                }
            }

            pub fn metric(mut self, metric: Metric) -> Self {
                self.metric = metric;
                self
            }

            pub fn zero_diag(mut self, zero_diag: bool) -> Self {
                self.zero_diag = zero_diag;
                self
            }
        }
    };
}

output_kernel!(
    /// Gaussian affinity `exp(-C)`
    GaussianAffinity
);

output_kernel!(
    /// Student-t affinity with one degree of freedom `1 / (1 + C)`
    StudentAffinity
);

impl DifferentiableAffinity for GaussianAffinity {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn zero_diag(&self) -> bool {
        self.zero_diag
    }

    fn value<F: Float>(&self, cost: F) -> F {
        (-cost).exp()
    }

    fn derivative<F: Float>(&self, cost: F) -> F {
        -(-cost).exp()
    }
}

impl DifferentiableAffinity for StudentAffinity {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn zero_diag(&self) -> bool {
        self.zero_diag
    }

    fn value<F: Float>(&self, cost: F) -> F {
        (F::one() + cost).recip()
    }

    fn derivative<F: Float>(&self, cost: F) -> F {
        let q = (F::one() + cost).recip();
        -q * q
    }
}
