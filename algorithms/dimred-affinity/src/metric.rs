use dimred::Float;
use ndarray::{Array1, ArrayView1, Zip};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Metric used to compute the pairwise cost matrix
///
/// The squared Euclidean distance does not satisfy the triangle inequality, but it is the
/// natural cost for exponential kernels and therefore the default of most affinities.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Metric {
    /// Squared Euclidean distance
    SqEuclidean,
    /// Euclidean distance
    Euclidean,
    /// Manhattan distance
    Manhattan,
    /// Chebyshev distance
    Chebyshev,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::SqEuclidean
    }
}

impl Metric {
    // Panics if a and b are not of equal dimension
    pub fn distance<F: Float>(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        match self {
            Self::SqEuclidean => Zip::from(&a).and(&b).fold(F::zero(), |acc, &a, &b| {
                let diff = a - b;
                acc + diff * diff
            }),
            Self::Euclidean => Self::SqEuclidean.distance(a, b).sqrt(),
            Self::Manhattan => Zip::from(&a)
                .and(&b)
                .fold(F::zero(), |acc, &a, &b| acc + (a - b).abs()),
            Self::Chebyshev => Zip::from(&a)
                .and(&b)
                .fold(F::zero(), |acc, &a, &b| acc.max((a - b).abs())),
        }
    }

    /// Gradient of `distance(a, b)` with respect to `a`
    ///
    /// All metrics are symmetric functions of `a - b`, the gradient with respect to `b` is
    /// therefore the negated result. Non-differentiable points (coinciding samples for the
    /// Euclidean distance, ties for Chebyshev) use the zero sub-gradient resp. the first
    /// maximal coordinate.
    pub fn gradient<F: Float>(&self, a: ArrayView1<F>, b: ArrayView1<F>, dist: F) -> Array1<F> {
        match self {
            Self::SqEuclidean => Zip::from(&a)
                .and(&b)
                .map_collect(|&a, &b| F::cast(2.0) * (a - b)),
            Self::Euclidean => {
                if dist > F::zero() {
                    Zip::from(&a).and(&b).map_collect(|&a, &b| (a - b) / dist)
                } else {
                    Array1::zeros(a.len())
                }
            }
            Self::Manhattan => Zip::from(&a).and(&b).map_collect(|&a, &b| sign(a - b)),
            Self::Chebyshev => {
                let mut grad = Array1::zeros(a.len());
                let argmax = a
                    .iter()
                    .zip(b.iter())
                    .map(|(&a, &b)| (a - b).abs())
                    .enumerate()
                    .fold(None, |best: Option<(usize, F)>, (idx, val)| match best {
                        Some((_, max)) if max >= val => best,
                        _ => Some((idx, val)),
                    });

                if let Some((idx, _)) = argmax {
                    grad[idx] = sign(a[idx] - b[idx]);
                }

                grad
            }
        }
    }
}

fn sign<F: Float>(x: F) -> F {
    if x > F::zero() {
        F::one()
    } else if x < F::zero() {
        -F::one()
    } else {
        F::zero()
    }
}
