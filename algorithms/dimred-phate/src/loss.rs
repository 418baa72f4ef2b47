use dimred::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Element-wise loss between an input affinity `p` and an output affinity `q`
///
/// The total loss of an embedding is the sum over all pairs, self-pairs are left out when the
/// output affinity has a zero diagonal.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// `(p - q)^2`
    Square,
    /// `-p log(q) - (1 - p) log(1 - q)`, affinities have to lie in `[0, 1]`
    BinaryCrossEntropy,
}

impl Default for Loss {
    fn default() -> Self {
        Loss::Square
    }
}

impl Loss {
    pub fn value<F: Float>(&self, p: F, q: F) -> F {
        match self {
            Loss::Square => (p - q) * (p - q),
            Loss::BinaryCrossEntropy => {
                let q = clamp_unit(q);
                -(p * q.ln() + (F::one() - p) * (F::one() - q).ln())
            }
        }
    }

    /// Derivative of [`value`](Self::value) with respect to the output affinity `q`
    pub fn derivative<F: Float>(&self, p: F, q: F) -> F {
        match self {
            Loss::Square => F::cast(2.0) * (q - p),
            Loss::BinaryCrossEntropy => {
                let q = clamp_unit(q);
                (q - p) / (q * (F::one() - q))
            }
        }
    }
}

/// Keeps the logarithms of the cross entropy finite
fn clamp_unit<F: Float>(q: F) -> F {
    let eps = F::epsilon();
    q.max(eps).min(F::one() - eps)
}
