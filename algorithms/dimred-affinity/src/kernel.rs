//! Log-domain kernels with per-sample bandwidth
//!
//! Every shape maps a cost `C[i, j]` and the bandwidths of both samples directly to a
//! log-affinity. The exponential is never formed here, large costs therefore end up as very
//! negative log-affinities instead of underflowing to zero.
use dimred::Float;
use ndarray::Array1;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};

/// Shape of an adaptive-bandwidth kernel
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelShape<F> {
    /// `-C[i, j] / (sigma_i * sigma_j)`, symmetric for a symmetric cost
    SelfTuning,
    /// `-C[i, j] / sigma_i`, bandwidth of the row sample only
    Magic,
    /// `-(C[i, j] / sigma_i)^alpha`, the alpha-decay kernel of diffusion potentials
    AlphaDecay(F),
}

impl<F: Float> KernelShape<F> {
    /// Log-affinity of a single entry
    #[inline]
    pub fn log_affinity(&self, cost: F, sigma_i: F, sigma_j: F) -> F {
        match self {
            Self::SelfTuning => -cost / (sigma_i * sigma_j),
            Self::Magic => -cost / sigma_i,
            Self::AlphaDecay(alpha) => -(cost / sigma_i).powf(*alpha),
        }
    }

    /// Whether the shape reads the bandwidth of the column sample
    pub fn uses_column_bandwidth(&self) -> bool {
        matches!(self, Self::SelfTuning)
    }

    pub(crate) fn check_bandwidth(&self, sigma: &Array1<F>, shape: (usize, usize)) -> Result<()> {
        let expected = if self.uses_column_bandwidth() {
            (shape.0, shape.0)
        } else {
            (shape.0, shape.1)
        };
        if sigma.len() != shape.0 || expected != shape {
            return Err(AffinityError::ShapeMismatch(shape, (sigma.len(), sigma.len())));
        }

        if let Some(index) = sigma.iter().position(|s| *s <= F::zero()) {
            return Err(AffinityError::DegenerateBandwidth { index });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    use super::*;

    #[test]
    fn shapes() {
        assert_abs_diff_eq!(KernelShape::SelfTuning.log_affinity(6.0, 2.0, 3.0), -1.0);
        assert_abs_diff_eq!(KernelShape::Magic.log_affinity(6.0, 2.0, 3.0), -3.0);
        assert_abs_diff_eq!(
            KernelShape::AlphaDecay(2.0).log_affinity(6.0, 2.0, 3.0),
            -9.0
        );
    }

    #[test]
    fn masked_entries_stay_masked() {
        for shape in &[
            KernelShape::SelfTuning,
            KernelShape::Magic,
            KernelShape::AlphaDecay(10.0),
        ] {
            assert_eq!(
                shape.log_affinity(f64::INFINITY, 0.5, 2.0),
                f64::NEG_INFINITY
            );
        }
    }

    #[test]
    fn huge_costs_do_not_underflow_in_log_domain() {
        let log_p: f64 = KernelShape::SelfTuning.log_affinity(1e6, 1.0, 1.0);
        assert!(log_p.is_finite());
        assert_eq!(log_p.exp(), 0.0);
    }

    #[test]
    fn bandwidth_checks() {
        let shape = KernelShape::SelfTuning;
        assert!(shape.check_bandwidth(&arr1(&[1.0, 2.0]), (2, 2)).is_ok());
        assert!(matches!(
            shape.check_bandwidth(&arr1(&[1.0, 0.0]), (2, 2)),
            Err(AffinityError::DegenerateBandwidth { index: 1 })
        ));
        assert!(shape.check_bandwidth(&arr1(&[1.0, 2.0]), (2, 3)).is_err());
        assert!(KernelShape::Magic
            .check_bandwidth(&arr1(&[1.0, 2.0]), (2, 3))
            .is_ok());
    }
}
