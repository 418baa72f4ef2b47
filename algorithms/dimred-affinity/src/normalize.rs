//! Normalization of affinity matrices
//!
//! Two policies exist. Log-domain affinities subtract a log-sum-exp over one axis or over the
//! whole matrix. Diffusion affinities are exponentiated first, averaged with their transpose and
//! finally divided by their row sums, which yields a row-stochastic transition matrix.
use dimred::Float;
use ndarray::Axis;

use crate::error::Result;
use crate::pairwise::{LogNormalization, NormAxis, PairwiseMatrix};

/// Normalizes a log-affinity in the log domain
///
/// Returns the normalized log-affinity together with the subtracted log-partition term. Without
/// a normalization axis the log-affinity is returned unchanged.
pub fn log_normalize<F: Float, M: PairwiseMatrix<F>>(
    log_affinity: M,
    axis: Option<NormAxis>,
) -> Result<(M, Option<LogNormalization<F>>)> {
    match axis {
        None => Ok((log_affinity, None)),
        Some(axis) => {
            let norm = log_affinity.logsumexp(axis)?;
            let normalized = log_affinity.sub_log_normalization(&norm)?;

            Ok((normalized, Some(norm)))
        }
    }
}

/// Exponentiates a log-affinity, symmetrizes it and divides every row by its sum
///
/// Only the intermediate matrix is symmetric, the row-stochastic result is generally not.
pub fn symmetric_row_normalize<F: Float, M: PairwiseMatrix<F>>(log_affinity: M) -> Result<M> {
    let affinity = log_affinity.exp().symmetrize()?;
    let row_sums = affinity.sum_axis(Axis(1));

    affinity.div_axis(&row_sums, Axis(1))
}
