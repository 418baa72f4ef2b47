//! Initial embeddings
use dimred::Float;
use linfa_linalg::eigh::{EigSort, EighInto};
use ndarray::{s, Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Strategy for the embedding an optimization starts from
///
/// Every strategy is rescaled such that the first column has standard deviation
/// `init_scaling`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Init<F> {
    /// Projection onto the leading principal components of the records
    Pca,
    /// Independent standard normal coordinates
    Random,
    /// A user provided embedding of shape `(n_samples, n_components)`
    Given(Array2<F>),
}

impl<F: Float> Default for Init<F> {
    fn default() -> Self {
        Init::Pca
    }
}

impl<F: Float> Init<F> {
    /// Creates the scaled initial embedding of `records`
    pub fn initialize<D: Data<Elem = F>, R: Rng>(
        &self,
        records: &ArrayBase<D, Ix2>,
        n_components: usize,
        init_scaling: F,
        rng: &mut R,
    ) -> Result<Array2<F>> {
        let n_samples = records.nrows();

        let mut embedding = match self {
            Init::Pca => pca(records, n_components)?,
            Init::Random => {
                Array2::<f64>::random_using((n_samples, n_components), StandardNormal, rng)
                    .mapv(|x| F::cast(x))
            }
            Init::Given(embedding) => {
                if embedding.dim() != (n_samples, n_components) {
                    return Err(EmbeddingError::InitShapeMismatch {
                        expected: (n_samples, n_components),
                        found: embedding.dim(),
                    });
                }
                embedding.clone()
            }
        };

        let std = embedding.column(0).std(F::one());
        if !std.is_finite() || std <= F::zero() {
            return Err(EmbeddingError::DegenerateInitialization);
        }

        let scale = init_scaling / std;
        embedding.mapv_inplace(|x| x * scale);

        Ok(embedding)
    }
}

/// Projects the centered records onto the `n_components` leading eigenvectors of their
/// covariance
fn pca<F: Float, D: Data<Elem = F>>(
    records: &ArrayBase<D, Ix2>,
    n_components: usize,
) -> Result<Array2<F>> {
    let (n_samples, n_features) = records.dim();
    if n_components > n_features {
        return Err(EmbeddingError::InvalidParameter(format!(
            "PCA initialization of {} components from {} features",
            n_components, n_features
        )));
    }

    let mean = records
        .mean_axis(Axis(0))
        .ok_or(dimred::Error::NotEnoughSamples(1))?;
    let centered = records - &mean;
    let cov = centered.t().dot(&centered) / F::cast(n_samples.saturating_sub(1).max(1));

    // eigenvectors are the columns, sorted by decreasing variance
    let (_, eigvecs) = cov.eigh_into()?.sort_eig_desc();

    Ok(centered.dot(&eigvecs.slice(s![.., ..n_components])))
}
