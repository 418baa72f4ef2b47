use dimred_affinity::AffinityError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EmbeddingError {
    #[error("non-finite {quantity} encountered after {iteration} iterations")]
    NonFiniteValue {
        iteration: usize,
        quantity: &'static str,
    },
    #[error("unsupported backend configuration: {0}")]
    UnsupportedBackendConfiguration(String),
    #[error("learning rate {0} should be positive and finite")]
    InvalidLearningRate(f64),
    #[error("maximal number of iterations should be positive")]
    ZeroIterations,
    #[error("convergence check interval should be positive")]
    ZeroCheckInterval,
    #[error("embedding size should be positive")]
    EmbeddingSizeZero,
    #[error("initial scaling {0} should be positive and finite")]
    InvalidInitScaling(f64),
    #[error("minimal gradient norm should not be negative")]
    NegativeGradNorm,
    #[error("initial embedding has shape {found:?}, expected {expected:?}")]
    InitShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("first component of the initial embedding has zero variance")]
    DegenerateInitialization,
    #[error("invalid parameter {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    #[error(transparent)]
    Affinity(#[from] AffinityError),
    #[error(transparent)]
    BaseCrate(#[from] dimred::Error),
}
