use thiserror::Error;

pub type Result<T> = std::result::Result<T, AffinityError>;

#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum AffinityError {
    #[error("invalid number of neighbours K = {k}, only {available} available")]
    InvalidK { k: usize, available: usize },
    #[error("bandwidth of sample {index} is zero, the kernel would divide by zero")]
    DegenerateBandwidth { index: usize },
    #[error("unsupported backend configuration: {0}")]
    UnsupportedBackend(String),
    #[error("invalid parameter {0}")]
    InvalidParameter(String),
    #[error("at least 2 samples needed")]
    NotEnoughSamples,
    #[error("operands have mismatched shapes {0:?} and {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),
    #[error("invalid shaped array {0}")]
    InvalidShape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    BaseCrate(#[from] dimred::Error),
}
