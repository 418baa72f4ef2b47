//! Embeddings fitted by affinity matching
//!
//! An affinity matcher places the samples in a low-dimensional space such that the affinity of
//! the embedding reproduces the affinity of the records. The input affinity is computed once
//! with one of the adaptive-bandwidth models of `dimred-affinity`, the output affinity is a
//! cheap differentiable kernel which is re-evaluated in every iteration. A first-order
//! optimizer minimizes the element-wise loss between both until the gradient vanishes or the
//! iteration budget is exhausted.
//!
//! [`PhateParams`] fixes the wiring used by PHATE: a diffusion potential distance as input,
//! the negated squared distance as output and the square loss.
//!
//! # Example
//!
//! ```
//! use dimred::traits::Fit;
//! use dimred_affinity::{MagicParams, StudentAffinity};
//! use dimred_phate::{AffinityMatcherParams, Loss};
//! use ndarray::array;
//!
//! let records = array![[0.0, 0.0], [0.2, 0.1], [0.1, 0.3], [4.0, 4.0], [4.1, 3.8], [3.9, 4.2]];
//!
//! let embedding = AffinityMatcherParams::new(MagicParams::new().k(2), StudentAffinity::new())
//!     .loss(Loss::BinaryCrossEntropy)
//!     .max_iter(50)
//!     .fit(&records)
//!     .unwrap();
//!
//! assert_eq!(embedding.n_iter(), 50);
//! ```

mod error;
mod init;
mod loss;
mod matcher;
mod optim;
mod phate;
mod schedule;

pub use error::{EmbeddingError, Result};
pub use init::Init;
pub use loss::Loss;
pub use matcher::{AffinityMatcherParams, AffinityMatcherValidParams, Embedding, FitState};
pub use optim::{Adam, Optimizer, OptimizerKind, Sgd};
pub use phate::{PhateMatcher, PhateParams, PhateValidParams};
pub use schedule::{ExponentialDecay, LinearDecay, Scheduler, SchedulerKind, StepDecay};
