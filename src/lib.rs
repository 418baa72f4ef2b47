//! `dimred` provides the shared foundation for affinity-driven dimensionality reduction
//! in Rust.
//!
//! The workspace is split the same way a classical ML toolkit is: this crate carries the
//! floating point abstraction, error types and the hyperparameter checking machinery, while
//! the algorithms live in their own crates:
//!
//! * `dimred-affinity` builds adaptive-bandwidth affinity matrices (self-tuning, MAGIC,
//!   diffusion potentials) on top of dense, lazy or sparse pairwise distances.
//! * `dimred-phate` fits low-dimensional embeddings whose affinity reproduces a given input
//!   affinity, and wires the PHATE configuration on top of it.
//!
//! Every estimator follows the same flow: build an unchecked parameter set, optionally
//! validate it with [`ParamGuard`], then call [`Fit::fit`](traits::Fit::fit) on a record
//! matrix.
//!

pub mod error;
mod float;
pub mod param_guard;
pub mod prelude;
pub mod traits;

pub use error::{Error, Result};
pub use float::Float;
pub use param_guard::ParamGuard;
