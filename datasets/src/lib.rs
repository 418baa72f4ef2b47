//! `dimred-datasets` provides synthetic datasets ready to be used in tests, benchmarks and
//! examples of the `dimred` crates.
//!
//! All generators take an explicit random number generator, seeding it makes every dataset
//! reproducible:
//! ```ignore
//! use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256Plus};
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let (records, labels) = dimred_datasets::generate::labelled_blobs(25, &centroids, &mut rng);
//! ```

pub mod generate;
