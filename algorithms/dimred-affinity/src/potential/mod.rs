mod algorithms;
mod hyperparams;

pub use algorithms::*;
pub use hyperparams::*;
