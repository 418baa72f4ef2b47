use dimred::{Float, ParamGuard};

use crate::error::{EmbeddingError, Result};
use crate::init::Init;
use crate::loss::Loss;
use crate::optim::OptimizerKind;
use crate::schedule::SchedulerKind;

/// Affinity matching embedding hyperparameters
///
/// An affinity matcher looks for an embedding whose output affinity reproduces the input
/// affinity of the records. The input affinity `I` is any affinity model of
/// `dimred-affinity`, it is fitted once at the beginning. The output affinity `O` is
/// recomputed from the embedding in every iteration and has to be differentiable.
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityMatcherValidParams<F, I, O> {
    input: I,
    output: O,
    n_components: usize,
    loss: Loss,
    optimizer: OptimizerKind<F>,
    lr: F,
    scheduler: Option<SchedulerKind<F>>,
    min_grad_norm: F,
    max_iter: usize,
    init: Init<F>,
    init_scaling: F,
    check_interval: usize,
    seed: u64,
}

impl<F: Float, I, O> AffinityMatcherValidParams<F, I, O> {
    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn optimizer(&self) -> OptimizerKind<F> {
        self.optimizer
    }

    pub fn lr(&self) -> F {
        self.lr
    }

    pub fn scheduler(&self) -> Option<SchedulerKind<F>> {
        self.scheduler
    }

    pub fn min_grad_norm(&self) -> F {
        self.min_grad_norm
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn init(&self) -> &Init<F> {
        &self.init
    }

    pub fn init_scaling(&self) -> F {
        self.init_scaling
    }

    pub fn check_interval(&self) -> usize {
        self.check_interval
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffinityMatcherParams<F, I, O>(AffinityMatcherValidParams<F, I, O>);

impl<F: Float, I, O> AffinityMatcherParams<F, I, O> {
    /// Matches the `output` affinity of an embedding to the `input` affinity of the records
    ///
    /// # Defaults to:
    ///  * `n_components`: 2
    ///  * `loss`: square loss
    ///  * `optimizer`: Adam with learning rate 1
    ///  * `scheduler`: none
    ///  * `min_grad_norm`: 1e-7
    ///  * `max_iter`: 1000
    ///  * `init`: PCA scaled to a standard deviation of 1e-4
    ///  * `check_interval`: 50
    ///  * `seed`: 42
    pub fn new(input: I, output: O) -> Self {
        Self(AffinityMatcherValidParams {
            input,
            output,
            n_components: 2,
            loss: Loss::Square,
            optimizer: OptimizerKind::adam(),
            lr: F::one(),
            scheduler: None,
            min_grad_norm: F::cast(1e-7),
            max_iter: 1000,
            init: Init::Pca,
            init_scaling: F::cast(1e-4),
            check_interval: 50,
            seed: 42,
        })
    }

    /// Set the dimension of the embedding
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.0.n_components = n_components;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.0.loss = loss;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind<F>) -> Self {
        self.0.optimizer = optimizer;
        self
    }

    /// Set the initial learning rate of the optimizer
    pub fn lr(mut self, lr: F) -> Self {
        self.0.lr = lr;
        self
    }

    pub fn scheduler(mut self, scheduler: Option<SchedulerKind<F>>) -> Self {
        self.0.scheduler = scheduler;
        self
    }

    /// Set the gradient norm below which the optimization has converged
    pub fn min_grad_norm(mut self, min_grad_norm: F) -> Self {
        self.0.min_grad_norm = min_grad_norm;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    pub fn init(mut self, init: Init<F>) -> Self {
        self.0.init = init;
        self
    }

    /// Set the standard deviation of the first column of the initial embedding
    pub fn init_scaling(mut self, init_scaling: F) -> Self {
        self.0.init_scaling = init_scaling;
        self
    }

    /// Set the number of iterations between two convergence checks
    pub fn check_interval(mut self, check_interval: usize) -> Self {
        self.0.check_interval = check_interval;
        self
    }

    /// Set the seed of the random initializations
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, I, O> ParamGuard for AffinityMatcherParams<F, I, O> {
    type Checked = AffinityMatcherValidParams<F, I, O>;
    type Error = EmbeddingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let params = &self.0;

        if params.n_components == 0 {
            return Err(EmbeddingError::EmbeddingSizeZero);
        }
        if !params.lr.is_finite() || params.lr <= F::zero() {
            return Err(EmbeddingError::InvalidLearningRate(
                params.lr.to_f64().unwrap_or(f64::NAN),
            ));
        }
        if params.max_iter == 0 {
            return Err(EmbeddingError::ZeroIterations);
        }
        if params.check_interval == 0 {
            return Err(EmbeddingError::ZeroCheckInterval);
        }
        if !params.init_scaling.is_finite() || params.init_scaling <= F::zero() {
            return Err(EmbeddingError::InvalidInitScaling(
                params.init_scaling.to_f64().unwrap_or(f64::NAN),
            ));
        }
        if params.min_grad_norm.is_nan() || params.min_grad_norm < F::zero() {
            return Err(EmbeddingError::NegativeGradNorm);
        }
        if let Init::Given(embedding) = &params.init {
            if embedding.ncols() != params.n_components {
                return Err(EmbeddingError::InitShapeMismatch {
                    expected: (embedding.nrows(), params.n_components),
                    found: embedding.dim(),
                });
            }
        }

        params.optimizer.validate()?;
        if let Some(scheduler) = &params.scheduler {
            scheduler.validate()?;
        }

        Ok(params)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
