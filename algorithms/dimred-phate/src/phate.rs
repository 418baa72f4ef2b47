//! Potential of heat-diffusion for affinity-based transition embedding
use dimred::{
    traits::{Fit, Transformer},
    Float, ParamGuard,
};
use dimred_affinity::{Backend, NegPotentialParams, NegativeCostParams, NegativeCostValidParams};
use ndarray::{Array2, ArrayBase, Data, Ix2};

use crate::error::{EmbeddingError, Result};
use crate::init::Init;
use crate::loss::Loss;
use crate::matcher::{AffinityMatcherParams, AffinityMatcherValidParams, Embedding};
use crate::optim::OptimizerKind;
use crate::schedule::SchedulerKind;

/// Affinity matcher used by PHATE
pub type PhateMatcher<F> =
    AffinityMatcherValidParams<F, NegPotentialParams<F>, NegativeCostValidParams>;

/// PHATE hyperparameters
///
/// PHATE diffuses an alpha-decay kernel for `t` steps and compares samples by the distance
/// between their diffusion potentials. The embedding is fitted such that its negated squared
/// distances match the negated potential distances under a square loss.
///
/// # Example
///
/// ```
/// use dimred::traits::Fit;
/// use dimred_phate::{FitState, PhateParams};
/// use ndarray::Array2;
///
/// let records = Array2::from_shape_fn((30, 3), |(i, j)| {
///     (i / 15) as f64 * 10.0 + ((i * 7 + j * 3) % 11) as f64 * 0.1
/// });
///
/// let embedding = PhateParams::new()
///     .n_neighbors(5)
///     .max_iter(100)
///     .fit(&records)
///     .unwrap();
///
/// assert_eq!(embedding.embedding().dim(), (30, 2));
/// assert_ne!(embedding.state(), FitState::Failed);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhateValidParams<F> {
    n_neighbors: usize,
    t: usize,
    eps: F,
    backend: Backend,
    n_components: usize,
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

impl<F: Float> PhateValidParams<F> {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn eps(&self) -> F {
        self.eps
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn init_scaling(&self) -> F {
        self.init_scaling
    }

    /// Affinity matcher wired to the potential distance input and negative cost output
    pub fn matcher(&self) -> Result<PhateMatcher<F>> {
        let input = NegPotentialParams::new()
            .k(self.n_neighbors)
            .t(self.t)
            .eps(self.eps)
            .backend(self.backend);
        let output = NegativeCostParams::new().backend(self.backend).check()?;

        AffinityMatcherParams::new(input, output)
            .n_components(self.n_components)
            .loss(Loss::Square)
            .optimizer(self.optimizer)
            .lr(self.lr)
            .scheduler(self.scheduler)
            .min_grad_norm(self.min_grad_norm)
            .max_iter(self.max_iter)
            .init(self.init.clone())
            .init_scaling(self.init_scaling)
            .check_interval(self.check_interval)
            .seed(self.seed)
            .check()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhateParams<F>(PhateValidParams<F>);

impl<F: Float> Default for PhateParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> PhateParams<F> {
    /// Creates the set of default parameters
    ///
    /// # Defaults to:
    ///  * `n_neighbors`: 10
    ///  * `t`: 5
    ///  * `eps`: 1e-5
    ///  * `backend`: dense
    ///  * `n_components`: 2
    ///  * `optimizer`: Adam with learning rate 1
    ///  * `min_grad_norm`: 1e-7
    ///  * `max_iter`: 1000
    ///  * `init`: PCA scaled to a standard deviation of 1
    ///  * `check_interval`: 50
    ///  * `seed`: 42
    pub fn new() -> Self {
        Self(PhateValidParams {
            n_neighbors: 10,
            t: 5,
            eps: F::cast(1e-5),
            backend: Backend::Dense,
            n_components: 2,
            optimizer: OptimizerKind::adam(),
            lr: F::one(),
            scheduler: None,
            min_grad_norm: F::cast(1e-7),
            max_iter: 1000,
            init: Init::Pca,
            init_scaling: F::one(),
            check_interval: 50,
            seed: 42,
        })
    }

    /// Set the number of neighbours of the alpha-decay bandwidth
    pub fn n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.0.n_neighbors = n_neighbors;
        self
    }

    /// Set the diffusion time
    pub fn t(mut self, t: usize) -> Self {
        self.0.t = t;
        self
    }

    /// Set the offset inside the logarithm of the potential
    pub fn eps(mut self, eps: F) -> Self {
        self.0.eps = eps;
        self
    }

    /// Set the backend, the sparse backend cannot represent diffusion potentials
    pub fn backend(mut self, backend: Backend) -> Self {
        self.0.backend = backend;
        self
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.0.n_components = n_components;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind<F>) -> Self {
        self.0.optimizer = optimizer;
        self
    }

    pub fn lr(mut self, lr: F) -> Self {
        self.0.lr = lr;
        self
    }

    pub fn scheduler(mut self, scheduler: Option<SchedulerKind<F>>) -> Self {
        self.0.scheduler = scheduler;
        self
    }

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

    pub fn init_scaling(mut self, init_scaling: F) -> Self {
        self.0.init_scaling = init_scaling;
        self
    }

    pub fn check_interval(mut self, check_interval: usize) -> Self {
        self.0.check_interval = check_interval;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float> ParamGuard for PhateParams<F> {
    type Checked = PhateValidParams<F>;
    type Error = EmbeddingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.backend == Backend::Sparse {
            return Err(EmbeddingError::UnsupportedBackendConfiguration(
                "PHATE needs the dense transition matrix, use the dense or lazy backend".into(),
            ));
        }

        let matcher = self.0.matcher()?;
        matcher.input().check_ref()?;

        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, EmbeddingError> for PhateValidParams<F> {
    type Object = Embedding<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        self.matcher()?.fit(records)
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Result<Array2<F>>>
    for PhateValidParams<F>
{
    fn transform(&self, records: &'a ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        self.matcher()?.transform(records)
    }
}

#[cfg(test)]
mod tests {
    use dimred_affinity::AffinityError;

    use super::*;

    #[test]
    fn defaults() {
        let params = PhateParams::<f64>::new().check().unwrap();
        assert_eq!(params.n_neighbors(), 10);
        assert_eq!(params.t(), 5);
        assert_eq!(params.n_components(), 2);
        assert_eq!(params.max_iter(), 1000);
        assert!((params.eps() - 1e-5).abs() < 1e-20);
        assert!((params.init_scaling() - 1.0).abs() < 1e-20);

        let matcher = params.matcher().unwrap();
        assert_eq!(matcher.loss(), Loss::Square);
        assert_eq!(matcher.optimizer(), OptimizerKind::adam());
        assert_eq!(matcher.check_interval(), 50);
    }

    #[test]
    fn sparse_backend_fails_before_fitting() {
        let params = PhateParams::<f64>::new().backend(Backend::Sparse);
        assert!(matches!(
            params.check_ref(),
            Err(EmbeddingError::UnsupportedBackendConfiguration(_))
        ));

        // records are never looked at
        let records = Array2::<f64>::from_elem((3, 2), f64::NAN);
        assert!(matches!(
            params.fit(&records),
            Err(EmbeddingError::UnsupportedBackendConfiguration(_))
        ));
    }

    #[test]
    fn invalid_diffusion_parameters() {
        assert!(matches!(
            PhateParams::<f64>::new().eps(0.0).check(),
            Err(EmbeddingError::Affinity(AffinityError::InvalidParameter(_)))
        ));
        assert!(matches!(
            PhateParams::<f64>::new().t(0).check(),
            Err(EmbeddingError::Affinity(AffinityError::InvalidParameter(_)))
        ));
        assert!(matches!(
            PhateParams::<f64>::new().lr(-1.0).check(),
            Err(EmbeddingError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn lazy_backend_is_supported() {
        assert!(PhateParams::<f32>::new()
            .backend(Backend::Lazy)
            .check_ref()
            .is_ok());
    }
}
