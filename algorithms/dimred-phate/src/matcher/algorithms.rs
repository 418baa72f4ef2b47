use dimred::{
    traits::{Fit, Transformer},
    Float,
};
use dimred_affinity::{
    AffinityError, DifferentiableAffinity, FittedAffinity, Pairwise, PairwiseMatrix,
};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use rand::{rngs::SmallRng, SeedableRng};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AffinityMatcherValidParams;
use crate::error::{EmbeddingError, Result};
use crate::loss::Loss;

/// State of an affinity matching optimization
///
/// ```text
/// Initialized -> Fitting -> Converged
///                        -> MaxIterReached
///                        -> Failed
/// ```
///
/// A failed optimization is reported as [`EmbeddingError::NonFiniteValue`], the embedding of
/// a successful fit therefore ends in either `Converged` or `MaxIterReached`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Initialized,
    Fitting,
    Converged,
    MaxIterReached,
    Failed,
}

/// Fitted embedding
#[derive(Debug, Clone)]
pub struct Embedding<F: Float> {
    embedding: Array2<F>,
    state: FitState,
    n_iter: usize,
    loss: F,
    input_affinity: Pairwise<F>,
}

impl<F: Float> Embedding<F> {
    /// Embedding coordinates, one row per sample
    pub fn embedding(&self) -> &Array2<F> {
        &self.embedding
    }

    pub fn into_embedding(self) -> Array2<F> {
        self.embedding
    }

    /// Terminal state of the optimization
    pub fn state(&self) -> FitState {
        self.state
    }

    /// Number of gradient steps taken
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Loss of the last iteration
    pub fn loss(&self) -> F {
        self.loss
    }

    /// Input affinity the embedding was matched to
    pub fn input_affinity(&self) -> &Pairwise<F> {
        &self.input_affinity
    }
}

/// Loss between the input affinity and the output affinity of `embedding`, together with its
/// gradient with respect to the embedding
///
/// The output affinity is never materialized. For every pair the chain rule
///
/// ```text
/// dL/dy_i = sum_j  l'(P_ij, Q_ij) * dQ/dC (C_ij) * dC/dy_i
/// ```
///
/// is accumulated, with the gradient of the metric for the second argument being the negated
/// gradient for the first.
pub(crate) fn loss_and_gradient<F: Float, O: DifferentiableAffinity>(
    input: &Pairwise<F>,
    output: &O,
    loss: Loss,
    embedding: &Array2<F>,
) -> (F, Array2<F>) {
    let n_samples = embedding.nrows();
    let metric = output.metric();
    let zero_diag = output.zero_diag();

    let mut total = F::zero();
    let mut grad = Array2::zeros(embedding.raw_dim());

    for i in 0..n_samples {
        let yi = embedding.row(i);
        for j in 0..n_samples {
            if i == j && zero_diag {
                continue;
            }

            let yj = embedding.row(j);
            let cost = metric.distance(yi, yj);
            let p = input.get(i, j);
            let q = output.value(cost);

            total += loss.value(p, q);

            let coeff = loss.derivative(p, q) * output.derivative(cost);
            if i == j || coeff == F::zero() {
                continue;
            }

            let v = metric.gradient(yi, yj, cost) * coeff;
            grad.row_mut(i).scaled_add(F::one(), &v);
            grad.row_mut(j).scaled_add(-F::one(), &v);
        }
    }

    (total, grad)
}

impl<F, D, I, O> Fit<ArrayBase<D, Ix2>, EmbeddingError> for AffinityMatcherValidParams<F, I, O>
where
    F: Float,
    D: Data<Elem = F>,
    I: Fit<ArrayBase<D, Ix2>, AffinityError>,
    I::Object: FittedAffinity<F>,
    O: DifferentiableAffinity,
{
    type Object = Embedding<F>;

    fn fit(&self, records: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let n_samples = records.nrows();
        info!(
            n_samples,
            n_components = self.n_components(),
            max_iter = self.max_iter(),
            "fitting affinity matching embedding"
        );

        let input_affinity = self.input().fit(records)?.affinity();
        if input_affinity.shape() != (n_samples, n_samples) {
            return Err(AffinityError::ShapeMismatch(
                input_affinity.shape(),
                (n_samples, n_samples),
            )
            .into());
        }

        let mut rng = SmallRng::seed_from_u64(self.seed());
        let mut embedding = self.init().initialize(
            records,
            self.n_components(),
            self.init_scaling(),
            &mut rng,
        )?;

        let mut state = FitState::Initialized;
        debug!(?state, backend = ?input_affinity.backend(), "input affinity ready");

        let mut optimizer = self.optimizer().build(self.lr());
        let mut scheduler = self
            .scheduler()
            .map(|kind| kind.build(self.lr(), self.max_iter()))
            .transpose()?;

        state = FitState::Fitting;
        let mut loss = F::nan();
        let mut n_iter = 0;

        while n_iter < self.max_iter() {
            let (value, grad) =
                loss_and_gradient(&input_affinity, self.output(), self.loss(), &embedding);

            let quantity = if !value.is_finite() {
                Some("loss")
            } else if grad.iter().any(|x| !x.is_finite()) {
                Some("gradient")
            } else {
                None
            };
            if let Some(quantity) = quantity {
                state = FitState::Failed;
                info!(?state, iteration = n_iter, quantity, "optimization failed");
                return Err(EmbeddingError::NonFiniteValue {
                    iteration: n_iter,
                    quantity,
                });
            }

            loss = value;
            optimizer.step(&mut embedding, &grad);
            if let Some(scheduler) = scheduler.as_mut() {
                scheduler.step(optimizer.as_mut());
            }
            n_iter += 1;

            if n_iter % self.check_interval() == 0 {
                let grad_norm = grad.iter().fold(F::zero(), |acc, x| acc + *x * *x).sqrt();
                debug!(
                    iteration = n_iter,
                    loss = %loss,
                    grad_norm = %grad_norm,
                    lr = %optimizer.learning_rate(),
                    "convergence check"
                );

                if grad_norm < self.min_grad_norm() {
                    state = FitState::Converged;
                    break;
                }
            }
        }

        if state == FitState::Fitting {
            state = FitState::MaxIterReached;
            warn!(
                max_iter = self.max_iter(),
                "optimization did not converge within the iteration budget"
            );
        }

        info!(?state, n_iter, loss = %loss, "finished affinity matching");

        Ok(Embedding {
            embedding,
            state,
            n_iter,
            loss,
            input_affinity,
        })
    }
}

impl<'a, F, D, I, O> Transformer<&'a ArrayBase<D, Ix2>, Result<Array2<F>>>
    for AffinityMatcherValidParams<F, I, O>
where
    F: Float,
    D: Data<Elem = F>,
    I: Fit<ArrayBase<D, Ix2>, AffinityError>,
    I::Object: FittedAffinity<F>,
    O: DifferentiableAffinity,
{
    /// Fits the embedding and returns its coordinates
    fn transform(&self, records: &'a ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        self.fit(records).map(Embedding::into_embedding)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use dimred::ParamGuard;
    use dimred_affinity::{
        GaussianAffinity, MagicParams, Metric, NegativeCostParams, SelfTuningParams,
        StudentAffinity,
    };
    use ndarray::{arr2, Array2};

    use super::*;
    use crate::init::Init;
    use crate::matcher::AffinityMatcherParams;
    use crate::optim::OptimizerKind;
    use crate::schedule::SchedulerKind;

    fn records() -> Array2<f64> {
        arr2(&[
            [0.0, 0.0, 0.1],
            [0.2, 0.1, 0.0],
            [0.1, 0.3, 0.2],
            [0.3, 0.2, 0.1],
            [5.0, 5.0, 4.9],
            [5.1, 4.8, 5.0],
            [4.9, 5.2, 5.1],
            [5.2, 5.1, 4.8],
        ])
    }

    fn numeric_gradient<O: DifferentiableAffinity>(
        input: &Pairwise<f64>,
        output: &O,
        loss: Loss,
        embedding: &Array2<f64>,
    ) -> Array2<f64> {
        let h = 1e-6;
        let mut grad = Array2::zeros(embedding.raw_dim());
        for ((i, k), g) in grad.indexed_iter_mut() {
            let mut plus = embedding.clone();
            plus[(i, k)] += h;
            let mut minus = embedding.clone();
            minus[(i, k)] -= h;

            let (lp, _) = loss_and_gradient(input, output, loss, &plus);
            let (lm, _) = loss_and_gradient(input, output, loss, &minus);
            *g = (lp - lm) / (2.0 * h);
        }
        grad
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let input = Pairwise::Dense(Array2::from_shape_fn((4, 4), |(i, j)| {
            0.05 * (i + 2 * j) as f64
        }));
        let embedding = arr2(&[[0.0, 0.5], [1.0, -0.3], [0.4, 0.9], [-0.7, 0.2]]);

        let check = |output: &dyn Fn(&Array2<f64>) -> (Array2<f64>, Array2<f64>)| {
            let (analytic, numeric) = output(&embedding);
            assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-5);
        };

        check(&|y| {
            let out = StudentAffinity::new();
            (
                loss_and_gradient(&input, &out, Loss::Square, y).1,
                numeric_gradient(&input, &out, Loss::Square, y),
            )
        });
        check(&|y| {
            let out = GaussianAffinity::new().metric(Metric::Euclidean);
            (
                loss_and_gradient(&input, &out, Loss::BinaryCrossEntropy, y).1,
                numeric_gradient(&input, &out, Loss::BinaryCrossEntropy, y),
            )
        });
        check(&|y| {
            let out = NegativeCostParams::new().zero_diag(false).check_unwrap();
            (
                loss_and_gradient(&input, &out, Loss::Square, y).1,
                numeric_gradient(&input, &out, Loss::Square, y),
            )
        });
    }

    #[test]
    fn diagonal_is_left_out() {
        let input = Pairwise::Dense(Array2::from_elem((3, 3), 1.0));
        let embedding = arr2(&[[0.0], [1.0], [3.0]]);

        let (with, _) =
            loss_and_gradient(&input, &StudentAffinity::new(), Loss::Square, &embedding);
        let (without, _) = loss_and_gradient(
            &input,
            &StudentAffinity::new().zero_diag(false),
            Loss::Square,
            &embedding,
        );

        // self-pairs have cost zero and affinity one, matching the input exactly
        assert_abs_diff_eq!(with, without);

        let input = Pairwise::Dense(Array2::zeros((3, 3)));
        let (with, _) =
            loss_and_gradient(&input, &StudentAffinity::new(), Loss::Square, &embedding);
        let (without, _) = loss_and_gradient(
            &input,
            &StudentAffinity::new().zero_diag(false),
            Loss::Square,
            &embedding,
        );
        assert_abs_diff_eq!(without - with, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn reduces_the_loss() {
        let params = AffinityMatcherParams::new(
            SelfTuningParams::new().k(2),
            StudentAffinity::new(),
        )
        .init_scaling(1.0)
        .lr(0.05)
        .max_iter(200);

        let first = params.clone().max_iter(1).fit(&records()).unwrap();
        let last = params.fit(&records()).unwrap();

        assert_eq!(first.n_iter(), 1);
        assert_eq!(last.n_iter(), 200);
        assert_eq!(last.state(), FitState::MaxIterReached);
        assert!(last.loss() < first.loss());
        assert_eq!(last.embedding().dim(), (8, 2));
    }

    #[test]
    fn converges_with_a_loose_tolerance() {
        let embedding = AffinityMatcherParams::new(
            MagicParams::new().k(2),
            GaussianAffinity::new(),
        )
        .optimizer(OptimizerKind::sgd())
        .lr(1e-3)
        .min_grad_norm(1e3)
        .check_interval(5)
        .fit(&records())
        .unwrap();

        assert_eq!(embedding.state(), FitState::Converged);
        assert_eq!(embedding.n_iter(), 5);
    }

    #[test]
    fn non_finite_values_abort_the_fit() {
        let given = arr2(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [4.0, 0.0],
            [5.0, 0.0],
            [6.0, 0.0],
            [7.0, 0.0],
        ]);

        let result = AffinityMatcherParams::new(
            SelfTuningParams::new().k(2),
            NegativeCostParams::new().check_unwrap(),
        )
        .init(Init::Given(given))
        .init_scaling(1e200)
        .fit(&records());

        assert!(matches!(
            result,
            Err(EmbeddingError::NonFiniteValue { iteration: 0, .. })
        ));
    }

    #[test]
    fn schedules_and_seeds_are_reproducible() {
        let params = AffinityMatcherParams::new(
            SelfTuningParams::new().k(3),
            StudentAffinity::new(),
        )
        .init(Init::Random)
        .scheduler(Some(SchedulerKind::Linear))
        .max_iter(30)
        .seed(7);

        let a = params.clone().check_unwrap().transform(&records()).unwrap();
        let b = params.clone().check_unwrap().transform(&records()).unwrap();
        let c = params.seed(8).check_unwrap().transform(&records()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn input_errors_are_forwarded() {
        let result = AffinityMatcherParams::new(
            SelfTuningParams::new().k(20),
            StudentAffinity::new(),
        )
        .fit(&records());

        assert!(matches!(
            result,
            Err(EmbeddingError::Affinity(AffinityError::InvalidK { .. }))
        ));
    }
}
