//! First-order optimizers updating the embedding
use dimred::Float;
use ndarray::{Array2, Zip};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Default exponential decay of the first moment estimate
const BETA1: f64 = 0.9;
/// Default exponential decay of the second moment estimate
const BETA2: f64 = 0.999;
/// Default denominator offset of the Adam update
const EPS: f64 = 1e-8;

/// Updates parameters from their gradient
///
/// Optimizers carry state between steps (momentum buffers, moment estimates). The state is
/// allocated on the first step and must keep the shape of the parameters afterwards.
pub trait Optimizer<F: Float> {
    /// Performs a single descent step on `params`
    fn step(&mut self, params: &mut Array2<F>, grad: &Array2<F>);

    /// Current learning rate
    fn learning_rate(&self) -> F;

    /// Replaces the learning rate, used by schedulers
    fn set_learning_rate(&mut self, lr: F);
}

/// Stochastic gradient descent with heavy ball momentum
///
/// ```text
/// b = momentum * b + g
/// p = p - lr * b
/// ```
#[derive(Debug, Clone)]
pub struct Sgd<F> {
    lr: F,
    momentum: F,
    velocity: Option<Array2<F>>,
}

impl<F: Float> Sgd<F> {
    pub fn new(lr: F, momentum: F) -> Self {
        Sgd {
            lr,
            momentum,
            velocity: None,
        }
    }
}

impl<F: Float> Optimizer<F> for Sgd<F> {
    fn step(&mut self, params: &mut Array2<F>, grad: &Array2<F>) {
        let lr = self.lr;

        if self.momentum == F::zero() {
            params.scaled_add(-lr, grad);
            return;
        }

        let momentum = self.momentum;
        let velocity = self.velocity.get_or_insert_with(|| Array2::zeros(grad.raw_dim()));
        Zip::from(&mut *velocity)
            .and(grad)
            .for_each(|b, &g| *b = momentum * *b + g);
        params.scaled_add(-lr, &*velocity);
    }

    fn learning_rate(&self) -> F {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: F) {
        self.lr = lr;
    }
}

/// Adam with bias corrected moment estimates
#[derive(Debug, Clone)]
pub struct Adam<F> {
    lr: F,
    beta1: F,
    beta2: F,
    eps: F,
    beta1t: F,
    beta2t: F,
    moments: Option<(Array2<F>, Array2<F>)>,
}

impl<F: Float> Adam<F> {
    pub fn new(lr: F, beta1: F, beta2: F, eps: F) -> Self {
        Adam {
            lr,
            beta1,
            beta2,
            eps,
            beta1t: F::one(),
            beta2t: F::one(),
            moments: None,
        }
    }
}

impl<F: Float> Optimizer<F> for Adam<F> {
    fn step(&mut self, params: &mut Array2<F>, grad: &Array2<F>) {
        let one = F::one();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.eps);

        self.beta1t *= beta1;
        self.beta2t *= beta2;
        let bias1 = one - self.beta1t;
        let bias2 = one - self.beta2t;
        let lr = self.lr;

        let (m, v) = self
            .moments
            .get_or_insert_with(|| (Array2::zeros(grad.raw_dim()), Array2::zeros(grad.raw_dim())));

        Zip::from(params)
            .and(m)
            .and(v)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (one - beta1) * g;
                *v = beta2 * *v + (one - beta2) * g * g;

                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    fn learning_rate(&self) -> F {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: F) {
        self.lr = lr;
    }
}

/// Optimizer used by an embedding, instantiated at the beginning of every fit
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerKind<F> {
    /// [`Sgd`] with the given momentum, zero disables the momentum buffer
    Sgd { momentum: F },
    /// [`Adam`] with the given moment decays and denominator offset
    Adam { beta1: F, beta2: F, eps: F },
}

impl<F: Float> Default for OptimizerKind<F> {
    fn default() -> Self {
        OptimizerKind::adam()
    }
}

impl<F: Float> OptimizerKind<F> {
    /// Adam with `beta1 = 0.9`, `beta2 = 0.999` and `eps = 1e-8`
    pub fn adam() -> Self {
        OptimizerKind::Adam {
            beta1: F::cast(BETA1),
            beta2: F::cast(BETA2),
            eps: F::cast(EPS),
        }
    }

    /// Plain gradient descent without momentum
    pub fn sgd() -> Self {
        OptimizerKind::Sgd {
            momentum: F::zero(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let in_unit = |x: F| x >= F::zero() && x < F::one();

        match *self {
            OptimizerKind::Sgd { momentum } if !in_unit(momentum) => Err(
                EmbeddingError::InvalidParameter(format!("momentum {} not in [0, 1)", momentum)),
            ),
            OptimizerKind::Adam { beta1, beta2, .. } if !in_unit(beta1) || !in_unit(beta2) => {
                Err(EmbeddingError::InvalidParameter(format!(
                    "Adam decays ({}, {}) not in [0, 1)",
                    beta1, beta2
                )))
            }
            OptimizerKind::Adam { eps, .. } if eps <= F::zero() => Err(
                EmbeddingError::InvalidParameter(format!("Adam offset {} not positive", eps)),
            ),
            _ => Ok(()),
        }
    }

    /// Creates a fresh optimizer without state
    pub fn build(&self, lr: F) -> Box<dyn Optimizer<F>> {
        match *self {
            OptimizerKind::Sgd { momentum } => Box::new(Sgd::new(lr, momentum)),
            OptimizerKind::Adam { beta1, beta2, eps } => {
                Box::new(Adam::new(lr, beta1, beta2, eps))
            }
        }
    }
}
