//! Learning rate schedules
use dimred::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};
use crate::optim::Optimizer;

/// Adapts the learning rate of an optimizer once per iteration
pub trait Scheduler<F: Float> {
    fn step(&mut self, optimizer: &mut dyn Optimizer<F>);
}

/// Decays the learning rate linearly to zero over the iteration budget
#[derive(Debug, Clone)]
pub struct LinearDecay<F> {
    initial: F,
    total: usize,
    n_steps: usize,
}

impl<F: Float> LinearDecay<F> {
    pub fn new(initial: F, total: usize) -> Self {
        LinearDecay {
            initial,
            total,
            n_steps: 0,
        }
    }
}

impl<F: Float> Scheduler<F> for LinearDecay<F> {
    fn step(&mut self, optimizer: &mut dyn Optimizer<F>) {
        self.n_steps = (self.n_steps + 1).min(self.total);
        let frac = F::cast(self.n_steps) / F::cast(self.total.max(1));
        optimizer.set_learning_rate(self.initial * (F::one() - frac));
    }
}

/// Multiplies the learning rate by `gamma` after every iteration
#[derive(Debug, Clone)]
pub struct ExponentialDecay<F> {
    gamma: F,
}

impl<F: Float> ExponentialDecay<F> {
    pub fn new(gamma: F) -> Self {
        ExponentialDecay { gamma }
    }
}

impl<F: Float> Scheduler<F> for ExponentialDecay<F> {
    fn step(&mut self, optimizer: &mut dyn Optimizer<F>) {
        let lr = optimizer.learning_rate();
        optimizer.set_learning_rate(lr * self.gamma);
    }
}

/// Multiplies the learning rate by `gamma` every `step_size` iterations
#[derive(Debug, Clone)]
pub struct StepDecay<F> {
    step_size: usize,
    gamma: F,
    n_steps: usize,
}

impl<F: Float> StepDecay<F> {
    /// Fails if `step_size` is zero
    pub fn new(step_size: usize, gamma: F) -> Result<Self> {
        if step_size == 0 {
            return Err(EmbeddingError::InvalidParameter(
                "step size of the schedule should be positive".into(),
            ));
        }

        Ok(StepDecay {
            step_size,
            gamma,
            n_steps: 0,
        })
    }
}

impl<F: Float> Scheduler<F> for StepDecay<F> {
    fn step(&mut self, optimizer: &mut dyn Optimizer<F>) {
        self.n_steps += 1;
        if self.n_steps % self.step_size == 0 {
            let lr = optimizer.learning_rate();
            optimizer.set_learning_rate(lr * self.gamma);
        }
    }
}

/// Learning rate schedule of an embedding
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerKind<F> {
    /// [`LinearDecay`] over `max_iter` iterations
    Linear,
    /// [`ExponentialDecay`]
    Exponential { gamma: F },
    /// [`StepDecay`]
    Step { step_size: usize, gamma: F },
}

impl<F: Float> SchedulerKind<F> {
    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            SchedulerKind::Exponential { gamma } | SchedulerKind::Step { gamma, .. }
                if gamma <= F::zero() || !gamma.is_finite() =>
            {
                Err(EmbeddingError::InvalidParameter(format!(
                    "decay factor {} should be positive",
                    gamma
                )))
            }
            SchedulerKind::Step { step_size, gamma } => StepDecay::new(step_size, gamma).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Creates a scheduler starting from `initial_lr`
    pub fn build(&self, initial_lr: F, max_iter: usize) -> Result<Box<dyn Scheduler<F>>> {
        self.validate()?;

        let scheduler: Box<dyn Scheduler<F>> = match *self {
            SchedulerKind::Linear => Box::new(LinearDecay::new(initial_lr, max_iter)),
            SchedulerKind::Exponential { gamma } => Box::new(ExponentialDecay::new(gamma)),
            SchedulerKind::Step { step_size, gamma } => Box::new(StepDecay::new(step_size, gamma)?),
        };

        Ok(scheduler)
    }
}
