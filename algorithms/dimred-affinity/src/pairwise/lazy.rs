use std::sync::Arc;

use dimred::Float;
use ndarray::{Array1, Array2, Axis};

use super::{check_axis, check_k, LogNormalization, LogSumExp, NormAxis, PairwiseMatrix};
use crate::error::{AffinityError, Result};
use crate::heap_elem::KSmallest;
use crate::kernel::KernelShape;
use crate::metric::Metric;

/// Symbolic expression describing how an entry is derived from the records
#[derive(Debug, Clone)]
enum Expr<F> {
    Cost {
        records: Arc<Array2<F>>,
        metric: Metric,
        zero_diag: bool,
    },
    Transpose(Box<Expr<F>>),
    Kernel {
        inner: Box<Expr<F>>,
        sigma: Arc<Array1<F>>,
        shape: KernelShape<F>,
    },
    Shift {
        inner: Box<Expr<F>>,
        norm: LogNormalization<F>,
    },
    Exp(Box<Expr<F>>),
    Neg(Box<Expr<F>>),
    Symmetrize(Box<Expr<F>>),
    Divide {
        inner: Box<Expr<F>>,
        denom: Arc<Array1<F>>,
        axis: Axis,
    },
}

impl<F: Float> Expr<F> {
    fn eval(&self, i: usize, j: usize) -> F {
        match self {
            Expr::Cost {
                records,
                metric,
                zero_diag,
            } => {
                if *zero_diag && i == j {
                    F::infinity()
                } else {
                    metric.distance(records.row(i), records.row(j))
                }
            }
            Expr::Transpose(inner) => inner.eval(j, i),
            Expr::Kernel {
                inner,
                sigma,
                shape,
            } => {
                let sigma_j = if shape.uses_column_bandwidth() {
                    sigma[j]
                } else {
                    sigma[i]
                };
                shape.log_affinity(inner.eval(i, j), sigma[i], sigma_j)
            }
            Expr::Shift { inner, norm } => inner.eval(i, j) - norm.at(i, j),
            Expr::Exp(inner) => inner.eval(i, j).exp(),
            Expr::Neg(inner) => -inner.eval(i, j),
            Expr::Symmetrize(inner) => (inner.eval(i, j) + inner.eval(j, i)) * F::cast(0.5),
            Expr::Divide { inner, denom, axis } => {
                let d = if axis.index() == 1 { denom[i] } else { denom[j] };
                inner.eval(i, j) / d
            }
        }
    }
}

/// Pairwise matrix whose entries are computed on demand
///
/// Only the records and per-sample vectors (bandwidths, normalizations) are kept in memory.
/// Every reduction streams over all entries and recomputes them, trading compute time for a
/// memory footprint linear in the number of samples.
#[derive(Debug, Clone)]
pub struct LazyMatrix<F> {
    expr: Expr<F>,
    shape: (usize, usize),
}

impl<F: Float> LazyMatrix<F> {
    /// Cost matrix between all pairs of rows of `records`
    ///
    /// With `zero_diag` the diagonal is masked with `+inf`, self-pairs are then excluded from
    /// every neighbour search and receive a zero affinity.
    pub fn from_records(records: Array2<F>, metric: Metric, zero_diag: bool) -> Self {
        let n = records.nrows();
        LazyMatrix {
            expr: Expr::Cost {
                records: Arc::new(records),
                metric,
                zero_diag,
            },
            shape: (n, n),
        }
    }

    fn wrap(self, f: impl FnOnce(Box<Expr<F>>) -> Expr<F>) -> Self {
        LazyMatrix {
            expr: f(Box::new(self.expr)),
            shape: self.shape,
        }
    }

    fn lane_len(&self, axis: Axis) -> usize {
        if axis.index() == 1 {
            self.shape.1
        } else {
            self.shape.0
        }
    }

    /// Entry at position `idx` of lane `lane`, lanes are rows for `Axis(1)`
    fn lane_entry(&self, lane: usize, idx: usize, axis: Axis) -> F {
        if axis.index() == 1 {
            self.expr.eval(lane, idx)
        } else {
            self.expr.eval(idx, lane)
        }
    }
}

impl<F: Float> PairwiseMatrix<F> for LazyMatrix<F> {
    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn get(&self, i: usize, j: usize) -> F {
        self.expr.eval(i, j)
    }

    fn k_min(&self, k: usize, axis: Axis) -> Result<(Array2<F>, Array2<usize>)> {
        check_axis(axis)?;
        let lane_len = self.lane_len(axis);
        check_k(k, lane_len)?;

        let n_lanes = self.lane_len(Axis(1 - axis.index()));
        let mut values = Array2::zeros((n_lanes, k));
        let mut indices = Array2::zeros((n_lanes, k));

        for m in 0..n_lanes {
            let mut selection = KSmallest::new(k);
            for idx in 0..lane_len {
                selection.push(self.lane_entry(m, idx, axis), idx);
            }

            for (n, (val, idx)) in selection.into_sorted().into_iter().enumerate() {
                values[(m, n)] = val;
                indices[(m, n)] = idx;
            }
        }

        Ok((values, indices))
    }

    fn sum_axis(&self, axis: Axis) -> Array1<F> {
        let other = Axis(1 - axis.index().min(1));
        let lane_len = self.lane_len(axis);

        Array1::from_shape_fn(self.lane_len(other), |m| {
            (0..lane_len)
                .map(|idx| self.lane_entry(m, idx, axis))
                .fold(F::zero(), |acc, x| acc + x)
        })
    }

    fn logsumexp(&self, axis: NormAxis) -> Result<LogNormalization<F>> {
        Ok(match axis {
            NormAxis::Joint => {
                let mut acc = LogSumExp::new();
                for i in 0..self.shape.0 {
                    let mut row = LogSumExp::new();
                    for j in 0..self.shape.1 {
                        row.push(self.expr.eval(i, j));
                    }
                    acc.merge(&row);
                }
                LogNormalization::Joint(acc.value())
            }
            NormAxis::Single(ax) => {
                let axis = Axis(ax);
                check_axis(axis)?;
                let lane_len = self.lane_len(axis);
                let reduced = Array1::from_shape_fn(self.lane_len(Axis(1 - ax)), |m| {
                    let mut acc = LogSumExp::new();
                    for idx in 0..lane_len {
                        acc.push(self.lane_entry(m, idx, axis));
                    }
                    acc.value()
                });

                if ax == 1 {
                    LogNormalization::Rows(reduced)
                } else {
                    LogNormalization::Columns(reduced)
                }
            }
        })
    }

    fn transpose(self) -> Self {
        let shape = (self.shape.1, self.shape.0);
        LazyMatrix {
            expr: Expr::Transpose(Box::new(self.expr)),
            shape,
        }
    }

    fn apply_kernel(self, sigma: &Array1<F>, shape: KernelShape<F>) -> Result<Self> {
        shape.check_bandwidth(sigma, self.shape)?;
        let sigma = Arc::new(sigma.clone());

        Ok(self.wrap(|inner| Expr::Kernel {
            inner,
            sigma,
            shape,
        }))
    }

    fn sub_log_normalization(self, norm: &LogNormalization<F>) -> Result<Self> {
        if !norm.len_matches(self.shape) {
            return Err(AffinityError::InvalidParameter(
                "log normalization does not match the matrix shape".into(),
            ));
        }
        let norm = norm.clone();

        Ok(self.wrap(|inner| Expr::Shift { inner, norm }))
    }

    fn exp(self) -> Self {
        self.wrap(Expr::Exp)
    }

    fn neg(self) -> Self {
        self.wrap(Expr::Neg)
    }

    fn symmetrize(self) -> Result<Self> {
        if self.shape.0 != self.shape.1 {
            return Err(AffinityError::ShapeMismatch(
                self.shape,
                (self.shape.1, self.shape.0),
            ));
        }

        Ok(self.wrap(Expr::Symmetrize))
    }

    fn div_axis(self, denom: &Array1<F>, axis: Axis) -> Result<Self> {
        check_axis(axis)?;
        if denom.len() != self.lane_len(Axis(1 - axis.index())) {
            return Err(AffinityError::ShapeMismatch(self.shape, (denom.len(), 1)));
        }
        let denom = Arc::new(denom.clone());

        Ok(self.wrap(|inner| Expr::Divide { inner, denom, axis }))
    }

    fn to_dense(&self) -> Array2<F> {
        Array2::from_shape_fn(self.shape, |(i, j)| self.expr.eval(i, j))
    }
}
