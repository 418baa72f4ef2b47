use dimred::Float;
use ndarray::{Array1, Array2, Axis, Zip};

use super::{check_axis, check_k, LogNormalization, LogSumExp, NormAxis, PairwiseMatrix};
use crate::error::{AffinityError, Result};
use crate::heap_elem::KSmallest;
use crate::kernel::KernelShape;

impl<F: Float> PairwiseMatrix<F> for Array2<F> {
    fn shape(&self) -> (usize, usize) {
        self.dim()
    }

    fn get(&self, i: usize, j: usize) -> F {
        self[(i, j)]
    }

    fn row(&self, i: usize) -> Array1<F> {
        self.index_axis(Axis(0), i).to_owned()
    }

    fn k_min(&self, k: usize, axis: Axis) -> Result<(Array2<F>, Array2<usize>)> {
        check_axis(axis)?;
        // lanes are iterated along the other axis
        let lane_axis = Axis(1 - axis.index());
        let n_lanes = self.len_of(lane_axis);
        check_k(k, self.len_of(axis))?;

        let mut values = Array2::zeros((n_lanes, k));
        let mut indices = Array2::zeros((n_lanes, k));

        for (m, lane) in self.axis_iter(lane_axis).enumerate() {
            let mut selection = KSmallest::new(k);
            for (idx, val) in lane.iter().enumerate() {
                selection.push(*val, idx);
            }

            for (n, (val, idx)) in selection.into_sorted().into_iter().enumerate() {
                values[(m, n)] = val;
                indices[(m, n)] = idx;
            }
        }

        Ok((values, indices))
    }

    fn sum_axis(&self, axis: Axis) -> Array1<F> {
        ndarray::ArrayBase::sum_axis(self, axis)
    }

    fn logsumexp(&self, axis: NormAxis) -> Result<LogNormalization<F>> {
        Ok(match axis {
            NormAxis::Joint => {
                let mut acc = LogSumExp::new();
                self.iter().for_each(|val| acc.push(*val));
                LogNormalization::Joint(acc.value())
            }
            NormAxis::Single(ax) => {
                check_axis(Axis(ax))?;
                let reduced = self.map_axis(Axis(ax), |lane| {
                    let mut acc = LogSumExp::new();
                    lane.iter().for_each(|val| acc.push(*val));
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
        self.reversed_axes().as_standard_layout().into_owned()
    }

    fn apply_kernel(mut self, sigma: &Array1<F>, shape: KernelShape<F>) -> Result<Self> {
        shape.check_bandwidth(sigma, self.dim())?;

        let column_bandwidth = shape.uses_column_bandwidth();
        Zip::indexed(&mut self).for_each(|(i, j), val| {
            let sigma_j = if column_bandwidth { sigma[j] } else { sigma[i] };
            *val = shape.log_affinity(*val, sigma[i], sigma_j);
        });

        Ok(self)
    }

    fn sub_log_normalization(mut self, norm: &LogNormalization<F>) -> Result<Self> {
        if !norm.len_matches(self.dim()) {
            return Err(AffinityError::InvalidParameter(
                "log normalization does not match the matrix shape".into(),
            ));
        }

        Zip::indexed(&mut self).for_each(|(i, j), val| *val -= norm.at(i, j));

        Ok(self)
    }

    fn exp(mut self) -> Self {
        self.mapv_inplace(|x| x.exp());
        self
    }

    fn neg(mut self) -> Self {
        self.mapv_inplace(|x| -x);
        self
    }

    fn symmetrize(self) -> Result<Self> {
        let (n_rows, n_cols) = self.dim();
        if n_rows != n_cols {
            return Err(AffinityError::ShapeMismatch(
                (n_rows, n_cols),
                (n_cols, n_rows),
            ));
        }

        Ok((&self + &self.t()) * F::cast(0.5))
    }

    fn div_axis(mut self, denom: &Array1<F>, axis: Axis) -> Result<Self> {
        check_axis(axis)?;
        let lane_axis = Axis(1 - axis.index());
        if denom.len() != self.len_of(lane_axis) {
            return Err(AffinityError::ShapeMismatch(self.dim(), (denom.len(), 1)));
        }

        for (mut lane, d) in self.axis_iter_mut(lane_axis).zip(denom.iter()) {
            lane /= *d;
        }

        Ok(self)
    }

    fn to_dense(&self) -> Array2<F> {
        self.clone()
    }
}
