use dimred::Float;
use ndarray::{Array1, Array2, Axis};
use sprs::{CsMat, CsVecView};

use super::{check_axis, check_k, LogNormalization, LogSumExp, NormAxis, PairwiseMatrix};
use crate::error::{AffinityError, Result};
use crate::heap_elem::KSmallest;
use crate::kernel::KernelShape;

/// Pairwise matrix with a sparse set of stored entries in CSR layout
///
/// All entries which are not stored take the implicit `fill` value. A k-nearest-neighbour cost
/// graph uses `+inf`, which turns into `-inf` after a log-domain kernel and into `0` after the
/// exponential. Transformations that would make absent entries depend on their position fail
/// with [`AffinityError::UnsupportedBackend`].
#[derive(Debug, Clone)]
pub struct SparseMatrix<F> {
    inner: CsMat<F>,
    fill: F,
}

impl<F: Float> SparseMatrix<F> {
    /// Wraps a matrix of stored entries, a CSC matrix is converted to CSR
    pub fn new(inner: CsMat<F>, fill: F) -> Self {
        let inner = if inner.is_csr() {
            inner
        } else {
            inner.to_other_storage()
        };

        SparseMatrix { inner, fill }
    }

    /// Builds a matrix from the stored entries of every row
    ///
    /// Entries of a row may come in any order but every column index has to be unique.
    pub fn from_rows(shape: (usize, usize), rows: Vec<Vec<(usize, F)>>, fill: F) -> Result<Self> {
        if rows.len() != shape.0 {
            return Err(AffinityError::ShapeMismatch(shape, (rows.len(), shape.1)));
        }

        let nnz = rows.iter().map(|row| row.len()).sum();
        let mut indptr = Vec::with_capacity(shape.0 + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);

        for mut row in rows {
            // sort by indices
            row.sort_unstable_by_key(|(j, _)| *j);
            let mut prev = None;
            for (j, val) in row {
                if j >= shape.1 || prev == Some(j) {
                    return Err(AffinityError::InvalidParameter(format!(
                        "invalid or duplicated column index {}",
                        j
                    )));
                }
                prev = Some(j);
                indices.push(j);
                data.push(val);
            }
            indptr.push(indices.len());
        }

        Ok(SparseMatrix {
            inner: CsMat::new(shape, indptr, indices, data),
            fill,
        })
    }

    /// Value of all entries which are not stored
    pub fn fill(&self) -> F {
        self.fill
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    /// The underlying CSR matrix of stored entries
    pub fn inner(&self) -> &CsMat<F> {
        &self.inner
    }

    /// Whether entry `(i, j)` is stored
    pub fn is_stored(&self, i: usize, j: usize) -> bool {
        self.inner.get(i, j).is_some()
    }

    fn transposed(&self) -> Self {
        SparseMatrix {
            inner: self.inner.transpose_view().to_other_storage(),
            fill: self.fill,
        }
    }

    /// Rebuilds the matrix with every stored entry replaced by `f(i, j, value)`
    fn map_stored(self, fill: F, f: impl Fn(usize, usize, F) -> F) -> Self {
        let shape = self.inner.shape();
        let mut data = Vec::with_capacity(self.inner.nnz());
        for (i, row) in self.inner.outer_iterator().enumerate() {
            for (j, val) in row.iter() {
                data.push(f(i, j, *val));
            }
        }

        let (indptr, indices, _) = self.inner.into_raw_storage();
        SparseMatrix {
            inner: CsMat::new(shape, indptr, indices, data),
            fill,
        }
    }

    fn row_logsumexp(&self, row: CsVecView<F>) -> LogSumExp<F> {
        let mut acc = LogSumExp::new();
        for (_, val) in row.iter() {
            acc.push(*val);
        }
        acc.push_weighted(self.fill, F::cast(self.inner.cols() - row.nnz()));
        acc
    }

    fn unsupported(&self, op: &str) -> AffinityError {
        AffinityError::UnsupportedBackend(format!(
            "{} of a sparse matrix with implicit value {}",
            op, self.fill
        ))
    }
}

impl<F: Float> PairwiseMatrix<F> for SparseMatrix<F> {
    fn shape(&self) -> (usize, usize) {
        self.inner.shape()
    }

    fn get(&self, i: usize, j: usize) -> F {
        self.inner.get(i, j).copied().unwrap_or(self.fill)
    }

    fn row(&self, i: usize) -> Array1<F> {
        let mut row = Array1::from_elem(self.inner.cols(), self.fill);
        if let Some(stored) = self.inner.outer_view(i) {
            for (j, val) in stored.iter() {
                row[j] = *val;
            }
        }
        row
    }

    fn k_min(&self, k: usize, axis: Axis) -> Result<(Array2<F>, Array2<usize>)> {
        check_axis(axis)?;
        if axis == Axis(0) {
            return self.transposed().k_min(k, Axis(1));
        }

        let (n_rows, n_cols) = self.inner.shape();
        check_k(k, n_cols)?;

        let mut values = Array2::zeros((n_rows, k));
        let mut indices = Array2::zeros((n_rows, k));

        for (m, row) in self.inner.outer_iterator().enumerate() {
            let mut selection = KSmallest::new(k);
            for (idx, val) in row.iter() {
                selection.push(*val, idx);
            }

            // at most `k` absent entries can make it into the selection
            let mut stored = row.indices().iter().peekable();
            let mut absent = 0;
            for idx in 0..n_cols {
                if absent == k {
                    break;
                }
                if stored.peek() == Some(&&idx) {
                    stored.next();
                    continue;
                }
                selection.push(self.fill, idx);
                absent += 1;
            }

            for (n, (val, idx)) in selection.into_sorted().into_iter().enumerate() {
                values[(m, n)] = val;
                indices[(m, n)] = idx;
            }
        }

        Ok((values, indices))
    }

    fn sum_axis(&self, axis: Axis) -> Array1<F> {
        if axis == Axis(0) {
            return self.transposed().sum_axis(Axis(1));
        }

        let n_cols = self.inner.cols();
        self.inner
            .outer_iterator()
            .map(|row| {
                let stored = row.iter().fold(F::zero(), |acc, (_, val)| acc + *val);
                let absent = n_cols - row.nnz();
                if absent > 0 {
                    stored + self.fill * F::cast(absent)
                } else {
                    stored
                }
            })
            .collect()
    }

    fn logsumexp(&self, axis: NormAxis) -> Result<LogNormalization<F>> {
        if let NormAxis::Single(ax) = axis {
            check_axis(Axis(ax))?;
        }

        Ok(match axis {
            NormAxis::Joint => {
                let mut acc = LogSumExp::new();
                for row in self.inner.outer_iterator() {
                    acc.merge(&self.row_logsumexp(row));
                }
                LogNormalization::Joint(acc.value())
            }
            NormAxis::Single(0) => {
                let transposed = self.transposed();
                LogNormalization::Columns(
                    transposed
                        .inner
                        .outer_iterator()
                        .map(|col| transposed.row_logsumexp(col).value())
                        .collect(),
                )
            }
            NormAxis::Single(_) => LogNormalization::Rows(
                self.inner
                    .outer_iterator()
                    .map(|row| self.row_logsumexp(row).value())
                    .collect(),
            ),
        })
    }

    fn transpose(self) -> Self {
        self.transposed()
    }

    fn apply_kernel(self, sigma: &Array1<F>, shape: KernelShape<F>) -> Result<Self> {
        shape.check_bandwidth(sigma, self.shape())?;
        if self.fill != F::infinity() {
            return Err(self.unsupported("kernel evaluation"));
        }

        let column_bandwidth = shape.uses_column_bandwidth();
        Ok(self.map_stored(F::neg_infinity(), |i, j, val| {
            let sigma_j = if column_bandwidth { sigma[j] } else { sigma[i] };
            shape.log_affinity(val, sigma[i], sigma_j)
        }))
    }

    fn sub_log_normalization(self, norm: &LogNormalization<F>) -> Result<Self> {
        if !norm.len_matches(self.shape()) {
            return Err(AffinityError::InvalidParameter(
                "log normalization does not match the matrix shape".into(),
            ));
        }

        let fill = match norm {
            _ if self.fill.is_infinite() => self.fill,
            LogNormalization::Joint(val) => self.fill - *val,
            _ => return Err(self.unsupported("row-wise normalization")),
        };

        Ok(self.map_stored(fill, |i, j, val| val - norm.at(i, j)))
    }

    fn exp(mut self) -> Self {
        self.inner.map_inplace(|x| x.exp());
        self.fill = self.fill.exp();
        self
    }

    fn neg(mut self) -> Self {
        self.inner.map_inplace(|x| -*x);
        self.fill = -self.fill;
        self
    }

    fn symmetrize(self) -> Result<Self> {
        let shape = self.inner.shape();
        if shape.0 != shape.1 {
            return Err(AffinityError::ShapeMismatch(shape, (shape.1, shape.0)));
        }

        let half = F::cast(0.5);
        let fill = self.fill;
        let transposed = self.transposed();

        let mut indptr = Vec::with_capacity(shape.0 + 1);
        let mut indices = Vec::with_capacity(2 * self.inner.nnz());
        let mut data = Vec::with_capacity(2 * self.inner.nnz());
        indptr.push(0);

        // merge the sorted rows of A and A^t
        for (left, right) in self
            .inner
            .outer_iterator()
            .zip(transposed.inner.outer_iterator())
        {
            let mut left = left.iter().peekable();
            let mut right = right.iter().peekable();
            loop {
                let (j, a, b) = match (left.peek().copied(), right.peek().copied()) {
                    (Some((jl, a)), Some((jr, b))) if jl == jr => {
                        left.next();
                        right.next();
                        (jl, *a, *b)
                    }
                    (Some((jl, a)), Some((jr, _))) if jl < jr => {
                        left.next();
                        (jl, *a, fill)
                    }
                    (Some((jl, a)), None) => {
                        left.next();
                        (jl, *a, fill)
                    }
                    (_, Some((jr, b))) => {
                        right.next();
                        (jr, fill, *b)
                    }
                    (None, None) => break,
                };
                indices.push(j);
                data.push((a + b) * half);
            }
            indptr.push(indices.len());
        }

        Ok(SparseMatrix {
            inner: CsMat::new(shape, indptr, indices, data),
            fill,
        })
    }

    fn div_axis(self, denom: &Array1<F>, axis: Axis) -> Result<Self> {
        check_axis(axis)?;
        let (n_rows, n_cols) = self.shape();
        let expected = if axis == Axis(1) { n_rows } else { n_cols };
        if denom.len() != expected {
            return Err(AffinityError::ShapeMismatch(
                (n_rows, n_cols),
                (denom.len(), 1),
            ));
        }
        if self.fill != F::zero() {
            return Err(self.unsupported("division"));
        }

        Ok(self.map_stored(F::zero(), |i, j, val| {
            if axis == Axis(1) {
                val / denom[i]
            } else {
                val / denom[j]
            }
        }))
    }

    fn to_dense(&self) -> Array2<F> {
        let mut dense = Array2::from_elem(self.inner.shape(), self.fill);
        for (i, row) in self.inner.outer_iterator().enumerate() {
            for (j, val) in row.iter() {
                dense[(i, j)] = *val;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Axis};

    use super::*;

    /// Every sample keeps its two closest neighbours
    fn knn_cost() -> SparseMatrix<f64> {
        SparseMatrix::from_rows(
            (4, 4),
            vec![
                vec![(2, 4.0), (1, 1.0)],
                vec![(0, 1.0), (2, 5.0)],
                vec![(0, 4.0), (1, 5.0)],
                vec![(2, 9.0), (1, 13.0)],
            ],
            f64::INFINITY,
        )
        .unwrap()
    }

    #[test]
    fn absent_entries_take_the_fill_value() {
        let cost = knn_cost();
        assert_eq!(cost.nnz(), 8);
        assert_eq!(cost.get(0, 1), 1.0);
        assert_eq!(cost.get(0, 3), f64::INFINITY);
        assert_eq!(cost.row(3), arr1(&[f64::INFINITY, 13.0, 9.0, f64::INFINITY]));
        assert_eq!(cost.to_dense().row(0), arr1(&[f64::INFINITY, 1.0, 4.0, f64::INFINITY]));
    }

    #[test]
    fn csc_storage_is_converted() {
        // column 0 holds (1, 0) = 1, column 1 holds (0, 1) = 2 and (2, 1) = 3
        let csc = CsMat::new_csc((3, 2), vec![0, 1, 3], vec![1, 0, 2], vec![1.0, 2.0, 3.0]);
        let sparse = SparseMatrix::new(csc, 0.0);

        assert!(sparse.inner().is_csr());
        assert_eq!(sparse.nnz(), 3);
        assert_eq!(
            sparse.to_dense(),
            arr2(&[[0.0, 2.0], [1.0, 0.0], [0.0, 3.0]])
        );
        assert_abs_diff_eq!(sparse.sum_axis(Axis(1)), arr1(&[2.0, 1.0, 3.0]));
    }

    #[test]
    fn rejects_duplicated_columns() {
        assert!(SparseMatrix::from_rows((1, 3), vec![vec![(1, 1.0), (1, 2.0)]], 0.0).is_err());
        assert!(SparseMatrix::from_rows((1, 3), vec![vec![(3, 1.0)]], 0.0).is_err());
    }

    #[test]
    fn k_min_matches_dense() {
        let cost = knn_cost();
        let dense = cost.to_dense();

        for axis in &[Axis(0), Axis(1)] {
            let (sv, si) = cost.k_min(2, *axis).unwrap();
            let (dv, di) = dense.k_min(2, *axis).unwrap();
            assert_eq!(sv, dv);
            assert_eq!(si, di);
        }

        // absent entries are selected once the stored ones are exhausted
        let (values, indices) = cost.k_min(3, Axis(1)).unwrap();
        assert_eq!(values.row(0), arr1(&[1.0, 4.0, f64::INFINITY]));
        assert_eq!(indices.row(0), arr1(&[1, 2, 0]));
    }

    #[test]
    fn kernel_normalization_and_exp() {
        let sigma = arr1(&[1.0, 1.0, 2.0, 3.0]);
        let sparse = knn_cost()
            .apply_kernel(&sigma, KernelShape::Magic)
            .unwrap();
        assert_eq!(sparse.fill(), f64::NEG_INFINITY);
        let dense = knn_cost()
            .to_dense()
            .apply_kernel(&sigma, KernelShape::Magic)
            .unwrap();

        let norm = sparse.logsumexp(NormAxis::Single(1)).unwrap();
        let sparse = sparse.sub_log_normalization(&norm).unwrap().exp();
        let dense = dense.sub_log_normalization(&norm).unwrap();
        let dense = PairwiseMatrix::exp(dense);

        assert_eq!(sparse.fill(), 0.0);
        assert_abs_diff_eq!(sparse.to_dense(), dense, epsilon = 1e-12);
        assert_abs_diff_eq!(sparse.sum_axis(Axis(1)), arr1(&[1.0; 4]), epsilon = 1e-12);
    }

    #[test]
    fn symmetrize_merges_both_patterns() {
        let affinity = SparseMatrix::from_rows(
            (3, 3),
            vec![vec![(1, 2.0)], vec![(0, 4.0), (2, 1.0)], vec![]],
            0.0,
        )
        .unwrap();
        let sym = affinity.symmetrize().unwrap();

        assert_abs_diff_eq!(
            sym.to_dense(),
            arr2(&[[0.0, 3.0, 0.0], [3.0, 0.0, 0.5], [0.0, 0.5, 0.0]])
        );
        assert_eq!(sym.nnz(), 4);

        let sums = sym.sum_axis(Axis(1));
        let normalized = sym.div_axis(&sums, Axis(1)).unwrap();
        assert_abs_diff_eq!(normalized.sum_axis(Axis(1)), arr1(&[1.0; 3]), epsilon = 1e-12);
    }

    #[test]
    fn position_dependent_fill_is_rejected() {
        let cost = knn_cost();
        assert!(matches!(
            cost.clone().div_axis(&arr1(&[1.0; 4]), Axis(1)),
            Err(AffinityError::UnsupportedBackend(_))
        ));

        let log_affinity = cost.neg();
        let norm = LogNormalization::Rows(arr1(&[0.0; 4]));
        assert!(log_affinity.sub_log_normalization(&norm).is_ok());

        let shifted = SparseMatrix::from_rows((2, 2), vec![vec![], vec![]], 1.0).unwrap();
        assert!(matches!(
            shifted.sub_log_normalization(&LogNormalization::Rows(arr1(&[0.0, 1.0]))),
            Err(AffinityError::UnsupportedBackend(_))
        ));
    }
}
