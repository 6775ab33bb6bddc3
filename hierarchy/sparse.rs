use crate::types::HierarchyError;
use faer::sparse::{SparseColMat, Triplet};
use ndarray::{Array2, ArrayView2};

/// Sparse leaf-to-layer transformation, stored column-major.
///
/// Row `i` is a code of the universe, column `j` a member of the layer. Suppressed
/// duplicates are kept as explicit zeros so that `nnz` still counts one stored entry
/// per contributing code.
#[derive(Debug, Clone)]
pub struct TransformMatrix {
    inner: SparseColMat<usize, f64>,
}

impl TransformMatrix {
    /// Builds the matrix from `(row, column, value)` entries. Repeated coordinates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        entries: &[(usize, usize, f64)],
    ) -> Result<Self, HierarchyError> {
        let triplets: Vec<Triplet<usize, usize, f64>> = entries
            .iter()
            .map(|&(row, col, val)| Triplet::new(row, col, val))
            .collect();
        let inner = SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
            .map_err(|e| HierarchyError::MatrixConstruction(format!("{e:?}")))?;
        Ok(Self { inner })
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    /// Number of stored entries, explicit zeros included.
    pub fn nnz(&self) -> usize {
        let (symbolic, _) = self.inner.as_ref().parts();
        symbolic.row_idx().len()
    }

    /// Stored `(row, column, value)` entries in column-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let (symbolic, values) = self.inner.as_ref().parts();
        let col_ptr = symbolic.col_ptr();
        let row_idx = symbolic.row_idx();
        (0..self.ncols()).flat_map(move |col| {
            (col_ptr[col]..col_ptr[col + 1]).map(move |idx| (row_idx[idx], col, values[idx]))
        })
    }

    /// The stored value at `(row, col)`, or `None` when nothing is stored there.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.entries()
            .find(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, value)| value)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.nrows(), self.ncols()));
        for (row, col, value) in self.entries() {
            dense[[row, col]] += value;
        }
        dense
    }

    /// Computes `labels · self` for a batch-major label matrix.
    ///
    /// The caller guarantees `labels.ncols() == self.nrows()`.
    pub(crate) fn left_multiply(&self, labels: ArrayView2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((labels.nrows(), self.ncols()));
        for (row, col, value) in self.entries() {
            if value != 0.0 {
                out.column_mut(col).scaled_add(value, &labels.column(row));
            }
        }
        out
    }
}
