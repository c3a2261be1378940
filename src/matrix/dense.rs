//! Dense faer copies of sparse matrices and of their principal submatrices.

use faer::Mat;

use crate::matrix::sparse::SparseMatrix;

const NOT_SELECTED: usize = usize::MAX;

impl SparseMatrix<f64> {
    /// Dense copy; symmetric storage is mirrored.
    pub fn to_dense(&self) -> Mat<f64> {
        let all: Vec<usize> = (0..self.height()).collect();
        if self.height() == self.width() {
            return self.dense_submatrix(&all);
        }
        let mut m = Mat::<f64>::zeros(self.height(), self.width());
        for i in 0..self.height() {
            for (&j, &v) in self.graph().row_indices(i).iter().zip(self.row_values(i)) {
                m[(i, j)] = v;
            }
        }
        m
    }

    /// Dense principal submatrix `A[dofs, dofs]`, in the order of `dofs`.
    pub fn dense_submatrix(&self, dofs: &[usize]) -> Mat<f64> {
        let n = dofs.len();
        let mut local = vec![NOT_SELECTED; self.width()];
        for (l, &d) in dofs.iter().enumerate() {
            local[d] = l;
        }
        let mut m = Mat::<f64>::zeros(n, n);
        for (li, &i) in dofs.iter().enumerate() {
            for (&j, &v) in self.graph().row_indices(i).iter().zip(self.row_values(i)) {
                let lj = local[j];
                if lj == NOT_SELECTED {
                    continue;
                }
                m[(li, lj)] = v;
                if self.is_symmetric() && j != i {
                    m[(lj, li)] = v;
                }
            }
        }
        m
    }
}
