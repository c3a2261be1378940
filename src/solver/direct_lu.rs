//! Direct dense solves with faer's full-pivot LU.
//!
//! `DenseLu` factors one dense block. `DenseInverse` is the inverse of a
//! sparse matrix restricted to a subset of its dofs, applied through the
//! cached factorization.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, MatMut, MatRef};
use tracing::debug;

use crate::core::traits::MatVec;
use crate::error::SparseError;
use crate::matrix::SparseMatrix;
use crate::preconditioner::Preconditioner;
use crate::utils::BitArray;

/// Cached LU factorization of a square dense block.
pub struct DenseLu {
    factor: FullPivLu<f64>,
    n: usize,
}

impl DenseLu {
    /// Factor `a`; a singular block is reported as a factor error.
    pub fn new(a: MatRef<'_, f64>) -> Result<Self, SparseError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(SparseError::DimensionMismatch { expected: n, found: a.ncols() });
        }
        let lu = DenseLu { factor: FullPivLu::new(a), n };
        // a zero pivot shows up as a non-finite solution
        let mut probe = vec![1.0; n];
        lu.solve_in_place(&mut probe);
        if probe.iter().any(|v| !v.is_finite()) {
            return Err(SparseError::FactorError(format!("singular {}x{} block", n, n)));
        }
        Ok(lu)
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// x ← A⁻¹ x
    pub fn solve_in_place(&self, x: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        let x_mat = MatMut::from_column_major_slice_mut(x, self.n, 1);
        self.factor.solve_in_place_with_conj(Conj::No, x_mat);
    }

    /// x ← A⁻ᵀ x
    pub fn solve_transpose_in_place(&self, x: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        let x_mat = MatMut::from_column_major_slice_mut(x, self.n, 1);
        self.factor.solve_transpose_in_place_with_conj(Conj::No, x_mat);
    }
}

/// Inverse of `A[dofs, dofs]`, acting as zero outside `dofs`.
pub struct DenseInverse {
    size: usize,
    dofs: Vec<usize>,
    lu: DenseLu,
}

impl DenseInverse {
    /// Inverse on the rows selected by `subset`, or on all rows.
    pub fn new(a: &SparseMatrix<f64>, subset: Option<&BitArray>) -> Result<Self, SparseError> {
        let dofs: Vec<usize> = match subset {
            Some(b) => b.iter_ones().filter(|&i| i < a.height()).collect(),
            None => (0..a.height()).collect(),
        };
        Self::on_dofs(a, dofs)
    }

    /// Inverse on the dofs with a non-zero cluster number, ordered by cluster.
    pub fn from_clusters(a: &SparseMatrix<f64>, clusters: &[usize]) -> Result<Self, SparseError> {
        if clusters.len() != a.height() {
            return Err(SparseError::DimensionMismatch { expected: a.height(), found: clusters.len() });
        }
        let mut dofs: Vec<usize> = (0..clusters.len()).filter(|&i| clusters[i] != 0).collect();
        dofs.sort_by_key(|&i| clusters[i]);
        Self::on_dofs(a, dofs)
    }

    fn on_dofs(a: &SparseMatrix<f64>, dofs: Vec<usize>) -> Result<Self, SparseError> {
        if a.height() != a.width() {
            return Err(SparseError::DimensionMismatch { expected: a.height(), found: a.width() });
        }
        let lu = DenseLu::new(a.dense_submatrix(&dofs).as_ref())?;
        debug!(rows = a.height(), dofs = dofs.len(), "factored dense inverse");
        Ok(Self { size: a.height(), dofs, lu })
    }

    /// Rows the inverse acts on.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    fn apply_add(&self, s: f64, x: &[f64], y: &mut [f64], transpose: bool) {
        assert_eq!(x.len(), self.size);
        assert_eq!(y.len(), self.size);
        let mut local: Vec<f64> = self.dofs.iter().map(|&i| x[i]).collect();
        if transpose {
            self.lu.solve_transpose_in_place(&mut local);
        } else {
            self.lu.solve_in_place(&mut local);
        }
        for (&i, v) in self.dofs.iter().zip(local) {
            y[i] += s * v;
        }
    }
}

impl MatVec<f64> for DenseInverse {
    fn height(&self) -> usize {
        self.size
    }

    fn width(&self) -> usize {
        self.size
    }

    fn mult_add(&self, s: f64, x: &[f64], y: &mut [f64]) {
        self.apply_add(s, x, y, false);
    }

    fn mult_trans_add(&self, s: f64, x: &[f64], y: &mut [f64]) {
        self.apply_add(s, x, y, true);
    }
}

impl Preconditioner<f64> for DenseInverse {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use faer::Mat;

    #[test]
    fn lu_solves_dense_system() {
        // 3x3 system: [[2,1,1],[1,3,2],[1,0,0]] x = [4,5,6]
        // True solution: [6,15,-23]
        let a = Mat::from_fn(3, 3, |i, j| match (i, j) {
            (0, 0) => 2.0, (0, 1) => 1.0, (0, 2) => 1.0,
            (1, 0) => 1.0, (1, 1) => 3.0, (1, 2) => 2.0,
            (2, 0) => 1.0,
            _ => 0.0,
        });
        let lu = DenseLu::new(a.as_ref()).unwrap();
        let mut x = vec![4.0, 5.0, 6.0];
        lu.solve_in_place(&mut x);
        for (xi, ei) in x.iter().zip([6.0, 15.0, -23.0]) {
            assert_abs_diff_eq!(*xi, ei, epsilon = 1e-10);
        }
    }

    #[test]
    fn singular_block_is_rejected() {
        let a = Mat::from_fn(2, 2, |i, _| if i == 0 { 1.0 } else { 0.0 });
        assert!(matches!(DenseLu::new(a.as_ref()), Err(SparseError::FactorError(_))));
    }

    #[test]
    fn inverse_on_subset_leaves_other_rows() {
        let mut a = SparseMatrix::<f64>::with_uniform_capacity(3, 1);
        for i in 0..3 {
            *a.entry_mut(i, i).unwrap() = (i + 1) as f64;
        }
        let inv = DenseInverse::new(&a, Some(&BitArray::from_indices(3, [0, 2]))).unwrap();
        let mut y = vec![10.0; 3];
        inv.mult_add(1.0, &[1.0, 1.0, 3.0], &mut y);
        assert_abs_diff_eq!(y[0], 11.0, epsilon = 1e-12);
        assert_eq!(y[1], 10.0);
        assert_abs_diff_eq!(y[2], 11.0, epsilon = 1e-12);
    }
}
