// Block-Jacobi preconditioner implementation

use tracing::debug;

use crate::core::traits::MatVec;
use crate::error::SparseError;
use crate::matrix::SparseMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::direct_lu::DenseLu;

/// Block-Jacobi preconditioner: one dense LU per block of dofs.
///
/// Contributions of overlapping blocks add up.
pub struct BlockJacobi {
    size: usize,
    block_factors: Vec<(Vec<usize>, DenseLu)>,
}

impl BlockJacobi {
    /// Factor `A[block, block]` for every block.
    pub fn new(a: &SparseMatrix<f64>, blocks: &[Vec<usize>]) -> Result<Self, SparseError> {
        if a.height() != a.width() {
            return Err(SparseError::DimensionMismatch { expected: a.height(), found: a.width() });
        }
        let factor = |block: &Vec<usize>| -> Result<(Vec<usize>, DenseLu), SparseError> {
            if let Some(&i) = block.iter().find(|&&i| i >= a.height()) {
                return Err(SparseError::DimensionMismatch { expected: a.height(), found: i });
            }
            let lu = DenseLu::new(a.dense_submatrix(block).as_ref())?;
            Ok((block.clone(), lu))
        };
        #[cfg(feature = "rayon")]
        let block_factors = {
            use rayon::prelude::*;
            blocks.par_iter().map(factor).collect::<Result<Vec<_>, _>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let block_factors = blocks.iter().map(factor).collect::<Result<Vec<_>, _>>()?;
        debug!(rows = a.height(), blocks = blocks.len(), "created block jacobi preconditioner");
        Ok(Self { size: a.height(), block_factors })
    }

    pub fn num_blocks(&self) -> usize {
        self.block_factors.len()
    }

    /// Local solutions of every block; blocks are independent.
    fn block_solutions(&self, x: &[f64], transpose: bool) -> Vec<Vec<f64>> {
        let solve = |(indices, lu): &(Vec<usize>, DenseLu)| {
            let mut local: Vec<f64> = indices.iter().map(|&i| x[i]).collect();
            if transpose {
                lu.solve_transpose_in_place(&mut local);
            } else {
                lu.solve_in_place(&mut local);
            }
            local
        };
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.block_factors.par_iter().map(solve).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.block_factors.iter().map(solve).collect()
        }
    }

    fn apply_add(&self, s: f64, x: &[f64], y: &mut [f64], transpose: bool) {
        assert_eq!(x.len(), self.size);
        assert_eq!(y.len(), self.size);
        let solutions = self.block_solutions(x, transpose);
        for ((indices, _), local) in self.block_factors.iter().zip(solutions) {
            for (&i, v) in indices.iter().zip(local) {
                y[i] += s * v;
            }
        }
    }
}

impl MatVec<f64> for BlockJacobi {
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

impl Preconditioner<f64> for BlockJacobi {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn block_solves_exactly_on_block_diagonal() {
        // two uncoupled 2x2 blocks [[4, 1], [1, 3]]
        let els = vec![vec![0, 1], vec![2, 3]];
        let mut a = SparseMatrix::<f64>::from_tables(4, 4, &els, &els);
        for e in &els {
            *a.entry_mut(e[0], e[0]).unwrap() = 4.0;
            *a.entry_mut(e[0], e[1]).unwrap() = 1.0;
            *a.entry_mut(e[1], e[0]).unwrap() = 1.0;
            *a.entry_mut(e[1], e[1]).unwrap() = 3.0;
        }
        let pc = BlockJacobi::new(&a, &els).unwrap();
        assert_eq!(pc.num_blocks(), 2);
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.mult_add(1.0, &x, &mut b);
        let mut z = vec![0.0; 4];
        pc.apply(&b, &mut z).unwrap();
        for (zi, xi) in z.iter().zip(&x) {
            assert_abs_diff_eq!(*zi, *xi, epsilon = 1e-12);
        }
    }

    #[test]
    fn block_out_of_range_is_rejected() {
        let a = SparseMatrix::<f64>::with_uniform_capacity(2, 1);
        assert!(BlockJacobi::new(&a, &[vec![0, 5]]).is_err());
    }
}
