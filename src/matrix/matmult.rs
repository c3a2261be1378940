//! Sparse matrix products: `A · B`, the transpose and Galerkin restriction.
//!
//! The product merges rows with a dense column marker; every result row is
//! computed independently and stored without spare capacity.

use std::borrow::Cow;

use tracing::debug;

use crate::core::traits::BlockEntry;
use crate::error::SparseError;
use crate::matrix::graph::MatrixGraph;
use crate::matrix::sparse::{SparseMatrix, Storage};

const UNMARKED: usize = usize::MAX;

fn general_view(m: &SparseMatrix<f64>) -> Cow<'_, SparseMatrix<f64>> {
    if m.is_symmetric() { Cow::Owned(m.to_general()) } else { Cow::Borrowed(m) }
}

/// Fully used matrix from per-row sorted columns and their values.
fn assemble<TM: BlockEntry>(width: usize, rows: Vec<(Vec<usize>, Vec<TM>)>, storage: Storage) -> SparseMatrix<TM> {
    let (patterns, values): (Vec<Vec<usize>>, Vec<Vec<TM>>) = rows.into_iter().unzip();
    let graph = MatrixGraph::from_row_patterns(width, patterns);
    let mut m = SparseMatrix::with_storage(graph.into(), storage);
    for (dst, src) in m.values.as_mut_slice().iter_mut().zip(values.into_iter().flatten()) {
        *dst = src;
    }
    m
}

/// `A · B`. Symmetric operands are expanded to general storage first.
pub fn mat_mult(a: &SparseMatrix<f64>, b: &SparseMatrix<f64>) -> Result<SparseMatrix<f64>, SparseError> {
    if a.width() != b.height() {
        return Err(SparseError::DimensionMismatch { expected: a.width(), found: b.height() });
    }
    let a = general_view(a);
    let b = general_view(b);
    let width = b.width();
    let mut marker = vec![UNMARKED; width];
    let mut acc = vec![0.0; width];
    let mut rows = Vec::with_capacity(a.height());
    for i in 0..a.height() {
        let mut cols = Vec::new();
        for (&k, &aik) in a.graph().row_indices(i).iter().zip(a.row_values(i)) {
            for (&j, &bkj) in b.graph().row_indices(k).iter().zip(b.row_values(k)) {
                if marker[j] != i {
                    marker[j] = i;
                    acc[j] = 0.0;
                    cols.push(j);
                }
                acc[j] += aik * bkj;
            }
        }
        cols.sort_unstable();
        let vals = cols.iter().map(|&j| acc[j]).collect();
        rows.push((cols, vals));
    }
    let c = assemble(width, rows, Storage::General);
    debug!(rows = c.height(), cols = c.width(), nze = c.nze(), "computed sparse product");
    Ok(c)
}

/// `Aᵀ` in general storage; symmetric matrices are returned expanded.
pub fn transpose<TM: BlockEntry>(a: &SparseMatrix<TM>) -> SparseMatrix<TM> {
    if a.is_symmetric() {
        return a.to_general();
    }
    let mut rows: Vec<(Vec<usize>, Vec<TM>)> = vec![(Vec::new(), Vec::new()); a.width()];
    // rows of A are visited in order, so the columns of Aᵀ stay sorted
    for i in 0..a.height() {
        for (&j, e) in a.graph().row_indices(i).iter().zip(a.row_values(i)) {
            rows[j].0.push(i);
            rows[j].1.push(e.transpose());
        }
    }
    assemble(a.height(), rows, Storage::General)
}

/// Galerkin restriction `Pᵀ A P`.
///
/// For symmetric `A` the result is symmetric and keeps its lower triangle.
pub fn restrict(a: &SparseMatrix<f64>, prol: &SparseMatrix<f64>) -> Result<SparseMatrix<f64>, SparseError> {
    if prol.is_symmetric() {
        return Err(SparseError::Unsupported("prolongation must use general storage"));
    }
    if a.width() != prol.height() {
        return Err(SparseError::DimensionMismatch { expected: a.width(), found: prol.height() });
    }
    let ap = mat_mult(a, prol)?;
    let coarse = mat_mult(&transpose(prol), &ap)?;
    if !a.is_symmetric() {
        return Ok(coarse);
    }
    let rows = (0..coarse.height())
        .map(|i| {
            let cols = coarse.graph().row_indices(i);
            let n = cols.partition_point(|&j| j <= i);
            (cols[..n].to_vec(), coarse.row_values(i)[..n].to_vec())
        })
        .collect();
    Ok(assemble(coarse.width(), rows, Storage::SymmetricLower))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(m: &SparseMatrix<f64>) -> Vec<Vec<f64>> {
        (0..m.height()).map(|i| (0..m.width()).map(|j| m.get(i, j)).collect()).collect()
    }

    fn from_dense(rows: &[&[f64]]) -> SparseMatrix<f64> {
        let width = rows[0].len();
        let mut m = SparseMatrix::with_row_capacities(&vec![width; rows.len()], width);
        for (i, r) in rows.iter().enumerate() {
            for (j, &v) in r.iter().enumerate() {
                if v != 0.0 {
                    *m.entry_mut(i, j).unwrap() = v;
                }
            }
        }
        m
    }

    #[test]
    fn product_matches_dense() {
        let a = from_dense(&[&[1.0, 2.0, 0.0], &[0.0, 0.0, 3.0]]);
        let b = from_dense(&[&[1.0, 0.0], &[0.0, 1.0], &[4.0, 5.0]]);
        let c = mat_mult(&a, &b).unwrap();
        assert_eq!(dense(&c), vec![vec![1.0, 2.0], vec![12.0, 15.0]]);
    }

    #[test]
    fn product_checks_inner_dimension() {
        let a = from_dense(&[&[1.0, 2.0]]);
        assert_eq!(
            mat_mult(&a, &a).err(),
            Some(SparseError::DimensionMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    fn transpose_swaps_indices() {
        let a = from_dense(&[&[1.0, 2.0, 0.0], &[0.0, 0.0, 3.0]]);
        let t = transpose(&a);
        assert_eq!(dense(&t), vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 3.0]]);
    }

    #[test]
    fn restriction_of_symmetric_stays_symmetric() {
        let mut a = SparseMatrix::<f64>::symmetric_with_uniform_capacity(3, 2);
        for i in 0..3 {
            *a.entry_mut(i, i).unwrap() = 2.0;
            if i > 0 {
                *a.entry_mut(i, i - 1).unwrap() = -1.0;
            }
        }
        // aggregate dofs {0, 1} and {2}
        let p = from_dense(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]]);
        let c = restrict(&a, &p).unwrap();
        assert!(c.is_symmetric());
        assert_eq!(dense(&c), vec![vec![2.0, -1.0], vec![-1.0, 2.0]]);
        assert_eq!(c.graph().row_indices(0), &[0]);
    }
}
