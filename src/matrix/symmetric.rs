//! Operations of lower-triangular symmetric storage.
//!
//! The product with the full symmetric matrix is split into two passes:
//! `s L x` over the strictly lower part, then `s (D + Lᵀ) x` by scattering
//! every stored row into its mirrored column. In a lower-triangular row the
//! diagonal, when stored, is always the last used slot.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::core::traits::{BlockEntry, EntryMul, VecEntry};
use crate::error::SparseError;
use crate::matrix::graph::MatrixGraph;
use crate::matrix::sparse::{SparseMatrix, Storage};
use crate::parallel::Exec;
use crate::utils::BitArray;

#[inline]
fn selected(inner: Option<&BitArray>, i: usize) -> bool {
    inner.is_none_or(|b| b.test(i))
}

/// Row `i` takes part in a restricted pass.
#[inline]
fn row_active(inner: Option<&BitArray>, cluster: Option<&[usize]>, i: usize) -> bool {
    selected(inner, i) && cluster.is_none_or(|cl| cl[i] != 0)
}

/// The coupling of active row `i` with column `c` contributes.
#[inline]
fn couples(inner: Option<&BitArray>, cluster: Option<&[usize]>, i: usize, c: usize) -> bool {
    selected(inner, c) && cluster.is_none_or(|cl| cl[c] == cl[i])
}

impl<TM: BlockEntry> SparseMatrix<TM> {
    /// Used slots of `row` without the diagonal.
    #[inline]
    fn off_diagonal_range(&self, row: usize) -> Range<usize> {
        let mut range = self.graph.row_range(row);
        if self.graph.row_indices(row).last() == Some(&row) {
            range.end -= 1;
        }
        range
    }

    /// `row_times_vector` without the diagonal entry of `row`.
    pub fn row_times_vector_no_diag<V>(&self, row: usize, x: &[V]) -> V
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        let range = self.off_diagonal_range(row);
        let cols = &self.graph.col_indices()[range.clone()];
        let vals = &self.values.as_slice()[range];
        let mut sum = V::zero();
        for (&c, e) in cols.iter().zip(vals) {
            sum += e.mul_vec(&x[c]);
        }
        sum
    }

    /// `add_row_trans_to_vector` without the diagonal entry of `row`.
    pub fn add_row_trans_to_vector_no_diag<V>(&self, row: usize, el: V, y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        let range = self.off_diagonal_range(row);
        let cols = &self.graph.col_indices()[range.clone()];
        let vals = &self.values.as_slice()[range];
        for (&c, e) in cols.iter().zip(vals) {
            y[c] += e.trans_mul_vec(&el);
        }
    }

    fn check_square_lengths<V>(&self, x: &[V], y: &[V]) {
        assert_eq!(x.len(), self.width(), "x length must equal the matrix width");
        assert_eq!(y.len(), self.height(), "y length must equal the matrix height");
    }

    fn check_cluster_length(&self, cluster: Option<&[usize]>) {
        if let Some(cl) = cluster {
            assert_eq!(cl.len(), self.height(), "one cluster number per row");
        }
    }

    /// Pass 1: y += s · L · x, `L` the strictly lower part.
    ///
    /// With `inner`, only couplings between two selected dofs contribute.
    /// With `cluster`, only couplings inside one non-zero cluster do; dofs
    /// of cluster 0 take no part.
    pub fn mult_add_strict_lower<V, E>(
        &self,
        exec: &E,
        s: V::Scalar,
        x: &[V],
        y: &mut [V],
        inner: Option<&BitArray>,
        cluster: Option<&[usize]>,
    ) where
        TM: EntryMul<V>,
        V: VecEntry,
        E: Exec,
    {
        self.check_square_lengths(x, y);
        self.check_cluster_length(cluster);
        let restricted = inner.is_some() || cluster.is_some();
        exec.for_each_range(self.graph.balancing(), y, |rows, chunk| {
            for (i, yi) in rows.zip(chunk.iter_mut()) {
                if !restricted {
                    *yi += self.row_times_vector_no_diag(i, x).scale(s);
                    continue;
                }
                if !row_active(inner, cluster, i) {
                    continue;
                }
                let range = self.off_diagonal_range(i);
                let mut sum = V::zero();
                for pos in range {
                    let c = self.graph.col_indices()[pos];
                    if couples(inner, cluster, i, c) {
                        sum += self.values[pos].mul_vec(&x[c]);
                    }
                }
                *yi += sum.scale(s);
            }
        });
    }

    /// Pass 2: y += s · (D + Lᵀ) · x, with the same restrictions as pass 1.
    ///
    /// Rows scatter into columns of other ranges, so every range accumulates
    /// into a private buffer.
    pub fn mult_add_diag_upper<V, E>(
        &self,
        exec: &E,
        s: V::Scalar,
        x: &[V],
        y: &mut [V],
        inner: Option<&BitArray>,
        cluster: Option<&[usize]>,
    ) where
        TM: EntryMul<V>,
        V: VecEntry,
        E: Exec,
    {
        self.check_square_lengths(x, y);
        self.check_cluster_length(cluster);
        let restricted = inner.is_some() || cluster.is_some();
        exec.scatter_ranges(self.graph.balancing(), y, |rows, buf| {
            for i in rows {
                if !restricted {
                    self.add_row_trans_to_vector(i, x[i].scale(s), buf);
                    continue;
                }
                if !row_active(inner, cluster, i) {
                    continue;
                }
                let el = x[i].scale(s);
                for pos in self.graph.row_range(i) {
                    let c = self.graph.col_indices()[pos];
                    if couples(inner, cluster, i, c) {
                        buf[c] += self.values[pos].trans_mul_vec(&el);
                    }
                }
            }
        });
    }

    /// `self += s * other` for symmetric matrices.
    ///
    /// Every stored position of `other` must exist here; otherwise the first
    /// missing one is reported and no value changes.
    pub fn add_merge(&mut self, s: TM::Scalar, other: &SparseMatrix<TM>) -> Result<(), SparseError> {
        if self.storage != Storage::SymmetricLower || other.storage != Storage::SymmetricLower {
            return Err(SparseError::Unsupported("add_merge needs two symmetric matrices"));
        }
        if self.height() != other.height() {
            return Err(SparseError::DimensionMismatch { expected: self.height(), found: other.height() });
        }
        let mut targets = Vec::with_capacity(other.nze());
        let mut pos = Vec::new();
        for i in 0..other.height() {
            let cols = other.graph.row_indices(i);
            pos.resize(cols.len(), 0);
            self.graph.positions_sorted(i, cols, &mut pos)?;
            targets.extend(pos.iter().copied().zip(other.graph.row_range(i)));
        }
        for (dst, src) in targets {
            let v = other.values[src];
            self.values[dst].add_scaled(s, &v);
        }
        debug!(rows = self.height(), merged = other.nze(), "merged symmetric matrix");
        Ok(())
    }

    /// General-storage copy with the upper triangle filled in.
    pub fn to_general(&self) -> SparseMatrix<TM> {
        if self.storage == Storage::General {
            return self.clone();
        }
        let n = self.height();
        let mut patterns: Vec<Vec<usize>> = (0..n).map(|i| self.graph.row_indices(i).to_vec()).collect();
        for i in 0..n {
            for &j in self.graph.row_indices(i) {
                if j < i {
                    patterns[j].push(i);
                }
            }
        }
        for p in &mut patterns {
            p.sort_unstable();
        }
        let graph = MatrixGraph::from_row_patterns(n, patterns);
        let mut full = SparseMatrix::with_storage(Arc::new(graph), Storage::General);
        for i in 0..n {
            for (pos, &j) in self.graph.row_range(i).zip(self.graph.row_indices(i)) {
                let v = self.values[pos];
                if let Some(p) = full.graph.position_test(i, j) {
                    full.values[p] = v;
                }
                if j < i {
                    if let Some(p) = full.graph.position_test(j, i) {
                        full.values[p] = v.transpose();
                    }
                }
            }
        }
        full.hints = Arc::new((*self.hints).clone());
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialExec;

    fn lower_tridiagonal(n: usize) -> SparseMatrix<f64> {
        let mut a = SparseMatrix::symmetric_with_uniform_capacity(n, 2);
        for i in 0..n {
            *a.entry_mut(i, i).unwrap() = 2.0;
            if i > 0 {
                *a.entry_mut(i, i - 1).unwrap() = -1.0;
            }
        }
        a
    }

    #[test]
    fn two_passes_reproduce_full_product() {
        let a = lower_tridiagonal(3);
        assert_eq!(a.graph().row_indices(1), &[0, 1]);
        let x = vec![1.0; 3];
        let mut y = vec![0.0; 3];
        a.mult_add_with(&SerialExec, 1.0, &x, &mut y);
        assert_eq!(y, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn passes_split_lower_and_upper() {
        let a = lower_tridiagonal(3);
        let x = vec![1.0, 2.0, 3.0];
        let mut lower = vec![0.0; 3];
        a.mult_add_strict_lower(&SerialExec, 1.0, &x, &mut lower, None, None);
        assert_eq!(lower, vec![0.0, -1.0, -2.0]);
        let mut upper = vec![0.0; 3];
        a.mult_add_diag_upper(&SerialExec, 1.0, &x, &mut upper, None, None);
        assert_eq!(upper, vec![0.0, 1.0, 6.0]);
    }

    #[test]
    fn no_diag_drops_only_the_diagonal() {
        let a = lower_tridiagonal(3);
        let x = vec![1.0, 2.0, 3.0];
        let full = a.row_times_vector(2, &x);
        assert_eq!(a.row_times_vector_no_diag(2, &x), full - 2.0 * 3.0);
        let mut y = vec![0.0; 3];
        a.add_row_trans_to_vector_no_diag(2, 1.0, &mut y);
        assert_eq!(y, vec![0.0, -1.0, 0.0]);
    }

    #[test]
    fn inner_restricts_both_row_and_column() {
        let a = lower_tridiagonal(3);
        let inner = BitArray::from_indices(3, [1, 2]);
        let x = vec![1.0; 3];
        let mut y = vec![0.0; 3];
        a.mult_add_strict_lower(&SerialExec, 1.0, &x, &mut y, Some(&inner), None);
        a.mult_add_diag_upper(&SerialExec, 1.0, &x, &mut y, Some(&inner), None);
        // rows 1 and 2 of [[2, -1], [-1, 2]] times ones
        assert_eq!(y, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn cluster_keeps_couplings_inside_one_cluster() {
        let a = lower_tridiagonal(4);
        // {0, 1} and {2, 3} form clusters, coupling (2, 1) is cut
        let cluster = [1, 1, 2, 2];
        let x = vec![1.0; 4];
        let mut y = vec![0.0; 4];
        a.mult_add_strict_lower(&SerialExec, 1.0, &x, &mut y, None, Some(&cluster));
        a.mult_add_diag_upper(&SerialExec, 1.0, &x, &mut y, None, Some(&cluster));
        assert_eq!(y, vec![1.0, 1.0, 1.0, 1.0]);

        // cluster 0 drops row 3 and its couplings
        let mut y = vec![0.0; 4];
        a.mult_add_strict_lower(&SerialExec, 1.0, &x, &mut y, None, Some(&[1, 1, 1, 0]));
        a.mult_add_diag_upper(&SerialExec, 1.0, &x, &mut y, None, Some(&[1, 1, 1, 0]));
        assert_eq!(y, vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn add_merge_accumulates_scaled() {
        let mut a = lower_tridiagonal(3);
        let b = lower_tridiagonal(3);
        a.add_merge(2.0, &b).unwrap();
        assert_eq!(a.get(1, 1), 6.0);
        assert_eq!(a.get(0, 1), -3.0);
    }

    #[test]
    fn add_merge_fails_on_missing_position() {
        let mut a = SparseMatrix::<f64>::symmetric_with_uniform_capacity(2, 2);
        *a.entry_mut(0, 0).unwrap() = 1.0;
        *a.entry_mut(1, 1).unwrap() = 1.0;
        let b = lower_tridiagonal(2);
        assert_eq!(a.add_merge(1.0, &b), Err(SparseError::StructuralNotFound { row: 1, col: 0 }));
        assert_eq!(a.get(0, 0), 1.0);
        assert_eq!(a.get(1, 1), 1.0);
    }

    #[test]
    fn add_merge_rejects_general_storage() {
        let mut a = lower_tridiagonal(2);
        let b = SparseMatrix::<f64>::with_uniform_capacity(2, 2);
        assert!(matches!(a.add_merge(1.0, &b), Err(SparseError::Unsupported(_))));
    }

    #[test]
    fn to_general_mirrors_lower_part() {
        let a = lower_tridiagonal(3);
        let g = a.to_general();
        assert_eq!(g.storage(), Storage::General);
        assert_eq!(g.graph().row_indices(1), &[0, 1, 2]);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(g.get(i, j), a.get(i, j));
            }
        }
    }
}
