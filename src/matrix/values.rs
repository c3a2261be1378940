//! Value storage aligned with a [`MatrixGraph`], flat scalar views and
//! element-matrix scatter-add.
//!
//! `ValueStore` holds one block entry per graph slot. `FlatValues` and
//! `FlatValuesMut` expose the whole buffer as one vector of scalars (entries
//! flattened row-major, one after another) for bulk scaling and
//! accumulation. `ConcurrentAssembler` accumulates element matrices from
//! many threads with per-scalar atomic adds.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use faer::MatRef;

use crate::core::traits::{BlockEntry, Scalar};
use crate::error::SparseError;
use crate::matrix::graph::MatrixGraph;

/// Entry buffer index-aligned with a graph's slots.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueStore<TM> {
    data: Vec<TM>,
    nul: TM,
}

impl<TM: BlockEntry> ValueStore<TM> {
    /// `nze` zero entries.
    pub fn new(nze: usize) -> Self {
        Self { data: vec![TM::zero(); nze], nul: TM::zero() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The entry returned for positions that are not stored.
    pub fn nul(&self) -> &TM {
        &self.nul
    }

    pub fn as_slice(&self) -> &[TM] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [TM] {
        &mut self.data
    }

    pub fn as_flat(&self) -> FlatValues<'_, TM> {
        FlatValues { data: &self.data }
    }

    pub fn as_flat_mut(&mut self) -> FlatValuesMut<'_, TM> {
        FlatValuesMut { data: &mut self.data }
    }

    /// Open a slot at `pos` by shifting `pos..end` one place right, where
    /// `end` is the last used position of the row after insertion.
    pub(crate) fn open_slot(&mut self, pos: usize, end: usize) {
        self.data[pos..=end].rotate_right(1);
        self.data[pos] = TM::zero();
    }
}

impl<TM> Index<usize> for ValueStore<TM> {
    type Output = TM;
    #[inline]
    fn index(&self, pos: usize) -> &TM {
        &self.data[pos]
    }
}

impl<TM> IndexMut<usize> for ValueStore<TM> {
    #[inline]
    fn index_mut(&mut self, pos: usize) -> &mut TM {
        &mut self.data[pos]
    }
}

/// Read-only scalar view of a value buffer.
#[derive(Clone, Copy, Debug)]
pub struct FlatValues<'a, TM> {
    data: &'a [TM],
}

impl<'a, TM: BlockEntry> FlatValues<'a, TM> {
    /// Number of scalars.
    pub fn len(&self) -> usize {
        self.data.len() * TM::HEIGHT * TM::WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TM::Scalar> + use<'a, TM> {
        self.data.iter().flat_map(|e| e.as_scalars().iter())
    }

    pub fn to_vec(&self) -> Vec<TM::Scalar> {
        self.iter().copied().collect()
    }
}

/// Mutable scalar view of a value buffer.
#[derive(Debug)]
pub struct FlatValuesMut<'a, TM> {
    data: &'a mut [TM],
}

impl<TM: BlockEntry> FlatValuesMut<'_, TM> {
    pub fn len(&self) -> usize {
        self.data.len() * TM::HEIGHT * TM::WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TM::Scalar> + '_ {
        self.data.iter_mut().flat_map(|e| e.as_scalars_mut().iter_mut())
    }

    pub fn as_flat(&self) -> FlatValues<'_, TM> {
        FlatValues { data: &*self.data }
    }

    /// Set every scalar to `s`.
    pub fn fill(&mut self, s: TM::Scalar) {
        self.iter_mut().for_each(|v| *v = s);
    }

    /// Multiply every scalar by `s`.
    pub fn scale(&mut self, s: TM::Scalar) {
        self.iter_mut().for_each(|v| *v *= s);
    }

    /// `self += s * other`.
    pub fn add_scaled(&mut self, s: TM::Scalar, other: &FlatValues<'_, TM>) {
        assert_eq!(self.len(), other.len(), "flat vectors differ in length");
        for (a, &b) in self.iter_mut().zip(other.iter()) {
            *a += s * b;
        }
    }

    pub fn copy_from(&mut self, other: &FlatValues<'_, TM>) {
        assert_eq!(self.len(), other.len(), "flat vectors differ in length");
        for (a, &b) in self.iter_mut().zip(other.iter()) {
            *a = b;
        }
    }
}

/// Resolve the slot of every block of an element matrix.
///
/// Returns one position per (row dof, column dof) pair, row by row, or
/// `None` for blocks above the diagonal that symmetric storage drops.
/// Nothing is returned unless every required position exists.
fn element_positions(
    graph: &MatrixGraph,
    rows: &[usize],
    cols: &[usize],
    lower_only: bool,
) -> Result<Vec<Option<usize>>, SparseError> {
    let mut order: Vec<usize> = (0..cols.len()).collect();
    order.sort_by_key(|&k| cols[k]);
    let sorted: Vec<usize> = order.iter().map(|&k| cols[k]).collect();

    let mut found = vec![0; cols.len()];
    let mut positions = vec![None; rows.len() * cols.len()];
    for (lr, &r) in rows.iter().enumerate() {
        let n = if lower_only {
            sorted.partition_point(|&c| c <= r)
        } else {
            sorted.len()
        };
        graph.positions_sorted(r, &sorted[..n], &mut found[..n])?;
        for (&lc, &p) in order[..n].iter().zip(&found[..n]) {
            positions[lr * cols.len() + lc] = Some(p);
        }
    }
    Ok(positions)
}

/// Scatter the blocks of `elmat` into the slots resolved for them.
///
/// `add(pos, k, v)` adds `v` to scalar `k` of the entry at `pos`.
pub(crate) fn scatter_element<TM: BlockEntry>(
    graph: &MatrixGraph,
    rows: &[usize],
    cols: &[usize],
    elmat: MatRef<'_, TM::Scalar>,
    lower_only: bool,
    mut add: impl FnMut(usize, usize, TM::Scalar),
) -> Result<(), SparseError> {
    let (h, w) = (TM::HEIGHT, TM::WIDTH);
    assert_eq!(elmat.nrows(), rows.len() * h, "element matrix height");
    assert_eq!(elmat.ncols(), cols.len() * w, "element matrix width");

    let positions = element_positions(graph, rows, cols, lower_only)?;
    for lr in 0..rows.len() {
        for lc in 0..cols.len() {
            let Some(pos) = positions[lr * cols.len() + lc] else {
                continue;
            };
            for a in 0..h {
                for b in 0..w {
                    add(pos, a * w + b, elmat[(lr * h + a, lc * w + b)]);
                }
            }
        }
    }
    Ok(())
}

/// Shared handle for concurrent element assembly.
///
/// Obtained from [`SparseMatrix::assembler`](crate::matrix::SparseMatrix::assembler);
/// the exclusive borrow of the matrix guarantees that all writes during its
/// lifetime go through the atomic adds below.
pub struct ConcurrentAssembler<'a, TM: BlockEntry> {
    graph: &'a MatrixGraph,
    data: *mut TM,
    len: usize,
    lower_only: bool,
    _values: PhantomData<&'a mut [TM]>,
}

// SAFETY: every access through the raw pointer is an atomic scalar add.
unsafe impl<TM: BlockEntry> Send for ConcurrentAssembler<'_, TM> {}
unsafe impl<TM: BlockEntry> Sync for ConcurrentAssembler<'_, TM> {}

impl<'a, TM: BlockEntry> ConcurrentAssembler<'a, TM> {
    pub(crate) fn new(graph: &'a MatrixGraph, values: &'a mut ValueStore<TM>, lower_only: bool) -> Self {
        Self {
            graph,
            len: values.data.len(),
            data: values.data.as_mut_ptr(),
            lower_only,
            _values: PhantomData,
        }
    }

    /// Atomically add an element matrix; safe to call from many threads with
    /// overlapping dof lists.
    ///
    /// For symmetric storage `cols` is ignored, as in the exclusive
    /// `add_element_matrix`.
    pub fn add_element_matrix(
        &self,
        rows: &[usize],
        cols: &[usize],
        elmat: MatRef<'_, TM::Scalar>,
    ) -> Result<(), SparseError> {
        let cols = if self.lower_only { rows } else { cols };
        scatter_element::<TM>(self.graph, rows, cols, elmat, self.lower_only, |pos, k, v| {
            assert!(pos < self.len);
            // SAFETY: `pos` is a slot of the borrowed buffer and `k` indexes a
            // scalar of its entry; concurrent writers use atomics too.
            unsafe { TM::Scalar::atomic_add(TM::scalar_ptr(self.data.add(pos), k), v) };
        })
    }
}
