//! Sparse matrix: a shared graph, aligned values and a storage tag.
//!
//! `Storage::General` keeps every position of the matrix. `Storage::SymmetricLower`
//! keeps only columns `j <= i` of each row; the entry `(i, j)` with `j > i` is
//! the transpose of the stored `(j, i)` and is never materialized. The tag
//! selects the one-pass or the two-pass multiply.

use std::fmt;
use std::mem::size_of;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use faer::MatRef;
use tracing::debug;

use crate::context::hints::SolverHints;
use crate::core::traits::{BlockEntry, EntryMul, MatVec, VecEntry};
use crate::error::SparseError;
use crate::matrix::graph::{MatrixGraph, Slot};
use crate::matrix::values::{scatter_element, ConcurrentAssembler, FlatValues, FlatValuesMut, ValueStore};
use crate::parallel::{Exec, Executor};

/// Which part of the matrix is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Storage {
    #[default]
    General,
    /// Diagonal and strictly lower triangle.
    SymmetricLower,
}

/// CRS matrix with block entries `TM`.
pub struct SparseMatrix<TM: BlockEntry> {
    pub(super) graph: Arc<MatrixGraph>,
    pub(super) values: ValueStore<TM>,
    pub(super) storage: Storage,
    pub(super) hints: Arc<SolverHints>,
}

impl<TM: BlockEntry> SparseMatrix<TM> {
    /// General matrix on `graph`, all entries zero.
    ///
    /// Passing an owned graph moves it into the matrix; passing an `Arc`
    /// shares the pattern with other matrices.
    pub fn new(graph: impl Into<Arc<MatrixGraph>>) -> Self {
        Self::with_storage(graph.into(), Storage::General)
    }

    /// Symmetric matrix on a lower-triangular `graph`, all entries zero.
    pub fn symmetric(graph: impl Into<Arc<MatrixGraph>>) -> Result<Self, SparseError> {
        let graph = graph.into();
        if graph.size() != graph.width() {
            return Err(SparseError::DimensionMismatch { expected: graph.size(), found: graph.width() });
        }
        if !graph.is_lower_triangular() {
            return Err(SparseError::InvalidGraph("symmetric storage needs a lower-triangular graph".into()));
        }
        Ok(Self::with_storage(graph, Storage::SymmetricLower))
    }

    pub(crate) fn with_storage(graph: Arc<MatrixGraph>, storage: Storage) -> Self {
        debug!(rows = graph.size(), cols = graph.width(), nze = graph.nze(), ?storage, "created sparse matrix");
        Self {
            values: ValueStore::new(graph.nze()),
            graph,
            storage,
            hints: Arc::new(SolverHints::default()),
        }
    }

    /// General matrix with `elsperrow[i]` free slots in row `i`.
    pub fn with_row_capacities(elsperrow: &[usize], width: usize) -> Self {
        Self::new(MatrixGraph::with_row_capacities(elsperrow, width))
    }

    /// Square general matrix with `max_elsperrow` free slots per row.
    pub fn with_uniform_capacity(size: usize, max_elsperrow: usize) -> Self {
        Self::new(MatrixGraph::with_uniform_capacity(size, max_elsperrow))
    }

    /// General matrix coupling the row and column dofs of every element.
    pub fn from_tables(size: usize, width: usize, row_elements: &[Vec<usize>], col_elements: &[Vec<usize>]) -> Self {
        Self::new(MatrixGraph::from_tables(size, width, row_elements, col_elements, false))
    }

    /// Square symmetric matrix with `elsperrow[i]` free slots in row `i`.
    pub fn symmetric_with_row_capacities(elsperrow: &[usize]) -> Self {
        let graph = MatrixGraph::with_row_capacities(elsperrow, elsperrow.len());
        Self::with_storage(Arc::new(graph), Storage::SymmetricLower)
    }

    pub fn symmetric_with_uniform_capacity(size: usize, max_elsperrow: usize) -> Self {
        let graph = MatrixGraph::with_uniform_capacity(size, max_elsperrow);
        Self::with_storage(Arc::new(graph), Storage::SymmetricLower)
    }

    /// Symmetric matrix coupling the dofs of every element; only the lower
    /// triangle of each coupling is stored.
    pub fn symmetric_from_tables(size: usize, elements: &[Vec<usize>]) -> Self {
        let graph = MatrixGraph::from_tables(size, size, elements, elements, true);
        Self::with_storage(Arc::new(graph), Storage::SymmetricLower)
    }

    /// Share the hints object of another matrix.
    pub fn with_hints(mut self, hints: Arc<SolverHints>) -> Self {
        self.hints = hints;
        self
    }

    pub fn graph(&self) -> &MatrixGraph {
        &self.graph
    }

    /// The shared graph handle.
    pub fn graph_arc(&self) -> &Arc<MatrixGraph> {
        &self.graph
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn is_symmetric(&self) -> bool {
        self.storage == Storage::SymmetricLower
    }

    pub fn hints(&self) -> &Arc<SolverHints> {
        &self.hints
    }

    /// Number of block rows.
    pub fn height(&self) -> usize {
        self.graph.size()
    }

    /// Number of block columns.
    pub fn width(&self) -> usize {
        self.graph.width()
    }

    pub fn nze(&self) -> usize {
        self.graph.nze()
    }

    pub fn values(&self) -> &ValueStore<TM> {
        &self.values
    }

    /// Entry `(i, j)`, created if the row has a free slot.
    ///
    /// Already stored values of row `i` move with their columns. Creating a
    /// position does not update the same-pattern flags or the row balancing;
    /// call [`finish_structure`](Self::finish_structure) once the structural
    /// phase is over.
    pub fn entry_mut(&mut self, i: usize, j: usize) -> Result<&mut TM, SparseError> {
        if self.is_symmetric() && j > i {
            return Err(SparseError::OutsideLowerTriangle { row: i, col: j });
        }
        if let Some(pos) = self.graph.position_test(i, j) {
            return Ok(&mut self.values[pos]);
        }
        let graph = Arc::make_mut(&mut self.graph);
        let slot = graph.insert_position(i, j)?;
        if let Slot::Inserted(pos) = slot {
            self.values.open_slot(pos, graph.row_range(i).end - 1);
        }
        Ok(&mut self.values[slot.position()])
    }

    /// Entry `(i, j)`, the null entry when it is not stored.
    pub fn get(&self, i: usize, j: usize) -> TM {
        let nul = *self.values.nul();
        if self.is_symmetric() && j > i {
            return self.graph.position_test(j, i).map_or(nul, |p| self.values[p].transpose());
        }
        self.graph.position_test(i, j).map_or(nul, |p| self.values[p])
    }

    /// Stored values of row `i`, aligned with `graph().row_indices(i)`.
    pub fn row_values(&self, i: usize) -> &[TM] {
        &self.values.as_slice()[self.graph.row_range(i)]
    }

    pub fn row_values_mut(&mut self, i: usize) -> &mut [TM] {
        let range = self.graph.row_range(i);
        &mut self.values.as_mut_slice()[range]
    }

    /// Recompute the same-pattern flags and the row balancing after the
    /// structural phase.
    pub fn finish_structure(&mut self) {
        let graph = Arc::make_mut(&mut self.graph);
        graph.find_same_nze();
        graph.calc_balancing();
    }

    /// Add the element matrix `elmat` at the couplings of `rows` × `cols`.
    ///
    /// `elmat` holds scalars, `rows.len() * HEIGHT` by `cols.len() * WIDTH`.
    /// Every position must exist; on failure no value changes. Symmetric
    /// storage couples `rows` with itself, ignores `cols` and adds only blocks
    /// on or below the diagonal.
    pub fn add_element_matrix(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        elmat: MatRef<'_, TM::Scalar>,
    ) -> Result<(), SparseError> {
        let symmetric = self.is_symmetric();
        let cols = if symmetric { rows } else { cols };
        let values = &mut self.values;
        scatter_element::<TM>(&self.graph, rows, cols, elmat, symmetric, |pos, k, v| {
            values[pos].as_scalars_mut()[k] += v;
        })
    }

    /// Handle for adding element matrices from several threads at once.
    pub fn assembler(&mut self) -> ConcurrentAssembler<'_, TM> {
        ConcurrentAssembler::new(&self.graph, &mut self.values, self.storage == Storage::SymmetricLower)
    }

    /// The values as one vector of scalars.
    pub fn as_flat(&self) -> FlatValues<'_, TM> {
        self.values.as_flat()
    }

    pub fn as_flat_mut(&mut self) -> FlatValuesMut<'_, TM> {
        self.values.as_flat_mut()
    }

    /// Set every stored scalar to `s`.
    pub fn set_scalar(&mut self, s: TM::Scalar) {
        self.values.as_flat_mut().fill(s);
    }

    pub fn set_zero(&mut self) {
        self.set_scalar(<TM::Scalar as num_traits::Zero>::zero());
    }

    /// `self += s * other`, position by position.
    ///
    /// Both matrices must have the same graph, shared or equal.
    pub fn add(&mut self, s: TM::Scalar, other: &SparseMatrix<TM>) -> Result<(), SparseError> {
        if self.nze() != other.nze() {
            return Err(SparseError::DimensionMismatch { expected: self.nze(), found: other.nze() });
        }
        if !Arc::ptr_eq(&self.graph, &other.graph) && !self.graph.same_structure(&other.graph) {
            return Err(SparseError::InvalidGraph("added matrix has a different sparsity pattern".into()));
        }
        self.values.as_flat_mut().add_scaled(s, &other.values.as_flat());
        Ok(())
    }

    /// Zero matrix of the same shape and storage sharing this graph.
    pub fn create_matrix(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            values: ValueStore::new(self.nze()),
            storage: self.storage,
            hints: Arc::new((*self.hints).clone()),
        }
    }

    /// Zero vector with one entry per row.
    pub fn create_vector<V: VecEntry>(&self) -> Vec<V> {
        vec![V::zero(); self.height()]
    }

    /// Bytes held by the graph and the values.
    pub fn memory_usage(&self) -> usize {
        self.graph.memory_usage() + self.values.len() * size_of::<TM>()
    }

    /// `sum_j A[row, j] * x[j]` over the stored columns of `row`.
    #[inline]
    pub fn row_times_vector<V>(&self, row: usize, x: &[V]) -> V
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        let mut sum = V::zero();
        for (&c, e) in self.graph.row_indices(row).iter().zip(self.row_values(row)) {
            sum += e.mul_vec(&x[c]);
        }
        sum
    }

    /// `y[j] += A[row, j]ᵀ * el` for every stored column `j` of `row`.
    #[inline]
    pub fn add_row_trans_to_vector<V>(&self, row: usize, el: V, y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        for (&c, e) in self.graph.row_indices(row).iter().zip(self.row_values(row)) {
            y[c] += e.trans_mul_vec(&el);
        }
    }

    /// y += s · A · x on the default executor.
    pub fn mult_add<V>(&self, s: V::Scalar, x: &[V], y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        self.mult_add_with(&Executor::default(), s, x, y);
    }

    /// y += s · Aᵀ · x on the default executor.
    pub fn mult_trans_add<V>(&self, s: V::Scalar, x: &[V], y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
    {
        self.mult_trans_add_with(&Executor::default(), s, x, y);
    }

    /// y += s · A · x, rows distributed over the graph's balancing.
    pub fn mult_add_with<V, E>(&self, exec: &E, s: V::Scalar, x: &[V], y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
        E: Exec,
    {
        match self.storage {
            Storage::General => {
                assert_eq!(x.len(), self.width(), "x length must equal the matrix width");
                assert_eq!(y.len(), self.height(), "y length must equal the matrix height");
                exec.for_each_range(self.graph.balancing(), y, |rows, chunk| {
                    for (i, yi) in rows.zip(chunk.iter_mut()) {
                        *yi += self.row_times_vector(i, x).scale(s);
                    }
                });
            }
            Storage::SymmetricLower => {
                self.mult_add_strict_lower(exec, s, x, y, None, None);
                self.mult_add_diag_upper(exec, s, x, y, None, None);
            }
        }
    }

    /// y += s · Aᵀ · x; column contributions of each range go to a private
    /// buffer that is summed into `y`.
    pub fn mult_trans_add_with<V, E>(&self, exec: &E, s: V::Scalar, x: &[V], y: &mut [V])
    where
        TM: EntryMul<V>,
        V: VecEntry,
        E: Exec,
    {
        match self.storage {
            Storage::General => {
                assert_eq!(x.len(), self.height(), "x length must equal the matrix height");
                assert_eq!(y.len(), self.width(), "y length must equal the matrix width");
                exec.scatter_ranges(self.graph.balancing(), y, |rows, buf| {
                    for i in rows {
                        self.add_row_trans_to_vector(i, x[i].scale(s), buf);
                    }
                });
            }
            Storage::SymmetricLower => self.mult_add_with(exec, s, x, y),
        }
    }
}

impl<TM: BlockEntry> Clone for SparseMatrix<TM> {
    /// Shares the graph, copies the values through the flat view and gives
    /// the copy its own hints.
    fn clone(&self) -> Self {
        let mut copy = self.create_matrix();
        copy.values.as_flat_mut().copy_from(&self.values.as_flat());
        copy
    }
}

impl<TM: BlockEntry> fmt::Debug for SparseMatrix<TM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrix")
            .field("height", &self.height())
            .field("width", &self.width())
            .field("nze", &self.nze())
            .field("storage", &self.storage)
            .field("hints", &self.hints)
            .finish()
    }
}

impl<TM: BlockEntry> Index<usize> for SparseMatrix<TM> {
    type Output = TM;
    fn index(&self, pos: usize) -> &TM {
        &self.values[pos]
    }
}

impl<TM: BlockEntry> IndexMut<usize> for SparseMatrix<TM> {
    fn index_mut(&mut self, pos: usize) -> &mut TM {
        &mut self.values[pos]
    }
}

impl<TM: BlockEntry> fmt::Display for SparseMatrix<TM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.height() {
            write!(f, "Row {}:", i)?;
            for (c, v) in self.graph.row_indices(i).iter().zip(self.row_values(i)) {
                write!(f, "   {}: {:?}", c, v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<TM, V> MatVec<V> for SparseMatrix<TM>
where
    TM: EntryMul<V>,
    V: VecEntry,
{
    fn height(&self) -> usize {
        SparseMatrix::height(self)
    }

    fn width(&self) -> usize {
        SparseMatrix::width(self)
    }

    fn mult_add(&self, s: V::Scalar, x: &[V], y: &mut [V]) {
        SparseMatrix::mult_add(self, s, x, y)
    }

    fn mult_trans_add(&self, s: V::Scalar, x: &[V], y: &mut [V]) {
        SparseMatrix::mult_trans_add(self, s, x, y)
    }
}
