//! Sparsity pattern of a CRS matrix.
//!
//! Each row owns a contiguous slot range `first[i]..first[i + 1]`. The first
//! `fill[i]` slots hold the row's column numbers in strictly ascending order;
//! the remaining slots are preallocated capacity marked [`UNUSED`], consumed by
//! [`MatrixGraph::create_position`] during the structural phase.

use std::fmt;
use std::mem::size_of;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::SparseError;
use crate::parallel::Partitioning;

/// Column number stored in preallocated slots that are not yet used.
pub const UNUSED: usize = usize::MAX;

/// Result of a structural insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Existing(usize),
    Inserted(usize),
}

impl Slot {
    pub(crate) fn position(self) -> usize {
        match self {
            Slot::Existing(p) | Slot::Inserted(p) => p,
        }
    }
}

/// The graph of a sparse matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixGraph {
    /// number of rows
    size: usize,
    /// number of columns
    width: usize,
    /// stored positions, used or not
    nze: usize,
    /// column numbers
    colnr: Vec<usize>,
    /// first position of each row, `size + 1` entries
    first: Vec<usize>,
    /// used positions per row
    fill: Vec<usize>,
    /// row has the same column pattern as the previous row
    same_nze: Vec<bool>,
    /// balancing for multi-threading
    balance: Partitioning,
}

impl Default for MatrixGraph {
    fn default() -> Self {
        Self {
            size: 0,
            width: 0,
            nze: 0,
            colnr: Vec::new(),
            first: vec![0],
            fill: Vec::new(),
            same_nze: Vec::new(),
            balance: Partitioning::default(),
        }
    }
}

impl MatrixGraph {
    /// Arbitrary number of slots per row; all slots start unused.
    pub fn with_row_capacities(elsperrow: &[usize], width: usize) -> Self {
        let size = elsperrow.len();
        let mut first = Vec::with_capacity(size + 1);
        first.push(0);
        for &n in elsperrow {
            let last = first[first.len() - 1];
            first.push(last + n);
        }
        let nze = first[size];
        let mut graph = Self {
            size,
            width,
            nze,
            colnr: vec![UNUSED; nze],
            first,
            fill: vec![0; size],
            same_nze: vec![false; size],
            balance: Partitioning::single(size),
        };
        graph.calc_balancing();
        debug!(rows = size, width, nze, "allocated matrix graph");
        graph
    }

    /// Square graph with `max_elsperrow` slots in every row.
    pub fn with_uniform_capacity(size: usize, max_elsperrow: usize) -> Self {
        Self::with_row_capacities(&vec![max_elsperrow; size], size)
    }

    /// Graph coupling every row dof of an element with every column dof of
    /// the same element.
    ///
    /// `row_elements[e]` and `col_elements[e]` list the dofs of element `e`.
    /// With `symmetric`, only columns `j <= i` are stored in row `i`.
    pub fn from_tables(
        size: usize,
        width: usize,
        row_elements: &[Vec<usize>],
        col_elements: &[Vec<usize>],
        symmetric: bool,
    ) -> Self {
        assert_eq!(
            row_elements.len(),
            col_elements.len(),
            "row and column tables must list the same elements"
        );
        for dofs in col_elements {
            for &d in dofs {
                assert!(d < width, "column dof {} out of range {}", d, width);
            }
        }
        let mut dof2el = vec![Vec::new(); size];
        for (e, dofs) in row_elements.iter().enumerate() {
            for &d in dofs {
                assert!(d < size, "row dof {} out of range {}", d, size);
                if dof2el[d].last() != Some(&e) {
                    dof2el[d].push(e);
                }
            }
        }

        let row_pattern = |i: usize| {
            let mut cols: Vec<usize> = dof2el[i]
                .iter()
                .flat_map(|&e| col_elements[e].iter().copied())
                .filter(|&c| !symmetric || c <= i)
                .collect();
            cols.sort_unstable();
            cols.dedup();
            cols
        };

        #[cfg(feature = "rayon")]
        let patterns: Vec<Vec<usize>> = (0..size).into_par_iter().map(row_pattern).collect();
        #[cfg(not(feature = "rayon"))]
        let patterns: Vec<Vec<usize>> = (0..size).map(row_pattern).collect();

        let graph = Self::from_row_patterns(width, patterns);
        debug!(
            rows = size,
            width,
            nze = graph.nze,
            elements = row_elements.len(),
            symmetric,
            "built matrix graph from element tables"
        );
        graph
    }

    /// Fully used graph from sorted, duplicate-free column lists.
    pub(crate) fn from_row_patterns(width: usize, patterns: Vec<Vec<usize>>) -> Self {
        let size = patterns.len();
        let mut first = Vec::with_capacity(size + 1);
        first.push(0);
        let mut fill = Vec::with_capacity(size);
        for p in &patterns {
            let last = first[first.len() - 1];
            first.push(last + p.len());
            fill.push(p.len());
        }
        let colnr: Vec<usize> = patterns.into_iter().flatten().collect();
        debug_assert!(colnr.iter().all(|&c| c < width));
        let mut graph = Self {
            size,
            width,
            nze: colnr.len(),
            colnr,
            first,
            fill,
            same_nze: vec![false; size],
            balance: Partitioning::single(size),
        };
        graph.find_same_nze();
        graph.calc_balancing();
        graph
    }

    /// Graph from raw CRS arrays, checking every structural invariant.
    ///
    /// Unused slots must carry [`UNUSED`] and sit at the end of their row.
    pub fn from_raw_parts(
        size: usize,
        width: usize,
        first: Vec<usize>,
        colnr: Vec<usize>,
    ) -> Result<Self, SparseError> {
        if first.len() != size + 1 {
            return Err(SparseError::InvalidGraph(format!(
                "row offsets have length {}, expected {}",
                first.len(),
                size + 1
            )));
        }
        if first[0] != 0 || first[size] != colnr.len() {
            return Err(SparseError::InvalidGraph(format!(
                "row offsets must run from 0 to {}",
                colnr.len()
            )));
        }
        let mut fill = Vec::with_capacity(size);
        for i in 0..size {
            if first[i + 1] < first[i] {
                return Err(SparseError::InvalidGraph(format!("row offsets decrease at row {}", i)));
            }
            let slots = &colnr[first[i]..first[i + 1]];
            let used = slots.iter().take_while(|&&c| c != UNUSED).count();
            if slots[used..].iter().any(|&c| c != UNUSED) {
                return Err(SparseError::InvalidGraph(format!("row {} has a gap before a used slot", i)));
            }
            let cols = &slots[..used];
            if cols.iter().any(|&c| c >= width) {
                return Err(SparseError::InvalidGraph(format!("row {} has a column out of range {}", i, width)));
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(SparseError::InvalidGraph(format!("row {} is not strictly ascending", i)));
            }
            fill.push(used);
        }
        let mut graph = Self {
            size,
            width,
            nze: colnr.len(),
            colnr,
            first,
            fill,
            same_nze: vec![false; size],
            balance: Partitioning::single(size),
        };
        graph.find_same_nze();
        graph.calc_balancing();
        Ok(graph)
    }

    /// Move the graph out, leaving an empty graph behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn nze(&self) -> usize {
        self.nze
    }

    /// First position of row `i`.
    #[inline]
    pub fn first(&self, i: usize) -> usize {
        self.first[i]
    }

    /// Preallocated slots of row `i`.
    pub fn capacity(&self, i: usize) -> usize {
        self.first[i + 1] - self.first[i]
    }

    /// Positions of the used slots of row `i`.
    #[inline]
    pub fn row_range(&self, i: usize) -> std::ops::Range<usize> {
        self.first[i]..self.first[i] + self.fill[i]
    }

    /// Column numbers of row `i`, ascending.
    #[inline]
    pub fn row_indices(&self, i: usize) -> &[usize] {
        &self.colnr[self.row_range(i)]
    }

    /// Column number of every slot, [`UNUSED`] for free slots.
    pub fn col_indices(&self) -> &[usize] {
        &self.colnr
    }

    /// Row offsets, `size + 1` entries.
    pub fn row_offsets(&self) -> &[usize] {
        &self.first
    }

    /// Position of element (i, j).
    pub fn position(&self, i: usize, j: usize) -> Result<usize, SparseError> {
        self.position_test(i, j)
            .ok_or(SparseError::StructuralNotFound { row: i, col: j })
    }

    /// Position of element (i, j), `None` if it is not stored.
    #[inline]
    pub fn position_test(&self, i: usize, j: usize) -> Option<usize> {
        if i >= self.size {
            return None;
        }
        self.row_indices(i)
            .binary_search(&j)
            .ok()
            .map(|k| self.first[i] + k)
    }

    /// Positions of the ascending columns `cols` in `row`, written to `pos`.
    ///
    /// One merge pass over the row instead of a search per column.
    pub fn positions_sorted(&self, row: usize, cols: &[usize], pos: &mut [usize]) -> Result<(), SparseError> {
        assert_eq!(cols.len(), pos.len(), "one output slot per column");
        debug_assert!(cols.windows(2).all(|w| w[0] <= w[1]), "columns must be sorted");
        if row >= self.size {
            return match cols.first() {
                Some(&col) => Err(SparseError::StructuralNotFound { row, col }),
                None => Ok(()),
            };
        }
        let idx = self.row_indices(row);
        let base = self.first[row];
        let mut k = 0;
        for (&c, p) in cols.iter().zip(pos.iter_mut()) {
            while k < idx.len() && idx[k] < c {
                k += 1;
            }
            if k == idx.len() || idx[k] != c {
                return Err(SparseError::StructuralNotFound { row, col: c });
            }
            *p = base + k;
        }
        Ok(())
    }

    /// Position of element (i, j), inserting it into a free slot of row `i`
    /// if it is not stored yet.
    ///
    /// `(i, j)` outside the matrix is reported as `StructuralNotFound`.
    pub fn create_position(&mut self, i: usize, j: usize) -> Result<usize, SparseError> {
        self.insert_position(i, j).map(Slot::position)
    }

    pub(crate) fn insert_position(&mut self, i: usize, j: usize) -> Result<Slot, SparseError> {
        if i >= self.size || j >= self.width {
            return Err(SparseError::StructuralNotFound { row: i, col: j });
        }
        let first = self.first[i];
        let used = self.fill[i];
        match self.colnr[first..first + used].binary_search(&j) {
            Ok(k) => Ok(Slot::Existing(first + k)),
            Err(k) => {
                let capacity = self.capacity(i);
                if used == capacity {
                    return Err(SparseError::CapacityExceeded { row: i, col: j, capacity });
                }
                self.colnr[first + k..=first + used].rotate_right(1);
                self.colnr[first + k] = j;
                self.fill[i] += 1;
                trace!(row = i, col = j, pos = first + k, "created position");
                Ok(Slot::Inserted(first + k))
            }
        }
    }

    /// Mark rows whose column pattern equals the previous row's.
    pub fn find_same_nze(&mut self) -> usize {
        let same: Vec<bool> = (0..self.size)
            .map(|i| i > 0 && self.row_indices(i) == self.row_indices(i - 1))
            .collect();
        let count = same.iter().filter(|&&s| s).count();
        self.same_nze = same;
        trace!(rows = self.size, same = count, "found rows repeating their predecessor");
        count
    }

    /// Row `i` has the same pattern as row `i - 1` (as of the last
    /// [`find_same_nze`](Self::find_same_nze)).
    pub fn same_pattern(&self, i: usize) -> bool {
        self.same_nze.get(i).copied().unwrap_or(false)
    }

    /// Balance rows over the default number of partitions.
    pub fn calc_balancing(&mut self) {
        self.calc_balancing_with(Partitioning::default_parts());
    }

    /// Balance rows over `parts` ranges; a row costs `5 + used slots`.
    pub fn calc_balancing_with(&mut self, parts: usize) {
        let fill = &self.fill;
        let balance = Partitioning::balanced(self.size, parts, |i| 5 + fill[i]);
        trace!(rows = self.size, parts = balance.len(), "computed row balancing");
        self.balance = balance;
    }

    pub fn balancing(&self) -> &Partitioning {
        &self.balance
    }

    /// Same dimensions, row offsets and column numbers as `other`.
    pub fn same_structure(&self, other: &MatrixGraph) -> bool {
        self.size == other.size && self.width == other.width && self.first == other.first && self.colnr == other.colnr
    }

    /// All used columns of row `i` satisfy `j <= i`.
    pub fn is_lower_triangular(&self) -> bool {
        (0..self.size).all(|i| self.row_indices(i).last().is_none_or(|&j| j <= i))
    }

    /// Bytes held by the graph arrays.
    pub fn memory_usage(&self) -> usize {
        (self.colnr.len() + self.first.len() + self.fill.len()) * size_of::<usize>()
            + self.same_nze.len() * size_of::<bool>()
    }
}

impl fmt::Display for MatrixGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            write!(f, "Row {}:", i)?;
            for &c in self.row_indices(i) {
                write!(f, "   {}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiagonal(n: usize) -> MatrixGraph {
        let mut g = MatrixGraph::with_uniform_capacity(n, 3);
        for i in 0..n {
            for j in i.saturating_sub(1)..(i + 2).min(n) {
                g.create_position(i, j).unwrap();
            }
        }
        g
    }

    #[test]
    fn create_position_keeps_rows_sorted() {
        let mut g = MatrixGraph::with_uniform_capacity(4, 3);
        g.create_position(1, 3).unwrap();
        g.create_position(1, 0).unwrap();
        g.create_position(1, 2).unwrap();
        assert_eq!(g.row_indices(1), &[0, 2, 3]);
        // existing position is returned unchanged
        assert_eq!(g.create_position(1, 2).unwrap(), g.first(1) + 1);
    }

    #[test]
    fn full_row_reports_capacity() {
        let mut g = MatrixGraph::with_uniform_capacity(3, 1);
        g.create_position(2, 0).unwrap();
        assert_eq!(
            g.create_position(2, 1),
            Err(SparseError::CapacityExceeded { row: 2, col: 1, capacity: 1 })
        );
    }

    #[test]
    fn out_of_range_insert_is_an_error() {
        let mut g = MatrixGraph::with_row_capacities(&[2, 2], 3);
        assert_eq!(g.create_position(0, 3), Err(SparseError::StructuralNotFound { row: 0, col: 3 }));
        assert_eq!(g.create_position(2, 0), Err(SparseError::StructuralNotFound { row: 2, col: 0 }));
        assert!(g.row_indices(0).is_empty());
    }

    #[test]
    #[should_panic(expected = "column dof 5 out of range 3")]
    fn tables_reject_columns_beyond_width() {
        MatrixGraph::from_tables(3, 3, &[vec![0]], &[vec![5]], false);
    }

    #[test]
    fn position_test_and_position_agree() {
        let g = tridiagonal(5);
        assert_eq!(g.position_test(0, 2), None);
        assert_eq!(g.position(0, 2), Err(SparseError::StructuralNotFound { row: 0, col: 2 }));
        let p = g.position(3, 4).unwrap();
        assert_eq!(g.col_indices()[p], 4);
    }

    #[test]
    fn positions_sorted_matches_single_lookups() {
        let g = tridiagonal(6);
        let cols = [2, 3, 4];
        let mut pos = [0; 3];
        g.positions_sorted(3, &cols, &mut pos).unwrap();
        for (k, &c) in cols.iter().enumerate() {
            assert_eq!(pos[k], g.position(3, c).unwrap());
        }
        assert!(g.positions_sorted(3, &[1, 3], &mut [0; 2]).is_err());
    }

    #[test]
    fn tables_build_element_couplings() {
        // two 1D elements: [0,1] and [1,2]
        let els = vec![vec![0, 1], vec![1, 2]];
        let g = MatrixGraph::from_tables(3, 3, &els, &els, false);
        assert_eq!(g.row_indices(0), &[0, 1]);
        assert_eq!(g.row_indices(1), &[0, 1, 2]);
        assert_eq!(g.row_indices(2), &[1, 2]);
        assert_eq!(g.nze(), 7);

        let s = MatrixGraph::from_tables(3, 3, &els, &els, true);
        assert_eq!(s.row_indices(1), &[0, 1]);
        assert_eq!(s.nze(), 5);
        assert!(s.is_lower_triangular());
    }

    #[test]
    fn same_nze_marks_repeated_rows() {
        let els = vec![vec![0, 1], vec![2]];
        let g = MatrixGraph::from_tables(3, 3, &els, &els, false);
        assert!(!g.same_pattern(0));
        assert!(g.same_pattern(1));
        assert!(!g.same_pattern(2));
    }

    #[test]
    fn take_leaves_empty_graph() {
        let mut g = tridiagonal(4);
        let stolen = g.take();
        assert_eq!(stolen.size(), 4);
        assert_eq!(g.size(), 0);
        assert_eq!(g.nze(), 0);
    }

    #[test]
    fn raw_parts_reject_unsorted_rows() {
        let err = MatrixGraph::from_raw_parts(2, 2, vec![0, 2, 3], vec![1, 0, 1]).unwrap_err();
        assert!(matches!(err, SparseError::InvalidGraph(_)));
        let ok = MatrixGraph::from_raw_parts(2, 2, vec![0, 2, 4], vec![0, 1, 1, UNUSED]).unwrap();
        assert_eq!(ok.row_indices(1), &[1]);
        assert_eq!(ok.capacity(1), 2);
    }

    #[test]
    fn display_lists_columns() {
        let g = tridiagonal(2);
        assert_eq!(g.to_string(), "Row 0:   0   1\nRow 1:   0   1\n");
    }
}
