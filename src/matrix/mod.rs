//! Sparse matrices: graph, value storage, general and symmetric operations.

pub mod dense;
pub mod graph;
pub mod matmult;
pub mod sparse;
pub mod symmetric;
pub mod values;

#[cfg(feature = "serde")]
pub mod archive;

pub use graph::{MatrixGraph, UNUSED};
pub use matmult::{mat_mult, restrict, transpose};
pub use sparse::{SparseMatrix, Storage};
pub use values::{ConcurrentAssembler, FlatValues, FlatValuesMut, ValueStore};

#[cfg(feature = "serde")]
pub use archive::MatrixArchive;
