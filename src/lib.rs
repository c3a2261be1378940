//! blocksparse: compressed sparse-row matrices with block entries
//!
//! This crate provides CRS matrices over scalar or small dense block entries, with
//! general or symmetric (lower-triangle) storage, element-matrix assembly (exclusive or
//! atomic), row-balanced parallel multiply, and preconditioner / inverse factories behind
//! a capability query.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::config::InverseType;
pub use crate::context::{Capabilities, PC, SolverHints, SparseFactory};
pub use crate::core::{BlockEntry, EntryMul, MatVec, Scalar, SmallMat, SmallVec, VecEntry};
pub use crate::error::SparseError;
pub use crate::matrix::{mat_mult, ConcurrentAssembler, MatrixGraph, SparseMatrix, Storage};
pub use crate::parallel::{Exec, Executor, Partitioning, SerialExec};
pub use crate::preconditioner::Preconditioner;
pub use crate::utils::BitArray;
