use thiserror::Error;

use crate::config::options::InverseType;

// Unified error type for blocksparse

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparseError {
    #[error("position ({row}, {col}) is not in the sparsity pattern")]
    StructuralNotFound { row: usize, col: usize },
    #[error("row {row} is full: no free slot for column {col} (capacity {capacity})")]
    CapacityExceeded { row: usize, col: usize, capacity: usize },
    #[error("position ({row}, {col}) lies above the diagonal of a symmetric matrix")]
    OutsideLowerTriangle { row: usize, col: usize },
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("inverse backend {0} is not available")]
    BackendUnavailable(InverseType),
    #[error("unknown inverse type '{0}'")]
    UnknownInverseType(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
