//! Serialized form of a sparse matrix.
//!
//! Fields are written in a fixed order: dimensions, the number of stored
//! positions, row offsets, column numbers of every slot (unused slots
//! included) and the values flattened to scalars. Reading rebuilds an equal
//! graph and bit-identical values.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::traits::BlockEntry;
use crate::error::SparseError;
use crate::matrix::graph::MatrixGraph;
use crate::matrix::sparse::{SparseMatrix, Storage};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixArchive<S> {
    pub size: usize,
    pub width: usize,
    pub nze: usize,
    pub row_start: Vec<usize>,
    pub col_index: Vec<usize>,
    pub values: Vec<S>,
}

impl<TM: BlockEntry> SparseMatrix<TM> {
    pub fn to_archive(&self) -> MatrixArchive<TM::Scalar> {
        MatrixArchive {
            size: self.height(),
            width: self.width(),
            nze: self.nze(),
            row_start: self.graph.row_offsets().to_vec(),
            col_index: self.graph.col_indices().to_vec(),
            values: self.as_flat().to_vec(),
        }
    }

    /// Rebuild a matrix with the given storage from its archive.
    pub fn from_archive(archive: MatrixArchive<TM::Scalar>, storage: Storage) -> Result<Self, SparseError> {
        let MatrixArchive { size, width, nze, row_start, col_index, values } = archive;
        if col_index.len() != nze {
            return Err(SparseError::InvalidGraph(format!(
                "archive lists {} columns for {} positions",
                col_index.len(),
                nze
            )));
        }
        let scalars = nze * TM::HEIGHT * TM::WIDTH;
        if values.len() != scalars {
            return Err(SparseError::DimensionMismatch { expected: scalars, found: values.len() });
        }
        let graph = Arc::new(MatrixGraph::from_raw_parts(size, width, row_start, col_index)?);
        let mut matrix = match storage {
            Storage::General => SparseMatrix::new(graph),
            Storage::SymmetricLower => SparseMatrix::symmetric(graph)?,
        };
        for (dst, src) in matrix.as_flat_mut().iter_mut().zip(values) {
            *dst = src;
        }
        debug!(rows = size, nze, ?storage, "read matrix archive");
        Ok(matrix)
    }
}
