//! Preconditioners built by the sparse matrix factories.
//!
//! Every preconditioner is an operator: `mult_add` adds `s · M⁻¹ · x`, so it
//! can stand wherever a matrix is expected.

use crate::core::traits::{MatVec, VecEntry};
use crate::error::SparseError;

/// A preconditioner M⁻¹ ≈ A⁻¹.
pub trait Preconditioner<V: VecEntry>: MatVec<V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &[V], z: &mut [V]) -> Result<(), SparseError> {
        if r.len() != self.width() {
            return Err(SparseError::DimensionMismatch { expected: self.width(), found: r.len() });
        }
        if z.len() != self.height() {
            return Err(SparseError::DimensionMismatch { expected: self.height(), found: z.len() });
        }
        self.matvec(r, z);
        Ok(())
    }
}

pub mod block_jacobi;
pub mod jacobi;

pub use block_jacobi::BlockJacobi;
pub use jacobi::Jacobi;

pub use crate::context::pc_context::PC;
