// Jacobi preconditioner implementation

use tracing::debug;

use crate::core::traits::{BlockEntry, EntryMul, MatVec, VecEntry};
use crate::error::SparseError;
use crate::matrix::SparseMatrix;
use crate::preconditioner::Preconditioner;
use crate::utils::BitArray;

/// Jacobi preconditioner: M⁻¹ = D⁻¹, with block inverses for block entries.
///
/// Rows outside `inner` get a zero block.
#[derive(Clone, Debug)]
pub struct Jacobi<TM> {
    pub(crate) inv_diag: Vec<TM>,
}

impl<TM: BlockEntry> Jacobi<TM> {
    pub fn new(a: &SparseMatrix<TM>, inner: Option<&BitArray>) -> Result<Self, SparseError> {
        if a.height() != a.width() {
            return Err(SparseError::DimensionMismatch { expected: a.height(), found: a.width() });
        }
        let inv_diag = (0..a.height())
            .map(|i| {
                if inner.is_some_and(|b| !b.test(i)) {
                    return Ok(TM::zero());
                }
                a.get(i, i).inverse().ok_or(SparseError::ZeroPivot(i))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = a.height(), restricted = inner.is_some(), "created jacobi preconditioner");
        Ok(Self { inv_diag })
    }

    /// Inverted diagonal blocks.
    pub fn inverse_diagonal(&self) -> &[TM] {
        &self.inv_diag
    }
}

impl<TM, V> MatVec<V> for Jacobi<TM>
where
    TM: EntryMul<V>,
    V: VecEntry,
{
    fn height(&self) -> usize {
        self.inv_diag.len()
    }

    fn width(&self) -> usize {
        self.inv_diag.len()
    }

    fn mult_add(&self, s: V::Scalar, x: &[V], y: &mut [V]) {
        assert_eq!(x.len(), self.inv_diag.len());
        assert_eq!(y.len(), self.inv_diag.len());
        for ((d, xi), yi) in self.inv_diag.iter().zip(x).zip(y.iter_mut()) {
            *yi += d.mul_vec(xi).scale(s);
        }
    }

    fn mult_trans_add(&self, s: V::Scalar, x: &[V], y: &mut [V]) {
        assert_eq!(x.len(), self.inv_diag.len());
        assert_eq!(y.len(), self.inv_diag.len());
        for ((d, xi), yi) in self.inv_diag.iter().zip(x).zip(y.iter_mut()) {
            *yi += d.trans_mul_vec(xi).scale(s);
        }
    }
}

impl<TM, V> Preconditioner<V> for Jacobi<TM>
where
    TM: EntryMul<V>,
    V: VecEntry,
{
}
