//! Preconditioner and inverse factories of sparse matrices.
//!
//! A matrix advertises what it can build through [`Capabilities`]; every
//! factory method it does not override returns [`SparseError::Unsupported`]
//! instead of failing at runtime in some other way. [`PC`] names a
//! preconditioner together with its parameters so callers can request one
//! by value.
//!
//! # Example
//!
//! ```rust
//! use blocksparse::context::pc_context::{Capabilities, SparseFactory, PC};
//! use blocksparse::matrix::SparseMatrix;
//!
//! let mut a = SparseMatrix::<f64>::with_uniform_capacity(2, 1);
//! *a.entry_mut(0, 0).unwrap() = 2.0;
//! *a.entry_mut(1, 1).unwrap() = 4.0;
//! assert!(SparseFactory::<f64>::capabilities(&a).contains(Capabilities::JACOBI));
//! let pc = SparseFactory::<f64>::create_precond(&a, &PC::Jacobi { inner: None }).unwrap();
//! let mut z = vec![0.0; 2];
//! pc.apply(&[1.0, 1.0], &mut z).unwrap();
//! assert_eq!(z, vec![0.5, 0.25]);
//! ```

use bitflags::bitflags;
use num_complex::Complex64;
use tracing::{debug, warn};

use crate::config::options::InverseType;
use crate::core::block::{SmallMat, SmallVec};
use crate::core::traits::{EntryMul, Scalar, VecEntry};
use crate::error::SparseError;
use crate::matrix::{self, SparseMatrix};
use crate::preconditioner::{BlockJacobi, Jacobi, Preconditioner};
use crate::solver::DenseInverse;
use crate::utils::BitArray;

bitflags! {
    /// Operations a matrix factory supports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const JACOBI       = 0b0001;
        const BLOCK_JACOBI = 0b0010;
        const INVERSE      = 0b0100; // direct inverse on a subset or clusters
        const RESTRICT     = 0b1000;
    }
}

/// Preconditioner request.
#[derive(Debug, Clone)]
pub enum PC {
    /// Diagonal (block) scaling, optionally restricted to `inner`.
    Jacobi { inner: Option<BitArray> },
    /// Dense LU on each listed block of dofs.
    BlockJacobi { blocks: Vec<Vec<usize>> },
    /// Direct inverse on `subset`, or on all dofs.
    Inverse { subset: Option<BitArray> },
    /// Direct inverse on the dofs with a non-zero cluster number.
    InverseClusters { clusters: Vec<usize> },
}

pub type BoxedPrecond<V> = Box<dyn Preconditioner<V>>;

/// Factory hooks of a sparse matrix acting on vectors of `V`.
pub trait SparseFactory<V: VecEntry> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn create_jacobi_precond(&self, _inner: Option<&BitArray>) -> Result<BoxedPrecond<V>, SparseError> {
        Err(SparseError::Unsupported("create_jacobi_precond"))
    }

    fn create_block_jacobi_precond(&self, _blocks: &[Vec<usize>]) -> Result<BoxedPrecond<V>, SparseError> {
        Err(SparseError::Unsupported("create_block_jacobi_precond"))
    }

    fn inverse_matrix(&self, _subset: Option<&BitArray>) -> Result<BoxedPrecond<V>, SparseError> {
        Err(SparseError::Unsupported("inverse_matrix"))
    }

    fn inverse_matrix_clusters(&self, _clusters: &[usize]) -> Result<BoxedPrecond<V>, SparseError> {
        Err(SparseError::Unsupported("inverse_matrix_clusters"))
    }

    /// Galerkin restriction `Pᵀ A P`.
    fn restrict(&self, _prol: &SparseMatrix<f64>) -> Result<SparseMatrix<f64>, SparseError> {
        Err(SparseError::Unsupported("restrict"))
    }

    fn create_precond(&self, pc: &PC) -> Result<BoxedPrecond<V>, SparseError> {
        match pc {
            PC::Jacobi { inner } => self.create_jacobi_precond(inner.as_ref()),
            PC::BlockJacobi { blocks } => self.create_block_jacobi_precond(blocks),
            PC::Inverse { subset } => self.inverse_matrix(subset.as_ref()),
            PC::InverseClusters { clusters } => self.inverse_matrix_clusters(clusters),
        }
    }
}

fn jacobi<TM, V>(a: &SparseMatrix<TM>, inner: Option<&BitArray>) -> Result<BoxedPrecond<V>, SparseError>
where
    TM: EntryMul<V>,
    V: VecEntry,
{
    Ok(Box::new(Jacobi::new(a, inner)?))
}

/// The dense LU is the only built-in backend.
fn check_backend(a: &SparseMatrix<f64>) -> Result<(), SparseError> {
    match a.hints().inverse_type() {
        InverseType::DenseLu => Ok(()),
        other => {
            warn!(backend = %other, "requested inverse backend is not available");
            Err(SparseError::BackendUnavailable(other))
        }
    }
}

impl SparseFactory<f64> for SparseMatrix<f64> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn create_jacobi_precond(&self, inner: Option<&BitArray>) -> Result<BoxedPrecond<f64>, SparseError> {
        jacobi(self, inner)
    }

    fn create_block_jacobi_precond(&self, blocks: &[Vec<usize>]) -> Result<BoxedPrecond<f64>, SparseError> {
        Ok(Box::new(BlockJacobi::new(self, blocks)?))
    }

    fn inverse_matrix(&self, subset: Option<&BitArray>) -> Result<BoxedPrecond<f64>, SparseError> {
        check_backend(self)?;
        debug!(spd = self.hints().is_spd(), "creating dense inverse");
        Ok(Box::new(DenseInverse::new(self, subset)?))
    }

    fn inverse_matrix_clusters(&self, clusters: &[usize]) -> Result<BoxedPrecond<f64>, SparseError> {
        check_backend(self)?;
        Ok(Box::new(DenseInverse::from_clusters(self, clusters)?))
    }

    fn restrict(&self, prol: &SparseMatrix<f64>) -> Result<SparseMatrix<f64>, SparseError> {
        matrix::restrict(self, prol)
    }
}

/// Real matrix on complex vectors.
impl SparseFactory<Complex64> for SparseMatrix<f64> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::JACOBI
    }

    fn create_jacobi_precond(&self, inner: Option<&BitArray>) -> Result<BoxedPrecond<Complex64>, SparseError> {
        jacobi(self, inner)
    }
}

impl SparseFactory<Complex64> for SparseMatrix<Complex64> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::JACOBI
    }

    fn create_jacobi_precond(&self, inner: Option<&BitArray>) -> Result<BoxedPrecond<Complex64>, SparseError> {
        jacobi(self, inner)
    }
}

impl<S: Scalar, const N: usize> SparseFactory<SmallVec<S, N>> for SparseMatrix<SmallMat<S, N>> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::JACOBI
    }

    fn create_jacobi_precond(&self, inner: Option<&BitArray>) -> Result<BoxedPrecond<SmallVec<S, N>>, SparseError> {
        jacobi(self, inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagonal(values: &[f64]) -> SparseMatrix<f64> {
        let mut a = SparseMatrix::with_uniform_capacity(values.len(), 1);
        for (i, &v) in values.iter().enumerate() {
            *a.entry_mut(i, i).unwrap() = v;
        }
        a
    }

    #[test]
    fn complex_factory_lists_only_jacobi() {
        let a = diagonal(&[1.0, 2.0]);
        let caps = SparseFactory::<Complex64>::capabilities(&a);
        assert_eq!(caps, Capabilities::JACOBI);
        let err = SparseFactory::<Complex64>::inverse_matrix(&a, None).err();
        assert_eq!(err, Some(SparseError::Unsupported("inverse_matrix")));
        let pc = SparseFactory::<Complex64>::create_jacobi_precond(&a, None).unwrap();
        let mut z = vec![Complex64::new(0.0, 0.0); 2];
        pc.apply(&[Complex64::new(2.0, 2.0); 2], &mut z).unwrap();
        assert_eq!(z[1], Complex64::new(1.0, 1.0));
    }

    #[test]
    fn unavailable_backend_is_reported() {
        let a = diagonal(&[1.0, 2.0]);
        a.hints().set_inverse_type(InverseType::Pardiso);
        let err = SparseFactory::<f64>::inverse_matrix(&a, None).err();
        assert_eq!(err, Some(SparseError::BackendUnavailable(InverseType::Pardiso)));
        a.hints().set_inverse_type(InverseType::DenseLu);
        assert!(SparseFactory::<f64>::inverse_matrix(&a, None).is_ok());
    }

    #[test]
    fn create_precond_dispatches_on_request() {
        let a = diagonal(&[2.0, 4.0, 8.0]);
        let requests = [
            PC::Jacobi { inner: None },
            PC::BlockJacobi { blocks: vec![vec![0, 1], vec![2]] },
            PC::Inverse { subset: None },
            PC::InverseClusters { clusters: vec![1, 1, 2] },
        ];
        for pc in &requests {
            let m = SparseFactory::<f64>::create_precond(&a, pc).unwrap();
            let mut z = vec![0.0; 3];
            m.apply(&[2.0, 4.0, 8.0], &mut z).unwrap();
            for zi in z {
                approx::assert_abs_diff_eq!(zi, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn block_matrix_factory_builds_jacobi() {
        let mut a = SparseMatrix::<SmallMat<f64, 2>>::with_uniform_capacity(1, 1);
        *a.entry_mut(0, 0).unwrap() = SmallMat::identity();
        assert!(a.create_jacobi_precond(None).is_ok());
        assert!(matches!(a.inverse_matrix(None), Err(SparseError::Unsupported(_))));
        assert!(matches!(a.restrict(&SparseMatrix::with_uniform_capacity(1, 1)), Err(SparseError::Unsupported(_))));
    }
}
