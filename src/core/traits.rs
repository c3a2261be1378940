//! Core entry and operator traits for blocksparse.
//!
//! A sparse matrix stores *block entries* (`BlockEntry`): a scalar, or a small
//! square dense block for coupled multi-field problems. Vectors multiplied by
//! the matrix are slices of *vector entries* (`VecEntry`). The product of an
//! entry with a vector entry is provided by `EntryMul`, so every kernel is
//! monomorphized for its entry/vector pair.

use std::fmt::Debug;
use std::ops::AddAssign;

use num_traits::{NumAssign, One};

/// Scalar field of entries and vectors (`f64` or `Complex64`).
pub trait Scalar: NumAssign + Copy + Send + Sync + Debug + PartialEq + 'static {
    /// Embed a real number.
    fn from_real(re: f64) -> Self;
    /// Absolute value (modulus for complex numbers).
    fn modulus(self) -> f64;
    /// Atomically add `value` to the scalar behind `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for reads and writes, aligned to 8 bytes, and every
    /// concurrent access to it must go through `atomic_add` as well.
    unsafe fn atomic_add(dst: *mut Self, value: Self);
}

/// A matrix entry: a scalar or a fixed-size dense block.
pub trait BlockEntry: Copy + Send + Sync + Debug + PartialEq + 'static {
    type Scalar: Scalar;
    /// Block height (1 for scalar entries).
    const HEIGHT: usize;
    /// Block width (1 for scalar entries).
    const WIDTH: usize;

    /// The null entry.
    fn zero() -> Self;
    /// Row-major view of the `HEIGHT * WIDTH` scalars.
    fn as_scalars(&self) -> &[Self::Scalar];
    /// Mutable row-major view of the `HEIGHT * WIDTH` scalars.
    fn as_scalars_mut(&mut self) -> &mut [Self::Scalar];
    fn transpose(&self) -> Self;
    /// Inverse of the block, `None` when singular.
    fn inverse(&self) -> Option<Self>;
    /// Pointer to scalar `k` (in `as_scalars` order) of the entry behind `entry`.
    ///
    /// # Safety
    /// `entry` must point to a live entry and `k < HEIGHT * WIDTH`.
    unsafe fn scalar_ptr(entry: *mut Self, k: usize) -> *mut Self::Scalar;

    fn from_scalars(values: &[Self::Scalar]) -> Self {
        let mut e = Self::zero();
        e.as_scalars_mut().copy_from_slice(values);
        e
    }

    /// `self += s * other`, scalar by scalar.
    fn add_scaled(&mut self, s: Self::Scalar, other: &Self) {
        for (a, &b) in self.as_scalars_mut().iter_mut().zip(other.as_scalars()) {
            *a += s * b;
        }
    }
}

/// An element of a vector the matrix acts on.
pub trait VecEntry: AddAssign + Copy + Send + Sync + Debug + PartialEq + 'static {
    type Scalar: Scalar;
    fn zero() -> Self;
    /// Multiply by a scalar.
    fn scale(self, s: Self::Scalar) -> Self;
}

/// Product of a block entry with a vector entry.
pub trait EntryMul<V: VecEntry>: BlockEntry {
    /// `A * x`
    fn mul_vec(&self, x: &V) -> V;
    /// `Aᵀ * y`
    fn trans_mul_vec(&self, y: &V) -> V;
}

/// Matrix-like operator: y ← y + s·A·x and y ← y + s·Aᵀ·x.
///
/// Implemented by sparse matrices, preconditioners and inverse wrappers.
pub trait MatVec<V: VecEntry>: Send + Sync {
    /// Number of rows.
    fn height(&self) -> usize;
    /// Number of columns.
    fn width(&self) -> usize;
    /// Compute y += s · A · x.
    fn mult_add(&self, s: V::Scalar, x: &[V], y: &mut [V]);
    /// Compute y += s · Aᵀ · x.
    fn mult_trans_add(&self, s: V::Scalar, x: &[V], y: &mut [V]);

    /// Compute y = A · x.
    fn matvec(&self, x: &[V], y: &mut [V]) {
        y.fill(V::zero());
        self.mult_add(V::Scalar::one(), x, y);
    }
}
