//! Small fixed-size dense blocks used as matrix and vector entries.
//!
//! `SmallMat<S, N>` is an `N × N` row-major block and `SmallVec<S, N>` the
//! matching vector entry, for systems with `N` coupled fields per node.

use std::ops::{AddAssign, Index, IndexMut};

use crate::core::traits::{BlockEntry, EntryMul, Scalar, VecEntry};

/// Dense `N × N` block, row-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmallMat<S, const N: usize>(pub [[S; N]; N]);

/// Vector entry with `N` components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmallVec<S, const N: usize>(pub [S; N]);

impl<S: Scalar, const N: usize> SmallMat<S, N> {
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> S) -> Self {
        Self(std::array::from_fn(|i| std::array::from_fn(|j| f(i, j))))
    }

    pub fn identity() -> Self {
        Self::from_fn(|i, j| if i == j { S::one() } else { S::zero() })
    }
}

impl<S, const N: usize> Index<(usize, usize)> for SmallMat<S, N> {
    type Output = S;
    fn index(&self, (i, j): (usize, usize)) -> &S {
        &self.0[i][j]
    }
}

impl<S, const N: usize> IndexMut<(usize, usize)> for SmallMat<S, N> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut S {
        &mut self.0[i][j]
    }
}

impl<S: Scalar, const N: usize> BlockEntry for SmallMat<S, N> {
    type Scalar = S;
    const HEIGHT: usize = N;
    const WIDTH: usize = N;

    fn zero() -> Self {
        Self([[S::zero(); N]; N])
    }

    fn as_scalars(&self) -> &[S] {
        self.0.as_flattened()
    }

    fn as_scalars_mut(&mut self) -> &mut [S] {
        self.0.as_flattened_mut()
    }

    unsafe fn scalar_ptr(entry: *mut Self, k: usize) -> *mut S {
        debug_assert!(k < N * N);
        // SAFETY: the rows of `[[S; N]; N]` are contiguous, so the block is
        // `N * N` consecutive scalars in row-major order.
        unsafe { (&raw mut (*entry).0).cast::<S>().add(k) }
    }

    fn transpose(&self) -> Self {
        Self::from_fn(|i, j| self.0[j][i])
    }

    /// Gauss-Jordan elimination with partial pivoting.
    fn inverse(&self) -> Option<Self> {
        let mut a = self.0;
        let mut inv = Self::identity().0;
        for k in 0..N {
            let pivot = (k..N).max_by(|&p, &q| {
                a[p][k].modulus().total_cmp(&a[q][k].modulus())
            })?;
            if a[pivot][k].modulus() == 0.0 {
                return None;
            }
            a.swap(k, pivot);
            inv.swap(k, pivot);
            let d = S::one() / a[k][k];
            for j in 0..N {
                a[k][j] *= d;
                inv[k][j] *= d;
            }
            for i in 0..N {
                if i == k {
                    continue;
                }
                let f = a[i][k];
                if f == S::zero() {
                    continue;
                }
                for j in 0..N {
                    let akj = a[k][j];
                    let ikj = inv[k][j];
                    a[i][j] -= f * akj;
                    inv[i][j] -= f * ikj;
                }
            }
        }
        Some(Self(inv))
    }
}

impl<S: Scalar, const N: usize> AddAssign for SmallVec<S, N> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl<S, const N: usize> Index<usize> for SmallVec<S, N> {
    type Output = S;
    fn index(&self, i: usize) -> &S {
        &self.0[i]
    }
}

impl<S, const N: usize> IndexMut<usize> for SmallVec<S, N> {
    fn index_mut(&mut self, i: usize) -> &mut S {
        &mut self.0[i]
    }
}

impl<S: Scalar, const N: usize> VecEntry for SmallVec<S, N> {
    type Scalar = S;

    fn zero() -> Self {
        Self([S::zero(); N])
    }

    fn scale(self, s: S) -> Self {
        Self(self.0.map(|v| v * s))
    }
}

impl<S: Scalar, const N: usize> EntryMul<SmallVec<S, N>> for SmallMat<S, N> {
    fn mul_vec(&self, x: &SmallVec<S, N>) -> SmallVec<S, N> {
        SmallVec(std::array::from_fn(|i| {
            let mut sum = S::zero();
            for j in 0..N {
                sum += self.0[i][j] * x.0[j];
            }
            sum
        }))
    }

    fn trans_mul_vec(&self, y: &SmallVec<S, N>) -> SmallVec<S, N> {
        SmallVec(std::array::from_fn(|j| {
            let mut sum = S::zero();
            for i in 0..N {
                sum += self.0[i][j] * y.0[i];
            }
            sum
        }))
    }
}
