//! Entry-trait implementations for the primitive scalar types.
//!
//! `f64` and `Complex64` act both as matrix entries and as vector entries.
//! A real matrix may also act on complex vectors, which covers complex scale
//! factors for real matrices.

use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex64;

use crate::core::traits::{BlockEntry, EntryMul, Scalar, VecEntry};

impl Scalar for f64 {
    #[inline]
    fn from_real(re: f64) -> Self {
        re
    }

    #[inline]
    fn modulus(self) -> f64 {
        self.abs()
    }

    #[inline]
    unsafe fn atomic_add(dst: *mut Self, value: Self) {
        debug_assert!(dst.cast::<u64>().is_aligned());
        // SAFETY: the caller guarantees validity, alignment and that all
        // concurrent accesses are atomic.
        let cell = unsafe { AtomicU64::from_ptr(dst.cast::<u64>()) };
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn from_real(re: f64) -> Self {
        Complex64::new(re, 0.0)
    }

    #[inline]
    fn modulus(self) -> f64 {
        self.norm()
    }

    #[inline]
    unsafe fn atomic_add(dst: *mut Self, value: Self) {
        // Complex<f64> is repr(C): real part followed by imaginary part.
        let parts = dst.cast::<f64>();
        // SAFETY: both parts lie inside the complex number behind `dst`.
        unsafe {
            f64::atomic_add(parts, value.re);
            f64::atomic_add(parts.add(1), value.im);
        }
    }
}

macro_rules! scalar_entry {
    ($t:ty) => {
        impl BlockEntry for $t {
            type Scalar = $t;
            const HEIGHT: usize = 1;
            const WIDTH: usize = 1;

            #[inline]
            fn zero() -> Self {
                <$t as num_traits::Zero>::zero()
            }
            #[inline]
            fn as_scalars(&self) -> &[$t] {
                std::slice::from_ref(self)
            }
            #[inline]
            fn as_scalars_mut(&mut self) -> &mut [$t] {
                std::slice::from_mut(self)
            }
            #[inline]
            fn transpose(&self) -> Self {
                *self
            }
            #[inline]
            unsafe fn scalar_ptr(entry: *mut Self, k: usize) -> *mut $t {
                debug_assert_eq!(k, 0);
                entry
            }
            fn inverse(&self) -> Option<Self> {
                if *self == <$t as num_traits::Zero>::zero() {
                    None
                } else {
                    Some(<$t as num_traits::One>::one() / *self)
                }
            }
        }

        impl VecEntry for $t {
            type Scalar = $t;
            #[inline]
            fn zero() -> Self {
                <$t as num_traits::Zero>::zero()
            }
            #[inline]
            fn scale(self, s: $t) -> Self {
                self * s
            }
        }

        impl EntryMul<$t> for $t {
            #[inline]
            fn mul_vec(&self, x: &$t) -> $t {
                *self * *x
            }
            #[inline]
            fn trans_mul_vec(&self, y: &$t) -> $t {
                *self * *y
            }
        }
    };
}

scalar_entry!(f64);
scalar_entry!(Complex64);

/// Real matrix acting on complex vectors.
impl EntryMul<Complex64> for f64 {
    #[inline]
    fn mul_vec(&self, x: &Complex64) -> Complex64 {
        *x * *self
    }
    #[inline]
    fn trans_mul_vec(&self, y: &Complex64) -> Complex64 {
        *y * *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_add_f64_accumulates() {
        let mut v = 1.5f64;
        unsafe {
            f64::atomic_add(&mut v, 2.0);
            f64::atomic_add(&mut v, -0.5);
        }
        assert_eq!(v, 3.0);
    }

    #[test]
    fn atomic_add_complex_adds_both_parts() {
        let mut z = Complex64::new(1.0, -1.0);
        unsafe { Complex64::atomic_add(&mut z, Complex64::new(0.5, 2.0)) };
        assert_eq!(z, Complex64::new(1.5, 1.0));
    }

    #[test]
    fn scalar_inverse() {
        assert_eq!(BlockEntry::inverse(&4.0f64), Some(0.25));
        assert_eq!(BlockEntry::inverse(&0.0f64), None);
    }
}
