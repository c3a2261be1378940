//! Solver hints attached to a matrix.
//!
//! The inverse-type tag and the SPD flag are configuration for downstream
//! factories, not matrix state. They live behind atomics in a separate object
//! so they can be changed through a shared reference to the matrix, and
//! several matrices may share one `SolverHints`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::debug;

use crate::config::options::InverseType;
use crate::error::SparseError;

pub struct SolverHints {
    inverse: AtomicU8,
    spd: AtomicBool,
}

impl SolverHints {
    pub fn new(inverse: InverseType, spd: bool) -> Self {
        Self { inverse: AtomicU8::new(inverse as u8), spd: AtomicBool::new(spd) }
    }

    pub fn inverse_type(&self) -> InverseType {
        InverseType::from_tag(self.inverse.load(Ordering::Relaxed))
    }

    /// Select the inverse backend; returns the previous selection.
    pub fn set_inverse_type(&self, inverse: InverseType) -> InverseType {
        let old = InverseType::from_tag(self.inverse.swap(inverse as u8, Ordering::Relaxed));
        debug!(%old, new = %inverse, "changed inverse type");
        old
    }

    /// Select the inverse backend by name.
    pub fn set_inverse_type_str(&self, name: &str) -> Result<InverseType, SparseError> {
        Ok(self.set_inverse_type(name.parse()?))
    }

    pub fn set_spd(&self, spd: bool) {
        self.spd.store(spd, Ordering::Relaxed);
    }

    pub fn is_spd(&self) -> bool {
        self.spd.load(Ordering::Relaxed)
    }
}

impl Default for SolverHints {
    fn default() -> Self {
        Self::new(InverseType::default(), false)
    }
}

impl Clone for SolverHints {
    fn clone(&self) -> Self {
        Self::new(self.inverse_type(), self.is_spd())
    }
}

impl fmt::Debug for SolverHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverHints")
            .field("inverse", &self.inverse_type())
            .field("spd", &self.is_spd())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_inverse_type_returns_previous() {
        let h = SolverHints::default();
        assert_eq!(h.set_inverse_type(InverseType::Mumps), InverseType::DenseLu);
        assert_eq!(h.set_inverse_type_str("umfpack").unwrap(), InverseType::Mumps);
        assert_eq!(h.inverse_type(), InverseType::Umfpack);
        assert!(h.set_inverse_type_str("nope").is_err());
        assert_eq!(h.inverse_type(), InverseType::Umfpack);
    }

    #[test]
    fn clone_is_independent() {
        let h = SolverHints::new(InverseType::Pardiso, true);
        let c = h.clone();
        h.set_spd(false);
        assert!(c.is_spd());
        assert_eq!(c.inverse_type(), InverseType::Pardiso);
    }
}
