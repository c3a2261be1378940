//! Direct-solver selection for inverse factories.
//!
//! `InverseType` names the backend a factory should use when it is asked
//! for an inverse. Only the dense LU backend is built in; the other tags are
//! accepted so that configurations naming them parse, and factories report
//! them as unavailable.

use std::fmt;
use std::str::FromStr;

use crate::error::SparseError;

/// Backend used by [`inverse_matrix`](crate::context::SparseFactory::inverse_matrix).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InverseType {
    /// Dense LU with full pivoting (faer).
    #[default]
    DenseLu = 0,
    SparseCholesky = 1,
    Pardiso = 2,
    PardisoSpd = 3,
    Mumps = 4,
    Umfpack = 5,
    SuperLu = 6,
    SuperLuDist = 7,
    MasterInverse = 8,
}

impl InverseType {
    pub const ALL: [InverseType; 9] = [
        InverseType::DenseLu,
        InverseType::SparseCholesky,
        InverseType::Pardiso,
        InverseType::PardisoSpd,
        InverseType::Mumps,
        InverseType::Umfpack,
        InverseType::SuperLu,
        InverseType::SuperLuDist,
        InverseType::MasterInverse,
    ];

    /// Name accepted by `from_str` and printed by `Display`.
    pub fn name(self) -> &'static str {
        match self {
            InverseType::DenseLu => "denselu",
            InverseType::SparseCholesky => "sparsecholesky",
            InverseType::Pardiso => "pardiso",
            InverseType::PardisoSpd => "pardisospd",
            InverseType::Mumps => "mumps",
            InverseType::Umfpack => "umfpack",
            InverseType::SuperLu => "superlu",
            InverseType::SuperLuDist => "superlu_dist",
            InverseType::MasterInverse => "masterinverse",
        }
    }

    /// Tag stored in [`SolverHints`](crate::context::SolverHints).
    pub(crate) fn from_tag(tag: u8) -> Self {
        Self::ALL.get(tag as usize).copied().unwrap_or_default()
    }
}

impl fmt::Display for InverseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InverseType {
    type Err = SparseError;

    /// Case-insensitive; `sparsecholesky` may also be given as `cholesky`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if key == "cholesky" {
            return Ok(InverseType::SparseCholesky);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or_else(|| SparseError::UnknownInverseType(s.to_string()))
    }
}
