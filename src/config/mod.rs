//! Runtime configuration: inverse backend selection.

pub mod options;
pub use options::InverseType;
