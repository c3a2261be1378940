//! Direct solver wrappers behind the inverse factories.

pub mod direct_lu;
pub use direct_lu::{DenseInverse, DenseLu};
