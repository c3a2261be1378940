//! Entry traits, block types and operator contract.

pub mod block;
pub mod traits;
pub mod wrappers;

pub use block::{SmallMat, SmallVec};
pub use traits::{BlockEntry, EntryMul, MatVec, Scalar, VecEntry};
