//! Factories and solver hints attached to sparse matrices.
//!
//! Modules:
//! - [`pc_context`]: the `PC` request enum, `Capabilities` and the
//!   `SparseFactory` trait with its implementations.
//! - [`hints`]: `SolverHints`, the inverse-type tag and SPD flag.

pub mod hints;
pub mod pc_context;

pub use hints::SolverHints;
pub use pc_context::{BoxedPrecond, Capabilities, PC, SparseFactory};
