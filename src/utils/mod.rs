//! Small helper types shared across modules.

pub mod bitarray;
pub use bitarray::BitArray;
