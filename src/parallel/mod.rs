//! Execution of row-range kernels: serial or on the rayon thread pool.
//!
//! The core never owns a thread pool. Kernels hand an `Exec` a
//! `Partitioning` and a closure per range; the executor decides how the
//! ranges are run.

use std::ops::Range;

use crate::core::traits::VecEntry;

pub mod partition;
pub use partition::Partitioning;

#[cfg(feature = "rayon")]
pub mod rayon_exec;
#[cfg(feature = "rayon")]
pub use rayon_exec::RayonExec;

pub trait Exec {
    /// Number of workers the executor runs ranges on.
    fn num_workers(&self) -> usize;

    /// Run `f` on every range with the matching disjoint chunk of `y`.
    ///
    /// `parts` must cover `y` exactly.
    fn for_each_range<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: Send,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send;

    /// Run `f` on every range; each call may add into any entry of `y`.
    ///
    /// Calls for different ranges must not race on `y`, so concurrent
    /// executors give each range a private zeroed buffer and sum the buffers
    /// into `y` afterwards.
    fn scatter_ranges<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: VecEntry,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send;
}

/// Runs every range on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialExec;

impl Exec for SerialExec {
    fn num_workers(&self) -> usize {
        1
    }

    fn for_each_range<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: Send,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        for (r, chunk) in parts.split_mut(y) {
            f(r, chunk);
        }
    }

    fn scatter_ranges<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: VecEntry,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        for r in parts.ranges() {
            f(r, y);
        }
    }
}

/// Executor selected by the caller.
#[derive(Clone, Copy, Debug)]
pub enum Executor {
    Serial(SerialExec),
    #[cfg(feature = "rayon")]
    Rayon(RayonExec),
}

impl Default for Executor {
    fn default() -> Self {
        #[cfg(feature = "rayon")]
        {
            Executor::Rayon(RayonExec)
        }
        #[cfg(not(feature = "rayon"))]
        {
            Executor::Serial(SerialExec)
        }
    }
}

impl Exec for Executor {
    fn num_workers(&self) -> usize {
        match self {
            Executor::Serial(e) => e.num_workers(),
            #[cfg(feature = "rayon")]
            Executor::Rayon(e) => e.num_workers(),
        }
    }

    fn for_each_range<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: Send,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        match self {
            Executor::Serial(e) => e.for_each_range(parts, y, f),
            #[cfg(feature = "rayon")]
            Executor::Rayon(e) => e.for_each_range(parts, y, f),
        }
    }

    fn scatter_ranges<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: VecEntry,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        match self {
            Executor::Serial(e) => e.scatter_ranges(parts, y, f),
            #[cfg(feature = "rayon")]
            Executor::Rayon(e) => e.scatter_ranges(parts, y, f),
        }
    }
}
