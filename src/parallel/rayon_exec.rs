// rayon-based range execution

use std::ops::Range;

use rayon::prelude::*;

use super::{Exec, Partitioning};
use crate::core::traits::VecEntry;

/// Runs ranges on the global rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonExec;

impl RayonExec {
    /// Build the global pool with one thread per core (no-op if it exists).
    pub fn new() -> Self {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build_global()
            .ok();
        RayonExec
    }
}

impl Exec for RayonExec {
    fn num_workers(&self) -> usize {
        rayon::current_num_threads()
    }

    fn for_each_range<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: Send,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        parts
            .split_mut(y)
            .into_par_iter()
            .for_each(|(r, chunk)| f(r, chunk));
    }

    fn scatter_ranges<V, F>(&self, parts: &Partitioning, y: &mut [V], f: F)
    where
        V: VecEntry,
        F: Fn(Range<usize>, &mut [V]) + Sync + Send,
    {
        if parts.len() <= 1 {
            for r in parts.ranges() {
                f(r, y);
            }
            return;
        }
        let width = y.len();
        let summed = (0..parts.len())
            .into_par_iter()
            .map(|k| {
                let mut buf = vec![V::zero(); width];
                f(parts.range(k), &mut buf);
                buf
            })
            .reduce_with(|mut a, b| {
                for (ai, bi) in a.iter_mut().zip(b) {
                    *ai += bi;
                }
                a
            });
        if let Some(buf) = summed {
            for (yi, bi) in y.iter_mut().zip(buf) {
                *yi += bi;
            }
        }
    }
}
