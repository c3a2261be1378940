//! Contiguous row ranges balanced by work, for row-parallel kernels.

use std::ops::Range;

/// Division of `0..n` into contiguous ranges.
///
/// `bounds` has one more element than there are ranges; range `k` is
/// `bounds[k]..bounds[k + 1]`. Ranges may be empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partitioning {
    bounds: Vec<usize>,
}

impl Default for Partitioning {
    fn default() -> Self {
        Self::single(0)
    }
}

impl Partitioning {
    /// One range covering `0..n`.
    pub fn single(n: usize) -> Self {
        Self { bounds: vec![0, n] }
    }

    /// Split `0..n` into `parts` ranges of approximately equal total cost.
    pub fn balanced(n: usize, parts: usize, cost: impl Fn(usize) -> usize) -> Self {
        let parts = parts.clamp(1, n.max(1));
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0usize);
        for i in 0..n {
            let last = prefix[i];
            prefix.push(last + cost(i));
        }
        let total = prefix[n];
        let mut bounds = Vec::with_capacity(parts + 1);
        bounds.push(0);
        for k in 1..parts {
            let goal = total * k / parts;
            let b = prefix.partition_point(|&p| p < goal).min(n);
            let prev = *bounds.last().unwrap_or(&0);
            bounds.push(b.max(prev));
        }
        bounds.push(n);
        Self { bounds }
    }

    /// Number of partitions to use when none is requested.
    pub fn default_parts() -> usize {
        #[cfg(feature = "rayon")]
        {
            num_cpus::get()
        }
        #[cfg(not(feature = "rayon"))]
        {
            1
        }
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Total number of covered indices.
    pub fn size(&self) -> usize {
        self.bounds[self.bounds.len() - 1]
    }

    pub fn range(&self, k: usize) -> Range<usize> {
        self.bounds[k]..self.bounds[k + 1]
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.bounds.windows(2).map(|w| w[0]..w[1])
    }

    /// Split `y` into the disjoint chunks matching each range.
    pub fn split_mut<'a, V>(&self, y: &'a mut [V]) -> Vec<(Range<usize>, &'a mut [V])> {
        assert_eq!(self.size(), y.len(), "partition does not cover the vector");
        let mut out = Vec::with_capacity(self.len());
        let mut rest = y;
        for r in self.ranges() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(r.len());
            out.push((r, head));
            rest = tail;
        }
        out
    }
}
