//! Fixed-size bit set marking an active subset of rows or columns.

/// Fixed-length bit array, used to restrict preconditioners, inverses and
/// symmetric multiply passes to a subset of dofs.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BitArray {
    len: usize,
    words: Vec<u64>,
}

impl BitArray {
    /// All bits cleared.
    pub fn new(len: usize) -> Self {
        Self { len, words: vec![0; len.div_ceil(64)] }
    }

    /// All bits set.
    pub fn full(len: usize) -> Self {
        let mut b = Self::new(len);
        for i in 0..len {
            b.set(i);
        }
        b
    }

    /// Bits set at the given indices.
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut b = Self::new(len);
        for i in indices {
            b.set(i);
        }
        b
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "bit {} out of range {}", i, self.len);
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    #[inline]
    pub fn clear(&mut self, i: usize) {
        assert!(i < self.len, "bit {} out of range {}", i, self.len);
        self.words[i / 64] &= !(1u64 << (i % 64));
    }

    #[inline]
    pub fn test(&self, i: usize) -> bool {
        i < self.len && self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.test(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_test() {
        let mut b = BitArray::new(130);
        b.set(0);
        b.set(64);
        b.set(129);
        assert!(b.test(64));
        assert!(!b.test(65));
        assert_eq!(b.count(), 3);
        b.clear(64);
        assert_eq!(b.iter_ones().collect::<Vec<_>>(), vec![0, 129]);
        assert!(!b.test(500));
    }

    #[test]
    fn full_has_every_bit() {
        let b = BitArray::full(70);
        assert_eq!(b.count(), 70);
    }
}
