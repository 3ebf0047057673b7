//! Dense bitset backed by `u64` words.
//!
//! Used both as an edge mask (one bit per edge, set = live) and as a
//! reachability row (one bit per vertex, set = reached).

/// Fixed-length dense bitset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitRow {
    words: Vec<u64>,
    len: usize,
}

/// One diffusion realization: bit `e` set means edge `e` is live.
pub type EdgeMask = BitRow;

/// Vertices reached from a seed set under one realization.
pub type ReachSet = BitRow;

impl BitRow {
    /// All-zero row able to track `n` bits.
    pub fn with_size(n: usize) -> Self {
        Self {
            words: vec![0; n.div_ceil(64)],
            len: n,
        }
    }

    /// All-one row of `n` bits.
    pub fn full(n: usize) -> Self {
        let mut row = Self {
            words: vec![u64::MAX; n.div_ceil(64)],
            len: n,
        };
        row.mask_tail();
        row
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        debug_assert!(i < self.len, "bit {i} out of range {}", self.len);
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    /// Set bit `i`, returning `true` if it was previously clear.
    #[inline]
    pub fn insert(&mut self, i: usize) -> bool {
        let word = &mut self.words[i / 64];
        let bit = 1u64 << (i % 64);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    #[inline]
    pub fn unset(&mut self, i: usize) {
        self.words[i / 64] &= !(1u64 << (i % 64));
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        i < self.len && (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Indices of set bits in increasing order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            let mut rest = w;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let tz = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * 64 + tz)
            })
        })
    }

    fn mask_tail(&mut self) {
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_row_counts_exactly_len() {
        for n in [0, 1, 63, 64, 65, 130] {
            assert_eq!(BitRow::full(n).count_ones(), n, "n = {n}");
        }
    }

    #[test]
    fn insert_reports_freshness() {
        let mut row = BitRow::with_size(70);
        assert!(row.insert(69));
        assert!(!row.insert(69));
        assert!(row.get(69));
        row.unset(69);
        assert!(!row.get(69));
    }

    #[test]
    fn ones_are_sorted() {
        let mut row = BitRow::with_size(6);
        for i in [5, 0, 2] {
            row.set(i);
        }
        assert_eq!(row.ones().collect::<Vec<_>>(), vec![0, 2, 5]);
        assert!(!row.get(100));
    }
}
