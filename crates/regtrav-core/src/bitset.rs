//! Fixed-capacity bit set.
//!
//! Used for capture-group boundary sets, referenced-group sets and
//! matched-condition sets. Capacity is fixed at construction; two sets built
//! for the same `Ast` always compare and hash consistently.

const WORD_BITS: usize = 64;

/// A set of small non-negative integers backed by `u64` words.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Create an empty set able to hold values in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `bit`, returning `true` if it was not present.
    ///
    /// Panics if `bit` is out of capacity.
    #[inline]
    pub fn insert(&mut self, bit: usize) -> bool {
        assert!(
            bit < self.capacity,
            "bit {bit} out of capacity {}",
            self.capacity
        );
        let (word, mask) = (bit / WORD_BITS, 1u64 << (bit % WORD_BITS));
        let absent = self.words[word] & mask == 0;
        self.words[word] |= mask;
        absent
    }

    /// Remove `bit`, returning `true` if it was present.
    #[inline]
    pub fn remove(&mut self, bit: usize) -> bool {
        if bit >= self.capacity {
            return false;
        }
        let (word, mask) = (bit / WORD_BITS, 1u64 << (bit % WORD_BITS));
        let present = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        present
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        bit < self.capacity && self.words[bit / WORD_BITS] & (1u64 << (bit % WORD_BITS)) != 0
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Keep only the bits also present in `mask`.
    pub fn intersect_with(&mut self, mask: &BitSet) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= mask.words.get(i).copied().unwrap_or(0);
        }
    }

    pub fn union_with(&mut self, other: &BitSet) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    /// Iterate set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_contains() {
        let mut set = BitSet::new(130);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(0));
        assert!(set.contains(129));
        assert!(!set.contains(64));
        assert_eq!(set.len(), 2);

        assert!(set.remove(0));
        assert!(!set.remove(0));
        assert!(!set.remove(500));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![129]);
    }

    #[test]
    fn iter_is_ascending_across_words() {
        let mut set = BitSet::new(200);
        for bit in [199, 3, 64, 65, 127] {
            set.insert(bit);
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 64, 65, 127, 199]);
    }

    #[test]
    fn intersect_and_union() {
        let mut a = BitSet::new(10);
        let mut b = BitSet::new(10);
        a.insert(1);
        a.insert(2);
        b.insert(2);
        b.insert(7);

        let mut both = a.clone();
        both.intersect_with(&b);
        assert_eq!(both.iter().collect::<Vec<_>>(), vec![2]);

        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 7]);
    }

    #[test]
    fn zero_capacity_is_empty() {
        let set = BitSet::new(0);
        assert!(set.is_empty());
        assert!(!set.contains(0));
        assert_eq!(format!("{set:?}"), "{}");
    }

    #[test]
    #[should_panic(expected = "out of capacity")]
    fn insert_out_of_capacity_panics() {
        BitSet::new(4).insert(4);
    }
}
