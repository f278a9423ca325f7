//! Fixed-capacity selection bitmask.
//!
//! One bit per slot of a chunk, packed into 64-bit words:
//!
//! ```text
//! slot:   0 1 2 3 ... 63 | 64 65 ... 127 | ...
//! word:   0              | 1             | ...
//! bit:    slot & 63, word: slot >> 6
//! ```
//!
//! A fresh mask has every bit set, so a chunk whose mask was never touched
//! behaves as fully selected.

use std::fmt;

const WORD_BITS: usize = 64;
const WORD_SHIFT: usize = 6;
const WORD_MASK: usize = WORD_BITS - 1;

/// A bitmask over `N` slots.
///
/// `N` must be a power of two and at least 64.
#[derive(Clone, PartialEq, Eq)]
pub struct BitMask<const N: usize> {
    words: Box<[u64]>,
}

impl<const N: usize> BitMask<N> {
    const VALID_CAPACITY: () = assert!(
        N.is_power_of_two() && N >= WORD_BITS,
        "bitmask capacity must be a power of two and at least 64"
    );

    const WORDS: usize = N / WORD_BITS;

    /// Creates a mask with every bit set.
    #[must_use]
    pub fn new() -> Self {
        let () = Self::VALID_CAPACITY;
        Self {
            words: vec![u64::MAX; Self::WORDS].into_boxed_slice(),
        }
    }

    /// Creates a mask with every bit cleared.
    #[must_use]
    pub fn empty() -> Self {
        let () = Self::VALID_CAPACITY;
        Self {
            words: vec![0; Self::WORDS].into_boxed_slice(),
        }
    }

    /// Number of slots covered by the mask.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Sets the bit for `idx`.
    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < N);
        self.words[idx >> WORD_SHIFT] |= 1u64 << (idx & WORD_MASK);
    }

    /// Clears the bit for `idx`.
    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < N);
        self.words[idx >> WORD_SHIFT] &= !(1u64 << (idx & WORD_MASK));
    }

    /// Flips the bit for `idx`.
    #[inline]
    pub fn toggle(&mut self, idx: usize) {
        debug_assert!(idx < N);
        self.words[idx >> WORD_SHIFT] ^= 1u64 << (idx & WORD_MASK);
    }

    /// Returns `true` if the bit for `idx` is set.
    #[inline]
    #[must_use]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < N);
        self.words[idx >> WORD_SHIFT] & (1u64 << (idx & WORD_MASK)) != 0
    }

    /// Sets every bit.
    pub fn set_all(&mut self) {
        self.words.fill(u64::MAX);
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Intersects this mask with `other` in place.
    pub fn and_with(&mut self, other: &Self) {
        for (word, rhs) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= rhs;
        }
    }

    /// Overwrites this mask with the bits of `other`.
    pub fn copy_from(&mut self, other: &Self) {
        self.words.copy_from_slice(&other.words);
    }

    /// Number of set bits in the whole mask.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of set bits in `start..end`.
    #[must_use]
    pub fn count_ones_in(&self, start: usize, end: usize) -> usize {
        debug_assert!(start <= end && end <= N);
        if start >= end {
            return 0;
        }
        let first = start >> WORD_SHIFT;
        let last = (end - 1) >> WORD_SHIFT;
        let head = u64::MAX << (start & WORD_MASK);
        let tail = u64::MAX >> (WORD_MASK - ((end - 1) & WORD_MASK));
        if first == last {
            return (self.words[first] & head & tail).count_ones() as usize;
        }
        let mut count = (self.words[first] & head).count_ones() as usize;
        for word in &self.words[first + 1..last] {
            count += word.count_ones() as usize;
        }
        count + (self.words[last] & tail).count_ones() as usize
    }

    /// Returns `true` if any bit in `start..end` is set.
    #[must_use]
    pub fn any_in(&self, start: usize, end: usize) -> bool {
        (start..end).any(|idx| self.test(idx))
    }

    /// Iterates the indices of set bits in `start..end`.
    pub fn iter_ones_in(&self, start: usize, end: usize) -> impl Iterator<Item = usize> + '_ {
        (start..end).filter(|&idx| self.test(idx))
    }
}

impl<const N: usize> Default for BitMask<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for BitMask<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitMask")
            .field("capacity", &N)
            .field("ones", &self.count_ones())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Mask = BitMask<1024>;

    #[test]
    fn test_default_is_all_set() {
        let mask = Mask::default();
        assert_eq!(mask.capacity(), 1024);
        assert_eq!(mask.count_ones(), 1024);
        assert!(mask.test(0));
        assert!(mask.test(1023));
    }

    #[test]
    fn test_set_clear_toggle() {
        let mut mask = Mask::empty();
        assert_eq!(mask.count_ones(), 0);

        mask.set(65);
        assert!(mask.test(65));
        assert!(!mask.test(64));

        mask.toggle(65);
        assert!(!mask.test(65));
        mask.toggle(3);
        assert!(mask.test(3));

        mask.clear(3);
        assert!(!mask.test(3));
    }

    #[test]
    fn test_and_with_and_copy_from() {
        let mut a = Mask::new();
        let mut b = Mask::new();
        b.clear(10);
        b.clear(700);

        a.and_with(&b);
        assert!(!a.test(10));
        assert!(!a.test(700));
        assert_eq!(a.count_ones(), 1022);

        let mut c = Mask::empty();
        c.copy_from(&a);
        assert_eq!(c, a);

        c.set_all();
        assert_eq!(c.count_ones(), 1024);
        c.clear_all();
        assert_eq!(c.count_ones(), 0);
    }

    #[test]
    fn test_and_with_identities() {
        let mut mask = Mask::new();
        for idx in [0, 63, 64, 130, 511, 777, 1023] {
            mask.clear(idx);
        }
        let before = mask.clone();

        mask.and_with(&Mask::new());
        assert_eq!(mask, before);

        let copy = mask.clone();
        mask.and_with(&copy);
        assert_eq!(mask, before);

        let mut other = Mask::new();
        other.clear(5);
        other.clear(900);
        let mut left = before.clone();
        left.and_with(&other);
        left.and_with(&Mask::new());
        let mut right = other.clone();
        right.and_with(&before);
        assert_eq!(left, right);
        assert_eq!(left.count_ones(), 1024 - 9);
    }

    #[test]
    fn test_count_ones_in_ranges() {
        let mut mask = Mask::new();
        mask.clear(5);
        mask.clear(64);
        mask.clear(200);

        assert_eq!(mask.count_ones_in(0, 0), 0);
        assert_eq!(mask.count_ones_in(0, 5), 5);
        assert_eq!(mask.count_ones_in(0, 6), 5);
        assert_eq!(mask.count_ones_in(60, 70), 9);
        assert_eq!(mask.count_ones_in(0, 1024), 1021);
        assert_eq!(mask.count_ones_in(1023, 1024), 1);
        assert_eq!(mask.count_ones_in(63, 65), 1);
    }

    #[test]
    fn test_iter_ones_and_any() {
        let mut mask = Mask::empty();
        mask.set(2);
        mask.set(9);
        let ones: Vec<_> = mask.iter_ones_in(0, 16).collect();
        assert_eq!(ones, vec![2, 9]);
        assert!(mask.any_in(0, 3));
        assert!(!mask.any_in(3, 9));
    }
}
