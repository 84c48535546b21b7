//! Compact bitset representation for leaf sets and split keys.
//!
//! # Overview
//! A bitset is an efficient way to represent which taxa sit on one side of a
//! bipartition. Each bit position corresponds to a taxon index in a
//! [`TaxonNamespace`](crate::namespace::TaxonNamespace).
//!
//! # Example
//! For a namespace with taxa [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Leaf set {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Leaf set {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A compact bitset for representing which taxa belong to a leaf set.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily large trees.
/// Each u64 word holds 64 taxon indices.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Use [`Bitset::words_for`] to compute it.
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// // For a namespace with 100 taxa, need 2 words (128 bits)
    /// let bs = Bitset::zeros(Bitset::words_for(100));
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Number of words needed to hold `bits` bits.
    #[inline]
    pub fn words_for(bits: usize) -> usize {
        bits.div_ceil(64)
    }

    /// A bitset with the first `bits` bits set.
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// let full = Bitset::filled(4);
    /// assert_eq!(full.0[0], 0b1111);
    /// ```
    pub fn filled(bits: usize) -> Self {
        let mut bitset = Bitset::zeros(Bitset::words_for(bits));
        for idx in 0..bits {
            bitset.set(idx);
        }
        bitset
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);  // Mark taxon 0 as present
    /// bs.set(5);  // Mark taxon 5 as present
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0[word] |= 1u64 << bit;
    }

    /// Whether the bit at `idx` is set. Indices past the end read as unset.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);   // {0}
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);  // {1}
    ///
    /// left.or_assign(&right);  // {0} ∪ {1} = {0, 1}
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// The bits of `mask` that are not set in `self`.
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// let mut side = Bitset::zeros(1);
    /// side.set(0);
    /// side.set(1);
    /// let mask = Bitset::filled(4);
    /// assert_eq!(side.complement_within(&mask).0[0], 0b1100);
    /// ```
    pub fn complement_within(&self, mask: &Bitset) -> Bitset {
        Bitset(
            mask.0
                .iter()
                .enumerate()
                .map(|(i, m)| m & !self.0.get(i).copied().unwrap_or(0))
                .collect(),
        )
    }

    /// Counts the number of set bits (population count).
    ///
    /// # Example
    /// ```
    /// # use bipartition_distances::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(2);
    /// bs.set(5);
    /// assert_eq!(bs.count_ones(), 3);
    /// ```
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Index of the lowest set bit, if any.
    pub fn lowest(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| (i << 6) + w.trailing_zeros() as usize)
    }

    /// Iterates over the indices of set bits in increasing order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((i << 6) + bit)
            })
        })
    }
}
