//! Canonical bipartitions (splits) of a taxon set.
//!
//! # What is a bipartition?
//! Each edge in a tree divides the leaves into two groups.
//! For example:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← this edge splits {A,B} from {C,D}
//! ```
//!
//! # Canonicalization
//! A split {A,B}|{C,D} can be seen from either side, depending on where the
//! tree happens to be rooted. The canonical key is always the side that does
//! NOT contain the lowest-indexed taxon of the tree, so the same split gets
//! the same key in every tree over the same namespace:
//!
//! ```text
//! Taxa: A=0, B=1, C=2, D=3
//! Leaf set {A,B} = 0b0011 contains A → key is the complement {C,D} = 0b1100
//! Leaf set {C,D} = 0b1100 lacks A    → key stays {C,D} = 0b1100
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;

use crate::bitset::Bitset;
use crate::namespace::TaxonNamespace;

/// A split of a tree's taxa, as induced by one edge.
///
/// Equality, ordering and hashing only look at the canonical key, so the same
/// split compares equal whichever side the edge saw it from.
#[derive(Clone, Debug)]
pub struct Bipartition {
    split: Bitset,
    leafset: Bitset,
    taxa: usize,
}

impl Bipartition {
    /// Builds the bipartition for the leaf set below an edge.
    ///
    /// `mask` is the full leaf set of the tree; the side not containing the
    /// lowest taxon of `mask` becomes the key.
    ///
    /// # Example
    /// ```
    /// use bipartition_distances::bipartition::Bipartition;
    /// use bipartition_distances::namespace::TaxonNamespace;
    ///
    /// let ns = TaxonNamespace::new(["A", "B", "C", "D"]).unwrap();
    /// let mask = ns.full_mask();
    /// let ab = Bipartition::new(ns.bitmask_for(&["A", "B"]).unwrap(), &mask);
    /// let cd = Bipartition::new(ns.bitmask_for(&["C", "D"]).unwrap(), &mask);
    ///
    /// assert_eq!(ab, cd);
    /// assert_eq!(ab.split_bitmask().0[0], 0b1100);
    /// assert_eq!(ab.leafset_as_newick_string(&ns), "(A,B)");
    /// ```
    pub fn new(leafset: Bitset, mask: &Bitset) -> Self {
        let split = match mask.lowest() {
            Some(anchor) if leafset.contains(anchor) => leafset.complement_within(mask),
            _ => leafset.clone(),
        };
        Bipartition {
            split,
            leafset,
            taxa: mask.count_ones(),
        }
    }

    /// Canonical key of the split.
    pub fn split_bitmask(&self) -> &Bitset {
        &self.split
    }

    /// Leaf set below the edge that induced this split.
    pub fn leafset_bitmask(&self) -> &Bitset {
        &self.leafset
    }

    /// Whether one side holds at most one taxon (pendant or root edge).
    pub fn is_trivial(&self) -> bool {
        let key = self.split.count_ones();
        key <= 1 || self.taxa.saturating_sub(key) <= 1
    }

    /// Renders the leaf set as a Newick-style group, e.g. `(A,B)`.
    /// Bits outside the namespace render as their index.
    pub fn leafset_as_newick_string(&self, namespace: &TaxonNamespace) -> String {
        let labels = self
            .leafset
            .ones()
            .map(|idx| namespace.label(idx).map_or_else(|| idx.to_string(), str::to_string))
            .join(",");
        format!("({labels})")
    }
}

impl PartialEq for Bipartition {
    fn eq(&self, other: &Self) -> bool {
        self.split == other.split
    }
}

impl Eq for Bipartition {}

impl Hash for Bipartition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.split.hash(state);
    }
}

impl PartialOrd for Bipartition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bipartition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.split.cmp(&other.split)
    }
}

impl fmt::Display for Bipartition {
    /// Bit string of the key, highest taxon index first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in self.split.0.iter().rev() {
            write!(f, "{word:064b}")?;
        }
        Ok(())
    }
}
