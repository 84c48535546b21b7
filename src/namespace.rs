//! The shared universe of taxa that trees are compared over.
//!
//! Split keys are only meaningful between trees whose leaves were indexed by
//! the same namespace, so namespaces are shared as `Arc<TaxonNamespace>` and
//! compared by identity with [`TaxonNamespace::same`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bitset::Bitset;
use crate::errors::TreeError;

static NEXT_NAMESPACE_ID: AtomicU64 = AtomicU64::new(0);

/// Ordered set of taxon labels. The position of a label is its bit index in
/// every [`Bitset`] built against this namespace.
///
/// # Example
/// ```
/// use bipartition_distances::namespace::TaxonNamespace;
///
/// let a = TaxonNamespace::new(["X", "Y", "Z"]).unwrap();
/// let b = TaxonNamespace::new(["X", "Y", "Z"]).unwrap();
///
/// assert_eq!(a.index_of("Y"), Some(1));
/// // Same labels, different instances: not the same namespace
/// assert!(!TaxonNamespace::same(&a, &b));
/// assert!(TaxonNamespace::same(&a, &a.clone()));
/// ```
#[derive(Debug)]
pub struct TaxonNamespace {
    id: u64,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl TaxonNamespace {
    /// Builds a namespace from labels in the given order. Repeated labels are rejected.
    pub fn new<I, S>(labels: I) -> Result<Arc<Self>, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), idx).is_some() {
                return Err(TreeError::DuplicateNamespaceLabel(label.clone()));
            }
        }

        Ok(Arc::new(TaxonNamespace {
            id: NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed),
            labels,
            index,
        }))
    }

    /// Builds a namespace from any labels, sorted alphabetically and deduplicated,
    /// so identical label sets always map to the same bit positions.
    pub fn sorted<I, S>(labels: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort_unstable();
        labels.dedup();
        let index = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();

        Arc::new(TaxonNamespace {
            id: NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed),
            labels,
            index,
        })
    }

    /// Identity comparison: true only for the same namespace instance.
    pub fn same(a: &Arc<TaxonNamespace>, b: &Arc<TaxonNamespace>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Process-unique identifier of this namespace.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of words in bitsets built against this namespace.
    pub fn words(&self) -> usize {
        Bitset::words_for(self.labels.len())
    }

    /// Bitset with the bits of the given labels set.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownTaxon`] for a label outside the namespace.
    pub fn bitmask_for<S: AsRef<str>>(&self, labels: &[S]) -> Result<Bitset, TreeError> {
        let mut bitset = Bitset::zeros(self.words());
        for label in labels {
            let label = label.as_ref();
            let idx = self
                .index_of(label)
                .ok_or_else(|| TreeError::UnknownTaxon(label.to_string()))?;
            bitset.set(idx);
        }
        Ok(bitset)
    }

    /// Bitset with every taxon of the namespace set.
    pub fn full_mask(&self) -> Bitset {
        Bitset::filled(self.labels.len())
    }
}

impl fmt::Display for TaxonNamespace {
    /// Renders as `TaxonNamespace#<id>[A, B, C, ...]`, listing at most five labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 5;
        write!(f, "TaxonNamespace#{}[", self.id)?;
        for (i, label) in self.labels.iter().take(SHOWN).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        if self.labels.len() > SHOWN {
            write!(f, ", ... ({} taxa)", self.labels.len())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_namespace_is_alphabetical() {
        let ns = TaxonNamespace::sorted(["Human", "Chimp", "Gorilla", "Chimp"]);
        assert_eq!(ns.labels(), &["Chimp", "Gorilla", "Human"]);
        assert_eq!(ns.index_of("Human"), Some(2));
        assert_eq!(ns.label(0), Some("Chimp"));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let err = TaxonNamespace::new(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateNamespaceLabel(l) if l == "A"));
    }

    #[test]
    fn test_identity_not_structure() {
        let a = TaxonNamespace::sorted(["A", "B"]);
        let b = TaxonNamespace::sorted(["A", "B"]);
        assert_ne!(a.id(), b.id());
        assert!(!TaxonNamespace::same(&a, &b));
        assert!(TaxonNamespace::same(&a, &Arc::clone(&a)));
    }

    #[test]
    fn test_bitmask_for() {
        let ns = TaxonNamespace::new(["A", "B", "C", "D"]).unwrap();
        assert_eq!(ns.bitmask_for(&["A", "C"]).unwrap().0[0], 0b0101);
        assert!(matches!(
            ns.bitmask_for(&["E"]),
            Err(TreeError::UnknownTaxon(l)) if l == "E"
        ));
        assert_eq!(ns.full_mask().count_ones(), 4);
    }

    #[test]
    fn test_display_truncates() {
        let ns = TaxonNamespace::new(["A", "B", "C", "D", "E", "F", "G"]).unwrap();
        let shown = ns.to_string();
        assert!(shown.starts_with(&format!("TaxonNamespace#{}[A, B, C, D, E", ns.id())));
        assert!(shown.ends_with("... (7 taxa)]"));
    }
}
