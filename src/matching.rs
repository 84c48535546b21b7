//! Set comparisons between the split decompositions of two trees.
//!
//! Every operation first checks that both trees share one taxon namespace
//! instance, then makes sure each tree has a split encoding according to the
//! [`EncodingPolicy`], then compares the two encodings as sets of canonical
//! split keys.
//!
//! The `*_encoded` variants skip both steps and work on encodings that are
//! already in place, so they only need shared references and can run in
//! parallel over many tree pairs.

use log::debug;

use crate::bipartition::Bipartition;
use crate::encoding::{EncodedTree, SplitEncoding};
use crate::errors::DistanceError;
use crate::namespace::TaxonNamespace;

/// Whether a comparison may reuse a tree's cached split encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingPolicy {
    /// Re-encode both trees before comparing. Always correct.
    #[default]
    ForceRecompute,
    /// Keep an existing encoding; only encode trees that have none.
    ReuseIfPresent,
}

/// Makes sure `tree` has a split encoding, per `policy`.
pub fn ensure_encoded<T: EncodedTree + ?Sized>(
    tree: &mut T,
    policy: EncodingPolicy,
) -> Result<(), DistanceError> {
    let present = tree.split_encoding().is_some();
    if policy == EncodingPolicy::ForceRecompute || !present {
        debug!(
            "encoding bipartitions of '{}' ({policy:?}, cached: {present})",
            tree.display_label()
        );
        tree.encode_bipartitions()?;
    }
    Ok(())
}

/// Fails with [`DistanceError::NamespaceMismatch`] unless both trees use the
/// same namespace instance.
pub fn check_same_namespace<A, B>(tree1: &A, tree2: &B) -> Result<(), DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    let (left, right) = (tree1.taxon_namespace(), tree2.taxon_namespace());
    if TaxonNamespace::same(left, right) {
        Ok(())
    } else {
        Err(DistanceError::NamespaceMismatch {
            left: left.to_string(),
            right: right.to_string(),
        })
    }
}

/// Namespace check followed by [`ensure_encoded`] on both trees.
pub(crate) fn prepare<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    policy: EncodingPolicy,
) -> Result<(), DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    check_same_namespace(&*tree1, &*tree2)?;
    ensure_encoded(tree1, policy)?;
    ensure_encoded(tree2, policy)
}

/// The encoding of `tree`, or [`DistanceError::NotEncoded`].
pub(crate) fn encoding_of<T: EncodedTree + ?Sized>(tree: &T) -> Result<&SplitEncoding, DistanceError> {
    tree.split_encoding().ok_or_else(|| DistanceError::NotEncoded {
        tree: tree.display_label(),
    })
}

/// Counts splits of `comparison` missing from `reference` (false positives)
/// and splits of `reference` missing from `comparison` (false negatives).
///
/// # Example
/// ```
/// use bipartition_distances::matching::{false_positives_and_negatives, EncodingPolicy};
/// use bipartition_distances::namespace::TaxonNamespace;
/// use bipartition_distances::tree::Tree;
///
/// let ns = TaxonNamespace::new(["A", "B", "C", "D", "E"]).unwrap();
/// let build = |cherry: [&str; 2], rest: [&str; 3]| {
///     let mut tree = Tree::new(&ns, None);
///     let node = tree.add_child(Tree::ROOT, None, None).unwrap();
///     for taxon in cherry {
///         tree.add_child(node, Some(taxon), None).unwrap();
///     }
///     for taxon in rest {
///         tree.add_child(Tree::ROOT, Some(taxon), None).unwrap();
///     }
///     tree
/// };
///
/// let mut reference = build(["A", "B"], ["C", "D", "E"]);
/// let mut comparison = build(["C", "D"], ["A", "B", "E"]);
/// let counts = false_positives_and_negatives(
///     &mut reference,
///     &mut comparison,
///     EncodingPolicy::ForceRecompute,
/// );
/// assert_eq!(counts.unwrap(), (1, 1));
/// ```
pub fn false_positives_and_negatives<A, B>(
    reference: &mut A,
    comparison: &mut B,
    policy: EncodingPolicy,
) -> Result<(usize, usize), DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    prepare(reference, comparison, policy)?;
    Ok(false_positives_and_negatives_encoded(
        encoding_of(&*reference)?,
        encoding_of(&*comparison)?,
    ))
}

/// [`false_positives_and_negatives`] over existing encodings.
pub fn false_positives_and_negatives_encoded(
    reference: &SplitEncoding,
    comparison: &SplitEncoding,
) -> (usize, usize) {
    let shared = reference
        .bipartition_encoding()
        .iter()
        .filter(|split| comparison.contains(split))
        .count();
    (comparison.len() - shared, reference.len() - shared)
}

/// Splits of `reference` that `comparison` lacks, in `reference`'s encoding order.
pub fn find_missing_bipartitions<A, B>(
    reference: &mut A,
    comparison: &mut B,
    policy: EncodingPolicy,
) -> Result<Vec<Bipartition>, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    prepare(reference, comparison, policy)?;
    Ok(missing_bipartitions_encoded(
        encoding_of(&*reference)?,
        encoding_of(&*comparison)?,
    ))
}

/// [`find_missing_bipartitions`] over existing encodings.
pub fn missing_bipartitions_encoded(
    reference: &SplitEncoding,
    comparison: &SplitEncoding,
) -> Vec<Bipartition> {
    reference
        .bipartition_encoding()
        .iter()
        .filter(|split| !comparison.contains(split))
        .cloned()
        .collect()
}

/// Number of splits found in exactly one of the two trees.
///
/// # Algorithm
/// RF = |A ∪ B| - |A ∩ B| = |A| + |B| - 2|A ∩ B|
///
/// Where A and B are the split sets of each tree.
pub fn symmetric_difference<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    policy: EncodingPolicy,
) -> Result<usize, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    prepare(tree1, tree2, policy)?;
    Ok(symmetric_difference_encoded(
        encoding_of(&*tree1)?,
        encoding_of(&*tree2)?,
    ))
}

/// [`symmetric_difference`] over existing encodings.
pub fn symmetric_difference_encoded(a: &SplitEncoding, b: &SplitEncoding) -> usize {
    let (fp, fn_) = false_positives_and_negatives_encoded(a, b);
    fp + fn_
}

/// The unweighted Robinson-Foulds distance; same as [`symmetric_difference`].
pub fn unweighted_robinson_foulds_distance<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    policy: EncodingPolicy,
) -> Result<usize, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    symmetric_difference(tree1, tree2, policy)
}
