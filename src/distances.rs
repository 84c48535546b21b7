//! Branch-weight distances over split decompositions.
//!
//! This module implements the weighted members of the Robinson-Foulds family:
//!
//! 1. **Length differences**: for every split found in either tree, the pair
//!    (weight in tree 1, weight in tree 2), with 0 for the tree lacking it.
//!
//! 2. **Weighted Robinson-Foulds**: Σ |a - b| over those pairs.
//!
//! 3. **Euclidean (branch score)**: sqrt(Σ (a - b)²) over those pairs.
//!
//! Both aggregators go through [`bipartition_difference`], which takes the
//! reduction as a plain function over the pairs.

use std::collections::HashMap;

use log::trace;

use crate::bipartition::Bipartition;
use crate::encoding::{EdgeId, EncodedTree};
use crate::errors::DistanceError;
use crate::matching::{EncodingPolicy, encoding_of, prepare};
use crate::numeric::Coercion;
use crate::tree::LENGTH;

/// (weight in tree 1, weight in tree 2) for one split.
pub type LengthDiff = (f64, f64);

/// Which edge attribute to read as the weight, and how to turn it into a number.
#[derive(Debug, Clone)]
pub struct WeightOptions {
    pub attr: String,
    pub coercion: Coercion,
}

impl WeightOptions {
    pub fn new(attr: impl Into<String>) -> Self {
        WeightOptions {
            attr: attr.into(),
            coercion: Coercion::default(),
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }
}

impl Default for WeightOptions {
    /// Branch lengths, float-like coercion.
    fn default() -> Self {
        WeightOptions::new(LENGTH)
    }
}

/// Per-split weight pairs of two trees.
#[derive(Debug, Clone, Default)]
pub struct LengthDiffs {
    /// One pair per split in the union of both split sets: tree 1's splits in
    /// its encoding order, then the splits only tree 2 has.
    pub pairs: Vec<LengthDiff>,
    /// The same pairs keyed by split, when requested.
    pub by_split: Option<HashMap<Bipartition, LengthDiff>>,
}

/// Pairs up the weights of every split present in either tree.
///
/// A split missing from one tree gets weight 0 on that side. A split present
/// in a tree gets the (summed) weight of the edge(s) inducing it; an edge
/// lacking the attribute counts as 0 if it is the root's edge and is an
/// error otherwise.
///
/// # Errors
/// - [`DistanceError::NamespaceMismatch`] if the trees use different namespaces
/// - [`DistanceError::UndefinedEdgeWeight`] for a non-root edge with no weight
/// - [`DistanceError::NotANumber`] for a weight the coercion rejects
pub fn get_length_diffs<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    weights: &WeightOptions,
    policy: EncodingPolicy,
    want_per_split_map: bool,
) -> Result<LengthDiffs, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    prepare(tree1, tree2, policy)?;
    length_diffs_encoded(&*tree1, &*tree2, weights, want_per_split_map)
}

/// [`get_length_diffs`] over trees that are already encoded.
pub fn length_diffs_encoded<A, B>(
    tree1: &A,
    tree2: &B,
    weights: &WeightOptions,
    want_per_split_map: bool,
) -> Result<LengthDiffs, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    let encoding1 = encoding_of(tree1)?;
    let encoding2 = encoding_of(tree2)?;
    let zero = weights.coercion.zero()?;

    let mut pairs = Vec::with_capacity(encoding1.len() + encoding2.len());
    let mut by_split = want_per_split_map.then(HashMap::new);
    let mut record = |split: &Bipartition, pair: LengthDiff| {
        trace!("split {split}: {pair:?}");
        pairs.push(pair);
        if let Some(map) = by_split.as_mut() {
            map.insert(split.clone(), pair);
        }
    };

    for split in encoding1.bipartition_encoding() {
        let weight1 = split_weight(tree1, encoding1.edges_for(split), split, weights)?;
        let weight2 = if encoding2.contains(split) {
            split_weight(tree2, encoding2.edges_for(split), split, weights)?
        } else {
            zero
        };
        record(split, (weight1, weight2));
    }

    for split in encoding2.bipartition_encoding() {
        if !encoding1.contains(split) {
            let weight2 = split_weight(tree2, encoding2.edges_for(split), split, weights)?;
            record(split, (zero, weight2));
        }
    }

    Ok(LengthDiffs { pairs, by_split })
}

/// Coerced weight of a split in `tree`, summed over its inducing edges.
fn split_weight<T: EncodedTree + ?Sized>(
    tree: &T,
    edges: &[EdgeId],
    split: &Bipartition,
    weights: &WeightOptions,
) -> Result<f64, DistanceError> {
    let mut total = 0.0;
    for &id in edges {
        let edge = tree.edge(id).ok_or_else(|| DistanceError::StaleEncoding {
            tree: tree.display_label(),
            edge: id,
        })?;
        total += match edge.attribute(&weights.attr) {
            Some(value) => weights.coercion.coerce(value)?,
            None if edge.tail().is_none() => weights.coercion.zero()?,
            None => {
                return Err(DistanceError::UndefinedEdgeWeight {
                    tree: tree.display_label(),
                    split: split.leafset_as_newick_string(tree.taxon_namespace()),
                    attr: weights.attr.clone(),
                });
            }
        };
    }
    Ok(total)
}

/// Runs [`get_length_diffs`] and reduces the pairs to one number with `reduce`.
pub fn bipartition_difference<A, B, F>(
    tree1: &mut A,
    tree2: &mut B,
    reduce: F,
    weights: &WeightOptions,
    policy: EncodingPolicy,
) -> Result<f64, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
    F: FnOnce(&[LengthDiff]) -> f64,
{
    let diffs = get_length_diffs(tree1, tree2, weights, policy, false)?;
    Ok(reduce(&diffs.pairs))
}

/// Σ of `terms` in ascending order, so the total does not depend on the
/// order the splits were visited in.
fn ordered_sum(mut terms: Vec<f64>) -> f64 {
    terms.sort_unstable_by(f64::total_cmp);
    terms.into_iter().sum()
}

/// Σ |a - b|
pub fn sum_of_absolute_differences(pairs: &[LengthDiff]) -> f64 {
    ordered_sum(pairs.iter().map(|(a, b)| (a - b).abs()).collect())
}

/// sqrt(Σ (a - b)²)
pub fn root_sum_of_squares(pairs: &[LengthDiff]) -> f64 {
    ordered_sum(pairs.iter().map(|(a, b)| (a - b).powi(2)).collect()).sqrt()
}

/// Weighted Robinson-Foulds distance: Σ |a - b| over all splits, reading the
/// `attr` edge attribute (usually [`LENGTH`]) with float-like coercion.
///
/// # Example
/// ```text
/// Tree 1: ((A:1.0,B:1.0):2.0,(C:1.0,D:1.0):2.0);
/// Tree 2: ((A:1.5,B:1.0):3.0,(C:0.5,D:1.0):2.0);
///
/// Split {A,B}|{C,D}: both root edges merged, |4.0 - 5.0| = 1.0
/// Pendant A: |1.0 - 1.5| = 0.5, pendant C: |1.0 - 0.5| = 0.5
/// Distance = 2.0
/// ```
pub fn weighted_robinson_foulds_distance<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    attr: &str,
    policy: EncodingPolicy,
) -> Result<f64, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    bipartition_difference(
        tree1,
        tree2,
        sum_of_absolute_differences,
        &WeightOptions::new(attr),
        policy,
    )
}

/// Euclidean (branch-length, Kuhner-Felsenstein) distance:
/// sqrt(Σ (a - b)²) over all splits.
pub fn euclidean_distance<A, B>(
    tree1: &mut A,
    tree2: &mut B,
    weights: &WeightOptions,
    policy: EncodingPolicy,
) -> Result<f64, DistanceError>
where
    A: EncodedTree + ?Sized,
    B: EncodedTree + ?Sized,
{
    bipartition_difference(tree1, tree2, root_sum_of_squares, weights, policy)
}
