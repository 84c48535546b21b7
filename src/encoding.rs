//! Cached split encodings and the tree interface the comparison core reads.
//!
//! A [`SplitEncoding`] captures all the bipartitions of a tree, in the order
//! the tree's edges produced them, together with the edges that induce each
//! one. It is owned by the tree as an explicit cache: it is only (re)built by
//! [`EncodedTree::encode_bipartitions`] and never refreshed implicitly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bipartition::Bipartition;
use crate::errors::TreeError;
use crate::namespace::TaxonNamespace;
use crate::tree::Edge;

/// Index of an [`Edge`] within its tree.
pub type EdgeId = usize;

/// The bipartitions of one tree.
///
/// # Fields
/// - `bipartitions`: every distinct split, first occurrence order
/// - `edge_map`: the edge(s) inducing each split
///
/// Two edges of the same tree induce the same split when the root is
/// bifurcating (both root edges see the same split from opposite sides) or
/// above a unifurcation. Both edges are kept under one entry.
#[derive(Debug, Clone, Default)]
pub struct SplitEncoding {
    bipartitions: Vec<Bipartition>,
    edge_map: HashMap<Bipartition, Vec<EdgeId>>,
}

impl SplitEncoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `edge` induces `bipartition`.
    pub fn insert(&mut self, bipartition: Bipartition, edge: EdgeId) {
        match self.edge_map.get_mut(&bipartition) {
            Some(edges) => edges.push(edge),
            None => {
                self.bipartitions.push(bipartition.clone());
                self.edge_map.insert(bipartition, vec![edge]);
            }
        }
    }

    /// All splits, in encoding order.
    pub fn bipartition_encoding(&self) -> &[Bipartition] {
        &self.bipartitions
    }

    pub fn bipartition_edge_map(&self) -> &HashMap<Bipartition, Vec<EdgeId>> {
        &self.edge_map
    }

    /// Edges inducing `bipartition`; empty when the split is absent.
    pub fn edges_for(&self, bipartition: &Bipartition) -> &[EdgeId] {
        self.edge_map
            .get(bipartition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, bipartition: &Bipartition) -> bool {
        self.edge_map.contains_key(bipartition)
    }

    pub fn len(&self) -> usize {
        self.bipartitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bipartitions.is_empty()
    }
}

/// What the comparison core needs from a tree.
///
/// [`Tree`](crate::tree::Tree) implements it; other tree representations can
/// too, as long as they can produce a [`SplitEncoding`] and look up edges.
pub trait EncodedTree {
    /// Human readable name of the tree, used in error messages.
    fn label(&self) -> Option<&str>;

    fn taxon_namespace(&self) -> &Arc<TaxonNamespace>;

    /// The cached encoding, `None` if never computed or invalidated.
    fn split_encoding(&self) -> Option<&SplitEncoding>;

    fn edge(&self, id: EdgeId) -> Option<&Edge>;

    /// Recomputes the encoding from the current topology. Idempotent.
    fn encode_bipartitions(&mut self) -> Result<(), TreeError>;

    /// Label for messages, `<unnamed>` when the tree has none.
    fn display_label(&self) -> String {
        self.label().unwrap_or("<unnamed>").to_string()
    }
}
