//! Error types for tree construction, split comparison and tree file reading.

use std::path::PathBuf;

use phylotree::tree::{NewickParseError, TreeError as PhyloTreeError};
use thiserror::Error;

use crate::encoding::EdgeId;
use crate::tree::NodeId;

/// Errors that can occur when building a [`Tree`](crate::tree::Tree) or
/// encoding its bipartitions.
#[derive(Error, Debug)]
pub enum TreeError {
    /// A taxon label is not part of the tree's namespace
    #[error("Taxon '{0}' is not in the taxon namespace.")]
    UnknownTaxon(String),
    /// A leaf node has no taxon attached
    #[error("Leaf node {0} has no taxon.")]
    UnnamedLeaf(NodeId),
    /// Two leaves of the same tree carry the same taxon
    #[error("Taxon '{0}' appears on more than one leaf.")]
    DuplicateTaxon(String),
    /// A namespace was built from a label list with repeats
    #[error("Taxon namespace label '{0}' is not unique.")]
    DuplicateNamespaceLabel(String),
    /// The requested node does not exist in the tree
    #[error("There is no node with index: {0}")]
    NodeNotFound(NodeId),
    /// Failure reported by the `phylotree` crate while converting a parsed tree
    #[error("Could not read parsed tree: {0}")]
    Phylo(#[from] PhyloTreeError),
}

/// Errors raised while comparing the split decompositions of two trees.
#[derive(Error, Debug)]
pub enum DistanceError {
    /// The two trees are not defined over the same taxon namespace instance
    #[error("Trees do not share a taxon namespace: {left} vs {right}")]
    NamespaceMismatch {
        /// Description of the first tree's namespace
        left: String,
        /// Description of the second tree's namespace
        right: String,
    },
    /// A non-root edge has no value for the requested weight attribute
    #[error("Tree '{tree}': edge for split {split} has no weight attribute '{attr}'")]
    UndefinedEdgeWeight {
        /// Label of the tree owning the edge
        tree: String,
        /// Leaf set of the split, rendered as a Newick string
        split: String,
        /// Name of the attribute that was requested
        attr: String,
    },
    /// A weight value could not be read as a number
    #[error("Not a number: '{0}'")]
    NotANumber(String),
    /// A tree handed to an encoding-level comparison has no split encoding
    #[error("Tree '{tree}' has no bipartition encoding")]
    NotEncoded {
        /// Label of the tree
        tree: String,
    },
    /// The split encoding refers to an edge the tree no longer has
    #[error("Tree '{tree}': bipartition encoding refers to missing edge {edge}")]
    StaleEncoding {
        /// Label of the tree
        tree: String,
        /// Edge id recorded in the encoding
        edge: EdgeId,
    },
    /// Encoding the bipartitions of one of the trees failed
    #[error("Could not encode bipartitions: {0}")]
    Tree(#[from] TreeError),
}

/// Errors that can occur when reading tree files.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// A tree body is not valid Newick
    #[error("Failed to parse tree '{tree}': {source}")]
    Newick {
        /// Name of the offending tree
        tree: String,
        /// Parser error
        source: NewickParseError,
    },
    /// A parsed tree could not be converted
    #[error("Failed to convert tree '{tree}': {source}")]
    Tree {
        /// Name of the offending tree
        tree: String,
        /// Conversion error
        source: TreeError,
    },
    /// Nothing usable was found in the input
    #[error("No trees parsed from {0:?}")]
    NoTrees(PathBuf),
}
