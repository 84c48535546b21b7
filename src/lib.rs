//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `bitset`: compact bitset representation for leaf sets and splits.
//! - `namespace`: shared taxon universe fixing bit positions.
//! - `bipartition`: canonical split keys.
//! - `tree` / `encoding`: arena tree, cached split encoding and the
//!   `EncodedTree` interface the comparisons run on.
//! - `numeric`: numeric coercion of edge weights.
//! - `matching`: split set comparisons (false positives/negatives, RF).
//! - `distances`: weighted RF and Euclidean distances over split weights.
//! - `pairwise`: parallel all-pairs distance matrices.
//! - `io`: reading BEAST/NEXUS and Newick files, writing TSV matrices.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bipartition;
pub mod bitset;
pub mod distances;
pub mod encoding;
pub mod errors;
pub mod io;
pub mod matching;
pub mod namespace;
pub mod numeric;
pub mod pairwise;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bipartition::Bipartition;
pub use bitset::Bitset;
pub use distances::{
    LengthDiffs, WeightOptions, bipartition_difference, euclidean_distance, get_length_diffs,
    weighted_robinson_foulds_distance,
};
pub use encoding::{EncodedTree, SplitEncoding};
pub use errors::{DistanceError, ReadError, TreeError};
pub use io::{build_shared_namespace, read_beast_trees, read_trees, write_matrix_tsv};
pub use matching::{
    EncodingPolicy, ensure_encoded, false_positives_and_negatives, find_missing_bipartitions,
    symmetric_difference, unweighted_robinson_foulds_distance,
};
pub use namespace::TaxonNamespace;
pub use numeric::{Coercion, Numeric};
pub use pairwise::{Metric, pairwise_matrix};
pub use tree::{AttrValue, Edge, Tree};
