//! Python binding layer for bipartition distance calculations.
//!
//! Provides Python functions for computing pairwise tree distances
//! from BEAST/NEXUS or Newick tree files.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::distances::WeightOptions;
use crate::io::{NamedTree, build_shared_namespace, read_trees};
use crate::matching::EncodingPolicy;
use crate::pairwise::{Metric, pairwise_matrix};

/// Compute pairwise Robinson-Foulds distances from multiple tree files.
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS or Newick tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix) where:
///     - tree_names is a list of tree identifiers
///     - distance_matrix is a 2D list of RF distances
///
/// Raises:
///     ValueError: If no trees are found, or the trees cannot be compared
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_rf(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let (names, matrix) = compute(
        &paths,
        burnin_trees,
        burnin_states,
        use_real_taxa,
        Metric::RobinsonFoulds,
    )?;
    let matrix = matrix
        .into_iter()
        .map(|row| row.into_iter().map(|d| d as usize).collect())
        .collect();
    Ok((names, matrix))
}

/// Compute pairwise Weighted Robinson-Foulds distances from multiple tree files.
///
/// Sum of absolute weight differences over all splits of either tree.
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS or Newick tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///     weight_attr: Edge attribute holding the weights (default: "length")
///
/// Returns:
///     A tuple of (tree_names, distance_matrix)
///
/// Raises:
///     ValueError: If no trees are found, an edge has no weight, or a weight is not a number
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true, weight_attr="length"))]
fn pairwise_weighted_rf(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
    weight_attr: &str,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let weights = WeightOptions::new(weight_attr);
    compute(
        &paths,
        burnin_trees,
        burnin_states,
        use_real_taxa,
        Metric::WeightedRobinsonFoulds { weights },
    )
}

/// Compute pairwise Euclidean (branch score) distances from multiple tree files.
///
/// This metric uses squared differences of split weights: sqrt(Σ(w_a - w_b)²)
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS or Newick tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///     weight_attr: Edge attribute holding the weights (default: "length")
///
/// Returns:
///     A tuple of (tree_names, distance_matrix)
///
/// Raises:
///     ValueError: If no trees are found, an edge has no weight, or a weight is not a number
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true, weight_attr="length"))]
fn pairwise_euclidean(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
    weight_attr: &str,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let weights = WeightOptions::new(weight_attr);
    compute(
        &paths,
        burnin_trees,
        burnin_states,
        use_real_taxa,
        Metric::Euclidean { weights },
    )
}

/// Reads every file, converts all trees onto one namespace and runs the metric.
fn compute(
    paths: &[String],
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
    metric: Metric,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let named_trees = read_all_trees(paths, burnin_trees, burnin_states, use_real_taxa)?;
    if named_trees.len() < 2 {
        return Err(PyValueError::new_err(
            "Need at least 2 trees to compute pairwise distances",
        ));
    }

    let (_namespace, names, mut trees) =
        build_shared_namespace(&named_trees).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let matrix = pairwise_matrix(&mut trees, &metric, EncodingPolicy::ForceRecompute)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    Ok((names, matrix))
}

/// Helper function to read trees from multiple files
fn read_all_trees(
    paths: &[String],
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<Vec<NamedTree>> {
    let mut all_trees = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let named_trees = read_trees(path, burnin_trees, burnin_states, use_real_taxa)
            .map_err(|e| PyValueError::new_err(format!("{e} (after burnin removal)")))?;

        // Add trees with file prefix in name
        for (name, tree) in named_trees {
            all_trees.push((format!("file{file_idx}_{name}"), tree));
        }
    }

    if all_trees.is_empty() {
        return Err(PyValueError::new_err(
            "No trees found in any of the provided files",
        ));
    }

    Ok(all_trees)
}

/// Python module definition
#[pymodule]
fn bipartition_distances(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pairwise_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_weighted_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_euclidean, m)?)?;
    Ok(())
}
