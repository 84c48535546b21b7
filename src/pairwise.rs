//! All-pairs distance matrices over a collection of trees.
//!
//! Every tree is encoded once, each on its own rayon task, before any pair is
//! compared. The comparisons then only read the encodings, so the upper
//! triangle of pairs runs in parallel and is mirrored into a square matrix.

use log::debug;
use rayon::prelude::*;

use crate::distances::{
    WeightOptions, length_diffs_encoded, root_sum_of_squares, sum_of_absolute_differences,
};
use crate::encoding::EncodedTree;
use crate::errors::DistanceError;
use crate::matching::{
    EncodingPolicy, check_same_namespace, encoding_of, ensure_encoded, symmetric_difference_encoded,
};

/// Distance computed between every pair of trees.
#[derive(Debug, Clone)]
pub enum Metric {
    /// Unweighted Robinson-Foulds (symmetric difference of split sets)
    RobinsonFoulds,
    /// Σ |a - b| over split weights
    WeightedRobinsonFoulds { weights: WeightOptions },
    /// sqrt(Σ (a - b)²) over split weights
    Euclidean { weights: WeightOptions },
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::RobinsonFoulds => "RF",
            Metric::WeightedRobinsonFoulds { .. } => "Weighted RF",
            Metric::Euclidean { .. } => "Euclidean",
        }
    }

    /// Distance between two already encoded trees.
    pub fn between<A, B>(&self, tree1: &A, tree2: &B) -> Result<f64, DistanceError>
    where
        A: EncodedTree + ?Sized,
        B: EncodedTree + ?Sized,
    {
        match self {
            Metric::RobinsonFoulds => {
                let d = symmetric_difference_encoded(encoding_of(tree1)?, encoding_of(tree2)?);
                Ok(d as f64)
            }
            Metric::WeightedRobinsonFoulds { weights } => {
                let diffs = length_diffs_encoded(tree1, tree2, weights, false)?;
                Ok(sum_of_absolute_differences(&diffs.pairs))
            }
            Metric::Euclidean { weights } => {
                let diffs = length_diffs_encoded(tree1, tree2, weights, false)?;
                Ok(root_sum_of_squares(&diffs.pairs))
            }
        }
    }
}

/// Symmetric `n × n` matrix of `metric` between all `trees`, zero diagonal.
///
/// # Errors
/// - [`DistanceError::NamespaceMismatch`] unless all trees share one namespace
/// - any error from encoding a tree or from the metric itself
pub fn pairwise_matrix<T>(
    trees: &mut [T],
    metric: &Metric,
    policy: EncodingPolicy,
) -> Result<Vec<Vec<f64>>, DistanceError>
where
    T: EncodedTree + Send + Sync,
{
    if let Some((first, rest)) = trees.split_first() {
        for tree in rest {
            check_same_namespace(first, tree)?;
        }
    }

    trees
        .par_iter_mut()
        .try_for_each(|tree| ensure_encoded(tree, policy))?;

    let n = trees.len();
    debug!(
        "computing {} distances for {} combinations",
        metric.name(),
        n * n.saturating_sub(1) / 2
    );

    let trees = &*trees;
    let pairs = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| metric.between(&trees[i], &trees[j]).map(|d| (i, j, d)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut matrix = vec![vec![0.0f64; n]; n];
    for (i, j, d) in pairs {
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    Ok(matrix)
}
