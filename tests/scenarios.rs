//! Comparisons over hand-written split tables.
//!
//! `SplitTable` implements `EncodedTree` directly from a list of splits and
//! their edges, so the comparisons can be checked on split sets that no
//! single rooted topology produces.

use std::sync::Arc;

use bipartition_distances::bipartition::Bipartition;
use bipartition_distances::distances::{
    WeightOptions, euclidean_distance, get_length_diffs, weighted_robinson_foulds_distance,
};
use bipartition_distances::encoding::{EdgeId, EncodedTree, SplitEncoding};
use bipartition_distances::errors::{DistanceError, TreeError};
use bipartition_distances::matching::{
    EncodingPolicy, false_positives_and_negatives, find_missing_bipartitions,
    symmetric_difference,
};
use bipartition_distances::namespace::TaxonNamespace;
use bipartition_distances::pairwise::{Metric, pairwise_matrix};
use bipartition_distances::tree::{Edge, LENGTH, Tree};

struct SplitTable {
    label: String,
    namespace: Arc<TaxonNamespace>,
    edges: Vec<Edge>,
    splits: Vec<(Vec<&'static str>, EdgeId)>,
    encoding: Option<SplitEncoding>,
    encode_calls: usize,
}

impl SplitTable {
    fn new(label: &str, namespace: &Arc<TaxonNamespace>) -> Self {
        SplitTable {
            label: label.to_string(),
            namespace: Arc::clone(namespace),
            edges: vec![],
            splits: vec![],
            encoding: None,
            encode_calls: 0,
        }
    }

    /// An inner edge whose head subtends `taxa`.
    fn split(self, taxa: &[&'static str], weight: Option<f64>) -> Self {
        self.push(Some(0), taxa, weight)
    }

    /// The root's own edge, subtending every taxon.
    fn root(self, weight: Option<f64>) -> Self {
        let all: Vec<&'static str> = ["W", "X", "Y", "Z"].to_vec();
        self.push(None, &all, weight)
    }

    fn push(mut self, tail: Option<usize>, taxa: &[&'static str], weight: Option<f64>) -> Self {
        let id = self.edges.len();
        let mut edge = Edge::new(tail, id + 1);
        if let Some(weight) = weight {
            edge.set_attribute(LENGTH, weight);
        }
        self.edges.push(edge);
        self.splits.push((taxa.to_vec(), id));
        self
    }
}

impl EncodedTree for SplitTable {
    fn label(&self) -> Option<&str> {
        Some(&self.label)
    }

    fn taxon_namespace(&self) -> &Arc<TaxonNamespace> {
        &self.namespace
    }

    fn split_encoding(&self) -> Option<&SplitEncoding> {
        self.encoding.as_ref()
    }

    fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    fn encode_bipartitions(&mut self) -> Result<(), TreeError> {
        self.encode_calls += 1;
        let mask = self.namespace.full_mask();
        let mut encoding = SplitEncoding::new();
        for (taxa, edge) in &self.splits {
            let leafset = self.namespace.bitmask_for(taxa)?;
            encoding.insert(Bipartition::new(leafset, &mask), *edge);
        }
        self.encoding = Some(encoding);
        Ok(())
    }
}

fn wxyz() -> Arc<TaxonNamespace> {
    TaxonNamespace::new(["X", "Y", "Z", "W"]).unwrap()
}

/// A: {X,Y|Z,W} = 1.0, {X|Y,Z,W} = 2.0. B: {X,Y|Z,W} = 1.5.
fn scenario(ns: &Arc<TaxonNamespace>) -> (SplitTable, SplitTable) {
    let a = SplitTable::new("A", ns)
        .split(&["X", "Y"], Some(1.0))
        .split(&["X"], Some(2.0));
    let b = SplitTable::new("B", ns).split(&["X", "Y"], Some(1.5));
    (a, b)
}

fn split(ns: &Arc<TaxonNamespace>, taxa: &[&str]) -> Bipartition {
    Bipartition::new(ns.bitmask_for(taxa).unwrap(), &ns.full_mask())
}

#[test]
fn split_set_counts() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);
    let policy = EncodingPolicy::default();

    assert_eq!(false_positives_and_negatives(&mut a, &mut b, policy).unwrap(), (0, 1));
    assert_eq!(false_positives_and_negatives(&mut b, &mut a, policy).unwrap(), (1, 0));
    assert_eq!(symmetric_difference(&mut a, &mut b, policy).unwrap(), 1);

    let missing = find_missing_bipartitions(&mut a, &mut b, policy).unwrap();
    assert_eq!(missing, vec![split(&ns, &["X"])]);
    assert!(find_missing_bipartitions(&mut b, &mut a, policy).unwrap().is_empty());
}

#[test]
fn split_set_weights() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);
    let policy = EncodingPolicy::default();

    let diffs = get_length_diffs(&mut a, &mut b, &WeightOptions::default(), policy, true).unwrap();
    assert_eq!(diffs.pairs, vec![(1.0, 1.5), (2.0, 0.0)]);
    let by_split = diffs.by_split.unwrap();
    assert_eq!(by_split[&split(&ns, &["Z", "W"])], (1.0, 1.5));
    assert_eq!(by_split[&split(&ns, &["Y", "Z", "W"])], (2.0, 0.0));

    let reversed = get_length_diffs(&mut b, &mut a, &WeightOptions::default(), policy, false)
        .unwrap();
    assert_eq!(reversed.pairs, vec![(1.5, 1.0), (0.0, 2.0)]);

    assert_eq!(
        weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, policy).unwrap(),
        2.5
    );
    let euclidean = euclidean_distance(&mut a, &mut b, &WeightOptions::default(), policy).unwrap();
    assert_eq!(euclidean, 4.25f64.sqrt());
    assert!((euclidean - 2.0616).abs() < 1e-4);
}

#[test]
fn weighted_metrics_are_symmetric() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);
    let policy = EncodingPolicy::default();
    let weights = WeightOptions::default();

    assert_eq!(
        weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, policy).unwrap(),
        weighted_robinson_foulds_distance(&mut b, &mut a, LENGTH, policy).unwrap()
    );
    assert_eq!(
        euclidean_distance(&mut a, &mut b, &weights, policy).unwrap(),
        euclidean_distance(&mut b, &mut a, &weights, policy).unwrap()
    );
}

#[test]
fn unweighted_root_edge_counts_as_zero() {
    let ns = wxyz();
    let (a, b) = scenario(&ns);
    let (mut a, mut b) = (a.root(None), b.root(Some(0.25)));

    let diffs = get_length_diffs(
        &mut a,
        &mut b,
        &WeightOptions::default(),
        EncodingPolicy::default(),
        true,
    )
    .unwrap();
    let root = split(&ns, &["X", "Y", "Z", "W"]);
    assert_eq!(diffs.by_split.unwrap()[&root], (0.0, 0.25));
    assert_eq!(
        weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, EncodingPolicy::default())
            .unwrap(),
        2.75
    );
}

#[test]
fn unweighted_inner_edge_is_an_error() {
    let ns = wxyz();
    let mut a = SplitTable::new("A", &ns).split(&["X", "Y"], Some(1.0));
    let mut b = SplitTable::new("B", &ns).split(&["X", "Y"], None);

    let err = weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, EncodingPolicy::default())
        .unwrap_err();
    match err {
        DistanceError::UndefinedEdgeWeight { tree, split, attr } => {
            assert_eq!(tree, "B");
            assert_eq!(split, "(X,Y)");
            assert_eq!(attr, "length");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A missing weight on a split only counted by RF is not an error there
    assert_eq!(
        symmetric_difference(&mut a, &mut b, EncodingPolicy::default()).unwrap(),
        0
    );
}

#[test]
fn other_weight_attribute() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);
    for (id, edge) in a.edges.iter_mut().enumerate() {
        edge.set_attribute("rate", format!("{}.0", id + 1));
    }
    b.edges[0].set_attribute("rate", "1");

    let weights = WeightOptions::new("rate");
    let d = euclidean_distance(&mut a, &mut b, &weights, EncodingPolicy::default()).unwrap();
    assert_eq!(d, 2.0);
}

#[test]
fn textually_equal_namespaces_do_not_match() {
    let ns1 = wxyz();
    let ns2 = wxyz();
    assert_eq!(ns1.labels(), ns2.labels());

    let mut t1 = Tree::new(&ns1, Some("t1"));
    let mut t2 = Tree::new(&ns2, Some("t2"));
    for label in ["X", "Y", "Z", "W"] {
        t1.add_child(Tree::ROOT, Some(label), Some(1.0)).unwrap();
        t2.add_child(Tree::ROOT, Some(label), Some(1.0)).unwrap();
    }

    let policy = EncodingPolicy::default();
    assert!(matches!(
        symmetric_difference(&mut t1, &mut t2, policy),
        Err(DistanceError::NamespaceMismatch { .. })
    ));
    assert!(matches!(
        euclidean_distance(&mut t1, &mut t2, &WeightOptions::default(), policy),
        Err(DistanceError::NamespaceMismatch { .. })
    ));
    // Nothing was encoded before the check failed
    assert!(t1.split_encoding().is_none());

    let mut t3 = t1.clone();
    assert_eq!(symmetric_difference(&mut t1, &mut t3, policy).unwrap(), 0);
}

#[test]
fn encoding_policy_controls_reencoding() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);

    symmetric_difference(&mut a, &mut b, EncodingPolicy::ReuseIfPresent).unwrap();
    assert_eq!((a.encode_calls, b.encode_calls), (1, 1));

    symmetric_difference(&mut a, &mut b, EncodingPolicy::ReuseIfPresent).unwrap();
    assert_eq!((a.encode_calls, b.encode_calls), (1, 1));

    symmetric_difference(&mut a, &mut b, EncodingPolicy::ForceRecompute).unwrap();
    assert_eq!((a.encode_calls, b.encode_calls), (2, 2));

    // A split added after encoding is only seen once the cache is rebuilt
    let mut b = b.split(&["X"], Some(2.0));
    assert_eq!(
        symmetric_difference(&mut a, &mut b, EncodingPolicy::ReuseIfPresent).unwrap(),
        1
    );
    assert_eq!(
        symmetric_difference(&mut a, &mut b, EncodingPolicy::ForceRecompute).unwrap(),
        0
    );
}

#[test]
fn encoding_pointing_at_a_removed_edge() {
    let ns = wxyz();
    let (mut a, mut b) = scenario(&ns);
    let policy = EncodingPolicy::ReuseIfPresent;
    weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, policy).unwrap();

    a.edges.pop();
    match weighted_robinson_foulds_distance(&mut a, &mut b, LENGTH, policy) {
        Err(DistanceError::StaleEncoding { tree, edge }) => {
            assert_eq!(tree, "A");
            assert_eq!(edge, 1);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(d) => panic!("stale encoding gave a distance: {d}"),
    }
}

#[test]
fn pairwise_over_split_tables() {
    let ns = wxyz();
    let (a, b) = scenario(&ns);
    let c = SplitTable::new("C", &ns).split(&["X", "Z"], Some(1.0));
    let mut tables = vec![a, b, c];

    let rf = pairwise_matrix(&mut tables, &Metric::RobinsonFoulds, EncodingPolicy::default())
        .unwrap();
    assert_eq!(
        rf,
        vec![
            vec![0.0, 1.0, 3.0],
            vec![1.0, 0.0, 2.0],
            vec![3.0, 2.0, 0.0],
        ]
    );

    let weighted = pairwise_matrix(
        &mut tables,
        &Metric::WeightedRobinsonFoulds {
            weights: WeightOptions::default(),
        },
        EncodingPolicy::ReuseIfPresent,
    )
    .unwrap();
    assert_eq!(weighted[0][1], 2.5);
    assert_eq!(weighted[1][2], 2.5);
    assert!(tables.iter().all(|t| t.encode_calls == 1));
}
