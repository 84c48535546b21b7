//! Arena tree with named edge attributes and a cached split encoding.
//!
//! Leaves are identified by taxa of a shared
//! [`TaxonNamespace`](crate::namespace::TaxonNamespace); every node except
//! the root hangs from its parent by an [`Edge`], and the root owns an edge
//! of its own with no tail. Branch lengths, and any other per-branch value,
//! are stored as named attributes on the edge.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use phylotree::tree::Tree as PhyloTree;

use crate::bipartition::Bipartition;
use crate::bitset::Bitset;
use crate::encoding::{EdgeId, EncodedTree, SplitEncoding};
use crate::errors::TreeError;
use crate::namespace::TaxonNamespace;

/// Index of a [`Node`] within its tree.
pub type NodeId = usize;

/// Name of the attribute holding branch lengths.
pub const LENGTH: &str = "length";

/// Raw value of an edge attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// A branch of the tree, from `tail` (parent side) to `head`.
#[derive(Debug, Clone)]
pub struct Edge {
    tail: Option<NodeId>,
    head: NodeId,
    attributes: HashMap<String, AttrValue>,
}

impl Edge {
    pub fn new(tail: Option<NodeId>, head: NodeId) -> Self {
        Edge {
            tail,
            head,
            attributes: HashMap::new(),
        }
    }

    /// Builder style [`Edge::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Parent side of the edge, `None` for the edge above the root.
    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttrValue> {
        self.attributes.remove(name)
    }

    pub fn length(&self) -> Option<&AttrValue> {
        self.attribute(LENGTH)
    }
}

/// A node of the [`Tree`].
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    taxon: Option<usize>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    edge: EdgeId,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Namespace index of the taxon at this node.
    pub fn taxon(&self) -> Option<usize> {
        self.taxon
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The edge leading into this node.
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A phylogenetic tree over a shared taxon namespace.
///
/// The split encoding is an explicit cache: it is filled by
/// [`EncodedTree::encode_bipartitions`], cleared by
/// [`Tree::invalidate_bipartitions`], and not touched by topology edits.
///
/// # Example
/// ```
/// use bipartition_distances::encoding::EncodedTree;
/// use bipartition_distances::namespace::TaxonNamespace;
/// use bipartition_distances::tree::Tree;
///
/// let ns = TaxonNamespace::new(["A", "B", "C", "D"]).unwrap();
/// let mut tree = Tree::new(&ns, Some("t1"));
/// let ab = tree.add_child(Tree::ROOT, None, Some(0.5)).unwrap();
/// tree.add_child(ab, Some("A"), Some(1.0)).unwrap();
/// tree.add_child(ab, Some("B"), Some(1.0)).unwrap();
/// tree.add_child(Tree::ROOT, Some("C"), Some(1.0)).unwrap();
/// tree.add_child(Tree::ROOT, Some("D"), Some(1.0)).unwrap();
///
/// tree.encode_bipartitions().unwrap();
/// // 4 pendant splits, {A,B}|{C,D} and the root edge
/// assert_eq!(tree.bipartition_encoding().unwrap().len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    label: Option<String>,
    namespace: Arc<TaxonNamespace>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    encoding: Option<SplitEncoding>,
}

impl Tree {
    /// Id of the root node.
    pub const ROOT: NodeId = 0;

    /// A tree holding only a root node and the root's tail-less edge.
    pub fn new(namespace: &Arc<TaxonNamespace>, label: Option<&str>) -> Self {
        Tree {
            label: label.map(str::to_string),
            namespace: Arc::clone(namespace),
            nodes: vec![Node {
                id: Self::ROOT,
                taxon: None,
                parent: None,
                children: vec![],
                edge: 0,
            }],
            edges: vec![Edge::new(None, Self::ROOT)],
            encoding: None,
        }
    }

    /// Adds a node below `parent`, optionally carrying a taxon and a branch length.
    ///
    /// # Errors
    /// [`TreeError::NodeNotFound`] for an unknown parent,
    /// [`TreeError::UnknownTaxon`] for a taxon outside the namespace.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        taxon: Option<&str>,
        length: Option<f64>,
    ) -> Result<NodeId, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(parent));
        }
        let taxon = taxon
            .map(|label| {
                self.namespace
                    .index_of(label)
                    .ok_or_else(|| TreeError::UnknownTaxon(label.to_string()))
            })
            .transpose()?;

        let id = self.nodes.len();
        let edge_id = self.edges.len();
        let mut edge = Edge::new(Some(parent), id);
        if let Some(length) = length {
            edge.set_attribute(LENGTH, length);
        }
        self.edges.push(edge);
        self.nodes.push(Node {
            id,
            taxon,
            parent: Some(parent),
            children: vec![],
            edge: edge_id,
        });
        self.nodes[parent].children.push(id);

        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to an edge's attributes. Changing weights does not
    /// affect the split encoding, which refers to edges by id.
    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    /// The edge leading into `node`.
    pub fn edge_of(&self, node: NodeId) -> Result<&Edge, TreeError> {
        let edge = self.node(node)?.edge;
        self.edges.get(edge).ok_or(TreeError::NodeNotFound(node))
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Cached splits in encoding order, if encoded.
    pub fn bipartition_encoding(&self) -> Option<&[Bipartition]> {
        self.encoding.as_ref().map(SplitEncoding::bipartition_encoding)
    }

    /// Cached split → edges map, if encoded.
    pub fn bipartition_edge_map(&self) -> Option<&HashMap<Bipartition, Vec<EdgeId>>> {
        self.encoding.as_ref().map(SplitEncoding::bipartition_edge_map)
    }

    /// Drops the cached encoding. Call after editing the topology.
    pub fn invalidate_bipartitions(&mut self) {
        self.encoding = None;
    }

    /// Node ids with every child before its parent; the root comes last.
    fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(Self::ROOT, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.nodes[id].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Builds the leaf set below every node bottom-up, then keys each edge
    /// by the canonical split of its head's leaf set.
    ///
    /// # Algorithm
    /// - **Leaf node**: bitset with the leaf's taxon bit set
    /// - **Internal node**: OR of its children's bitsets
    fn compute_encoding(&self) -> Result<SplitEncoding, TreeError> {
        let words = self.namespace.words();
        let order = self.postorder();
        let mut leafsets = vec![Bitset::zeros(words); self.nodes.len()];
        let mut seen = Bitset::zeros(words);

        for &id in &order {
            let node = &self.nodes[id];
            if node.is_leaf() {
                let taxon = node.taxon.ok_or(TreeError::UnnamedLeaf(id))?;
                if seen.contains(taxon) {
                    let label = self.namespace.label(taxon).unwrap_or_default();
                    return Err(TreeError::DuplicateTaxon(label.to_string()));
                }
                seen.set(taxon);
                leafsets[id].set(taxon);
            } else {
                let mut leafset = Bitset::zeros(words);
                for &child in &node.children {
                    leafset.or_assign(&leafsets[child]);
                }
                leafsets[id] = leafset;
            }
        }

        let mut encoding = SplitEncoding::new();
        for &id in &order {
            let leafset = std::mem::replace(&mut leafsets[id], Bitset::zeros(0));
            encoding.insert(Bipartition::new(leafset, &seen), self.nodes[id].edge);
        }

        Ok(encoding)
    }

    /// Converts a tree parsed by the `phylotree` crate.
    ///
    /// Leaf names are looked up in `namespace`; internal node names are
    /// ignored. Branch lengths become the `length` attribute, and BEAST
    /// style comments (`[&rate=0.1,height=2]`) become text attributes on the
    /// edge above the node they annotate.
    ///
    /// # Errors
    /// [`TreeError::UnknownTaxon`] for a leaf outside the namespace, or
    /// [`TreeError::Phylo`] when the parsed tree has no root.
    pub fn from_phylotree(
        phylo: &PhyloTree,
        namespace: &Arc<TaxonNamespace>,
        label: Option<&str>,
    ) -> Result<Self, TreeError> {
        let mut tree = Tree::new(namespace, label);

        let phylo_root = phylo.get_root()?;
        let root = phylo.get(&phylo_root)?;
        if root.children.is_empty() {
            if let Some(name) = root.name.as_deref() {
                let taxon = namespace
                    .index_of(name)
                    .ok_or_else(|| TreeError::UnknownTaxon(name.to_string()))?;
                tree.nodes[Self::ROOT].taxon = Some(taxon);
            }
        }
        if let Some(length) = root.parent_edge {
            tree.edges[0].set_attribute(LENGTH, length);
        }
        annotate(&mut tree.edges[0], root.comment.as_deref());

        let mut stack = vec![(phylo_root, Self::ROOT)];
        while let Some((phylo_id, id)) = stack.pop() {
            let node = phylo.get(&phylo_id)?;
            for &phylo_child in &node.children {
                let child = phylo.get(&phylo_child)?;
                let taxon = if child.children.is_empty() {
                    child.name.as_deref()
                } else {
                    None
                };
                let child_id = tree.add_child(id, taxon, child.parent_edge)?;
                let edge = tree.nodes[child_id].edge;
                annotate(&mut tree.edges[edge], child.comment.as_deref());
                stack.push((phylo_child, child_id));
            }
        }

        Ok(tree)
    }
}

impl EncodedTree for Tree {
    fn label(&self) -> Option<&str> {
        self.label.as_deref()
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
        let encoding = self.compute_encoding()?;
        debug!(
            "encoded {} bipartitions for tree '{}'",
            encoding.len(),
            self.display_label()
        );
        self.encoding = Some(encoding);
        Ok(())
    }
}

/// Copies `key=value` pairs of a BEAST comment onto `edge` as text attributes.
fn annotate(edge: &mut Edge, comment: Option<&str>) {
    if let Some(comment) = comment {
        for (key, value) in parse_annotations(comment) {
            edge.set_attribute(key, value);
        }
    }
}

/// Splits a comment like `&rate=0.1,height_95%_HPD={1.0,2.0}` into key/value
/// pairs. Commas inside braces do not separate entries; entries without `=`
/// are skipped. Comments not starting with `&` carry no annotations.
pub(crate) fn parse_annotations(comment: &str) -> Vec<(String, String)> {
    let Some(body) = comment.trim().strip_prefix('&') else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&body[start..]);

    entries
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}
