//! Reading tree files and writing distance matrices.
//!
//! Trees are parsed with the `phylotree` crate and then converted into
//! [`Tree`]s over one shared, alphabetically sorted
//! [`TaxonNamespace`], so every tree read together can be compared.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, warn};
use phylotree::tree::Tree as PhyloTree;

use crate::errors::ReadError;
use crate::namespace::TaxonNamespace;
use crate::tree::Tree;

/// A parsed tree with its name.
pub type NamedTree = (String, PhyloTree);

/// Moves BEAST annotations in front of the branch length.
///
/// BEAST writes `:[&rate=0.123]2.45`, where `2.45` is the branch length.
/// `phylotree` only reads comments placed before the `:`, so this rewrites
/// it as `[&rate=0.123]:2.45`, keeping the annotation as a node comment.
/// `phylotree` concatenates consecutive comments, so an annotation following
/// a node comment is folded into it: appended to a `[&...]` annotation, or
/// put in front of a plain comment (`[note]` becomes `[&rate=0.1,note]`).
fn relocate_beast_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != ':' || chars.peek() != Some(&'[') {
            result.push(ch);
            continue;
        }

        let mut comment = String::new();
        for c in chars.by_ref() {
            comment.push(c);
            if c == ']' {
                break;
            }
        }
        let annotation = comment
            .strip_prefix("[&")
            .and_then(|c| c.strip_suffix(']'));
        match (annotation, trailing_comment_start(&result)) {
            (Some(body), Some(start)) if result[start..].starts_with("[&") => {
                result.pop();
                result.push(',');
                result.push_str(body);
                result.push(']');
            }
            (Some(body), Some(start)) => {
                result.insert_str(start + 1, &format!("&{body},"));
            }
            _ => result.push_str(&comment),
        }
        result.push(':');
    }

    result
}

/// Byte offset of the `[` opening the comment `text` ends with, if any.
fn trailing_comment_start(text: &str) -> Option<usize> {
    if text.ends_with(']') {
        text.rfind('[')
    } else {
        None
    }
}

/// Reads the `TREE` blocks of a BEAST/NEXUS file.
///
/// Trees are named `<file stem>_tree_STATE<n>`. Burn-in drops the first
/// `burnin_trees` trees, or the trees whose state is not above
/// `burnin_states`; with both at 0 every tree is kept. With `use_real_taxa`
/// leaf ids are mapped through the `TRANSLATE` block.
///
/// Trees that fail to parse are skipped with a warning.
///
/// # Returns
/// The `TRANSLATE` map and the kept trees, in file order.
pub fn read_beast_trees<P: AsRef<Path>>(
    path: P,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> Result<(HashMap<String, String>, Vec<NamedTree>), ReadError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    Ok(beast_trees_from_str(
        &content,
        path,
        burnin_trees,
        burnin_states,
        use_real_taxa,
    ))
}

fn beast_trees_from_str(
    content: &str,
    path: &Path,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> (HashMap<String, String>, Vec<NamedTree>) {
    let base_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".trees"))
        .unwrap_or("unknown");

    let taxons = parse_taxon_block(content);

    let trees = collect_tree_blocks(content)
        .into_iter()
        .enumerate()
        .map(|(idx, tree)| {
            let state = extract_state(tree.header);
            (idx, tree, state, format!("{base_name}_tree_STATE{state}"))
        })
        .filter(|(idx, _tree, state, _name)| {
            (burnin_trees == 0 && burnin_states == 0)
                || (burnin_trees > 0 && *idx >= burnin_trees)
                || (burnin_states > 0 && *state > burnin_states)
        })
        .filter_map(|(idx, tree, _state, name)| {
            let newick = relocate_beast_annotations(&tree.body);
            let mut phylo_tree = match PhyloTree::from_newick(&newick) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping tree {idx} of {}: {e}", path.display());
                    return None;
                }
            };
            if use_real_taxa {
                rename_leaf_nodes(&mut phylo_tree, &taxons);
            }
            Some((name, phylo_tree))
        })
        .collect::<Vec<_>>();

    debug!(
        "read {} trees and {} taxa from {}",
        trees.len(),
        taxons.len(),
        path.display()
    );
    (taxons, trees)
}

/// Reads one Newick tree per non-empty line, named `<file stem>_tree<n>`.
///
/// # Errors
/// [`ReadError::Newick`] on the first line that does not parse.
pub fn read_newick_trees<P: AsRef<Path>>(path: P) -> Result<Vec<NamedTree>, ReadError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    newick_trees_from_str(&content, path)
}

fn newick_trees_from_str(content: &str, path: &Path) -> Result<Vec<NamedTree>, ReadError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            let name = format!("{stem}_tree{idx}");
            let newick = relocate_beast_annotations(line);
            match PhyloTree::from_newick(&newick) {
                Ok(tree) => Ok((name, tree)),
                Err(source) => Err(ReadError::Newick { tree: name, source }),
            }
        })
        .collect()
}

/// Reads trees from a NEXUS file (first line `#NEXUS`) or a
/// Newick-per-line file.
///
/// Burn-in by tree count applies to both formats, burn-in by state only to
/// NEXUS files, and `use_real_taxa` only to NEXUS files with a `TRANSLATE`
/// block.
///
/// # Errors
/// [`ReadError::NoTrees`] when nothing is left after burn-in.
pub fn read_trees<P: AsRef<Path>>(
    path: P,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> Result<Vec<NamedTree>, ReadError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let trees = if is_nexus(&content) {
        beast_trees_from_str(&content, path, burnin_trees, burnin_states, use_real_taxa).1
    } else {
        newick_trees_from_str(&content, path)?
            .into_iter()
            .skip(burnin_trees)
            .collect()
    };

    if trees.is_empty() {
        return Err(ReadError::NoTrees(path.to_path_buf()));
    }
    Ok(trees)
}

/// Converts parsed trees into [`Tree`]s over one shared namespace holding
/// the sorted union of all their leaf labels.
///
/// # Returns
/// The namespace, the tree names and the converted trees (same order).
pub fn build_shared_namespace(
    named_trees: &[NamedTree],
) -> Result<(Arc<TaxonNamespace>, Vec<String>, Vec<Tree>), ReadError> {
    let mut labels = BTreeSet::new();
    for (_, phylo) in named_trees {
        for leaf in phylo.get_leaves() {
            if let Some(name) = phylo.get(&leaf).ok().and_then(|n| n.name.as_deref()) {
                labels.insert(name);
            }
        }
    }
    let namespace = TaxonNamespace::sorted(labels);
    debug!("shared {namespace}");

    let mut names = Vec::with_capacity(named_trees.len());
    let mut trees = Vec::with_capacity(named_trees.len());
    for (name, phylo) in named_trees {
        let tree = Tree::from_phylotree(phylo, &namespace, Some(name.as_str())).map_err(|source| {
            ReadError::Tree {
                tree: name.clone(),
                source,
            }
        })?;
        names.push(name.clone());
        trees.push(tree);
    }

    Ok((namespace, names, trees))
}

fn read_file(path: &Path) -> Result<String, ReadError> {
    fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_nexus(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.eq_ignore_ascii_case("#NEXUS"))
}

fn extract_state(header: &str) -> usize {
    if let Some(start) = header.to_ascii_uppercase().find("STATE_") {
        let num_start = start + 6; // length of "STATE_"
        let rest = &header[num_start..];
        let state = rest
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>();
        if let Ok(num) = state.parse::<usize>() {
            return num;
        }
    }
    0
}

struct TreeBlock<'a> {
    header: &'a str,
    body: String,
}

fn collect_tree_blocks(content: &str) -> Vec<TreeBlock<'_>> {
    content
        .lines()
        .skip_while(|line| !line.trim_start().to_ascii_uppercase().starts_with("TREE "))
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with("END;"))
        .filter_map(|line| {
            let (header, body) = line.split_once('=')?;
            Some(TreeBlock {
                header: header.trim(),
                body: strip_rooting_comment(body.trim()).to_string(),
            })
        })
        .collect()
}

/// Drops a leading `[&R]` / `[&U]` rooting comment from a tree body.
fn strip_rooting_comment(body: &str) -> &str {
    let upper = body.to_ascii_uppercase();
    if upper.starts_with("[&R]") || upper.starts_with("[&U]") {
        body[4..].trim_start()
    } else {
        body
    }
}

fn parse_taxon_block(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"))
        .skip(1)
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with(';'))
        // 1 '1959.M.CD.59.ZR59',
        // 2 '1960.DRC60A',
        .filter_map(|line| {
            let line = line.trim().trim_end_matches(',');
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect::<HashMap<_, _>>()
}

/// Renames leaves through a `TRANSLATE` map; leaves missing from the map keep
/// their name.
pub fn rename_leaf_nodes(phylo_tree: &mut PhyloTree, translate: &HashMap<String, String>) {
    for leaf_id in phylo_tree.get_leaves() {
        if let Ok(node) = phylo_tree.get_mut(&leaf_id) {
            if let Some(label) = node.name.as_ref().and_then(|n| translate.get(n)) {
                node.name = Some(label.clone());
            }
        }
    }
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let p = path.as_ref();
    if names.len() != mat.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} names for a {} row matrix", names.len(), mat.len()),
        ));
    }

    let mut out: Box<dyn Write> = if p.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else if p.to_string_lossy().ends_with(".gz") {
        let enc = GzEncoder::new(File::create(p)?, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    // Header row
    write!(&mut out, "\t")?;
    for (k, name) in names.iter().enumerate() {
        if k > 0 {
            write!(&mut out, "\t")?;
        }
        write!(&mut out, "{name}")?;
    }
    writeln!(&mut out)?;

    for (name, row) in names.iter().zip(mat) {
        write!(&mut out, "{name}")?;
        for val in row {
            write!(&mut out, "\t{val}")?;
        }
        writeln!(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodedTree;
    use crate::tree::AttrValue;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    const NEXUS: &str = "#NEXUS

Begin taxa;
\tDimensions ntax=4;
End;

Begin trees;
\tTranslate
\t\t1 'alpha',
\t\t2 'beta',
\t\t3 'gamma',
\t\t4 'delta'
\t\t;
tree STATE_0 = [&R] ((1:[&rate=0.5]1.0,2:[&rate=0.25]1.0):[&rate=1.0]0.5,(3:1.0,4:1.0):0.5);
tree STATE_1000 = [&R] ((1:1.0,3:1.0):0.5,(2:1.0,4:1.0):0.5);
tree STATE_2000 = [&R] ((1:1.0,2:1.0):0.5,(3:1.0,4:2.0):0.5);
End;
";

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_relocate_beast_annotations() {
        assert_eq!(
            relocate_beast_annotations("(A:[&rate=0.1]1.5,B:2):[&rate=0.2]0.5;"),
            "(A[&rate=0.1]:1.5,B:2)[&rate=0.2]:0.5;"
        );
        assert_eq!(
            relocate_beast_annotations("(A[&x=1]:[&y=2]1.0,B:1.0);"),
            "(A[&x=1,y=2]:1.0,B:1.0);"
        );
        assert_eq!(
            relocate_beast_annotations("(A[note]:[&rate=0.5]1.0,B:1.0);"),
            "(A[&rate=0.5,note]:1.0,B:1.0);"
        );
        assert_eq!(relocate_beast_annotations("(A:1,B:2);"), "(A:1,B:2);");
    }

    #[test]
    fn test_extract_state() {
        assert_eq!(extract_state("tree STATE_1000"), 1000);
        assert_eq!(extract_state("tree state_42"), 42);
        assert_eq!(extract_state("tree unnamed"), 0);
    }

    #[test]
    fn test_read_beast_trees() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "run.trees", NEXUS);

        let (taxons, trees) = read_beast_trees(&path, 0, 0, true).unwrap();
        assert_eq!(taxons.len(), 4);
        assert_eq!(taxons["3"], "gamma");
        let names: Vec<_> = trees.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["run_tree_STATE0", "run_tree_STATE1000", "run_tree_STATE2000"]
        );

        let (_, by_count) = read_beast_trees(&path, 1, 0, true).unwrap();
        assert_eq!(by_count.len(), 2);
        let (_, by_state) = read_beast_trees(&path, 0, 1000, true).unwrap();
        assert_eq!(by_state.len(), 1);
        assert_eq!(by_state[0].0, "run_tree_STATE2000");
    }

    #[test]
    fn test_beast_annotations_become_attributes() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "run.trees", NEXUS);
        let named = read_trees(&path, 0, 0, true).unwrap();
        let (ns, names, mut trees) = build_shared_namespace(&named).unwrap();

        assert_eq!(ns.labels(), ["alpha", "beta", "delta", "gamma"]);
        assert_eq!(names.len(), 3);

        let tree = &mut trees[0];
        tree.encode_bipartitions().unwrap();
        let alpha = ns.index_of("alpha").unwrap();
        let leaf = tree
            .leaves()
            .into_iter()
            .find(|&id| tree.node(id).unwrap().taxon() == Some(alpha))
            .unwrap();
        let edge = tree.edge_of(leaf).unwrap();
        assert_eq!(edge.attribute("rate"), Some(&AttrValue::Text("0.5".to_string())));
        assert_eq!(edge.length(), Some(&AttrValue::Number(1.0)));

        let parent = tree.node(leaf).unwrap().parent().unwrap();
        assert_eq!(
            tree.edge_of(parent).unwrap().attribute("rate"),
            Some(&AttrValue::Text("1.0".to_string()))
        );
    }

    #[test]
    fn test_annotation_after_plain_comment() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "noted.nwk", "(A[note]:[&rate=0.5]1.0,B:1.0,C:1.0);\n");
        let named = read_trees(&path, 0, 0, false).unwrap();
        let (ns, _, trees) = build_shared_namespace(&named).unwrap();

        let tree = &trees[0];
        let a = ns.index_of("A").unwrap();
        let leaf = tree
            .leaves()
            .into_iter()
            .find(|&id| tree.node(id).unwrap().taxon() == Some(a))
            .unwrap();
        let edge = tree.edge_of(leaf).unwrap();
        assert_eq!(edge.attribute("rate"), Some(&AttrValue::Text("0.5".to_string())));
        assert_eq!(edge.length(), Some(&AttrValue::Number(1.0)));
    }

    #[test]
    fn test_format_detection() {
        assert!(is_nexus(NEXUS));
        assert!(is_nexus("\n  #nexus\nbegin trees;"));
        assert!(!is_nexus("((A,B),(C,D));\n"));
        assert!(!is_nexus(""));
    }

    #[test]
    fn test_read_newick_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "set.nwk", "((A,B),(C,D));\n\n((A,C),(B,D));\n");
        let trees = read_trees(&path, 0, 0, false).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].0, "set_tree1");

        let burnt = read_trees(&path, 1, 0, false).unwrap();
        assert_eq!(burnt.len(), 1);
        assert!(matches!(
            read_trees(&path, 2, 0, false),
            Err(ReadError::NoTrees(_))
        ));
    }

    #[test]
    fn test_read_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_trees(dir.path().join("missing.nwk"), 0, 0, false),
            Err(ReadError::Io { .. })
        ));

        let path = write(&dir, "bad.nwk", "((A,B),(C,D));\n((A,B),(C,D);\n");
        match read_newick_trees(&path) {
            Err(ReadError::Newick { tree, .. }) => assert_eq!(tree, "bad_tree1"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("malformed line was accepted"),
        }
    }

    #[test]
    fn test_write_matrix_tsv() {
        let dir = TempDir::new().unwrap();
        let names = vec!["t0".to_string(), "t1".to_string()];
        let mat = vec![vec![0.0, 1.5], vec![1.5, 0.0]];

        let plain = dir.path().join("out.tsv");
        write_matrix_tsv(&plain, &names, &mat).unwrap();
        let expected = "\tt0\tt1\nt0\t0\t1.5\nt1\t1.5\t0\n";
        assert_eq!(fs::read_to_string(&plain).unwrap(), expected);

        let gz = dir.path().join("out.tsv.gz");
        write_matrix_tsv(&gz, &names, &mat).unwrap();
        let mut text = String::new();
        GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, expected);

        assert!(write_matrix_tsv(&plain, &names[..1], &mat).is_err());
    }
}
