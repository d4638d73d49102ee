//! Volatile edges: scan references resolved against the node set.

use crate::types::{Edge, GraphSnapshot, Node, NodeStatus};
use std::collections::{HashMap, HashSet};

/// File stems that stand for their directory (`pkg/__init__.py` is `pkg`)
const MODULE_FILES: &[&str] = &["mod", "__init__", "index", "lib"];

#[derive(Debug, Clone)]
struct KeyEntry {
    /// `None` once two nodes compete for the key
    node: Option<String>,
    exact: bool,
}

/// Reverse index from path-derived keys to node ids.
///
/// Keys per node: the full path (exact), the path without extension, every
/// trailing sub-path of that, the basename, and the directory of module files.
/// A non-exact key shared by two nodes is ambiguous and resolves to nothing.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    keys: HashMap<String, KeyEntry>,
}

impl ReferenceIndex {
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut index = Self::default();
        for node in nodes {
            let Some(path) = node.path() else {
                continue;
            };
            index.insert(path.to_string(), &node.id, true);
            for key in path_keys(path) {
                index.insert(key, &node.id, false);
            }
        }
        index
    }

    fn insert(&mut self, key: String, node_id: &str, exact: bool) {
        if key.is_empty() {
            return;
        }
        let key = key.to_lowercase();
        match self.keys.get_mut(&key) {
            None => {
                self.keys.insert(
                    key,
                    KeyEntry {
                        node: Some(node_id.to_string()),
                        exact,
                    },
                );
            }
            Some(entry) if entry.node.as_deref() == Some(node_id) => {
                entry.exact |= exact;
            }
            Some(entry) => {
                if exact {
                    entry.node = Some(node_id.to_string());
                    entry.exact = true;
                } else if !entry.exact {
                    entry.node = None;
                }
            }
        }
    }

    /// Node id for a raw reference, trying the most specific spelling first
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        reference_candidates(reference)
            .into_iter()
            .find_map(|candidate| {
                self.keys
                    .get(&candidate.to_lowercase())
                    .and_then(|entry| entry.node.as_deref())
            })
    }
}

fn path_keys(path: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let (dir, file) = path.rsplit_once('/').unwrap_or(("", path));
    keys.push(file.to_string());

    let without_ext = strip_extension(path);
    let segments: Vec<&str> = without_ext.split('/').collect();
    for start in 0..segments.len() {
        keys.push(segments[start..].join("/"));
    }

    if MODULE_FILES.contains(&strip_extension(file)) && !dir.is_empty() {
        let dir_segments: Vec<&str> = dir.split('/').collect();
        for start in 0..dir_segments.len() {
            keys.push(dir_segments[start..].join("/"));
        }
    }
    keys
}

fn strip_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && !ext.contains('/') => {
            stem
        }
        _ => path,
    }
}

/// Spellings of a reference as a path, most specific first
fn reference_candidates(reference: &str) -> Vec<String> {
    let reference = reference.trim().trim_start_matches('/');
    let mut candidates = vec![reference.to_string()];

    if reference.contains("::") {
        let parts: Vec<&str> = reference.split("::").filter(|p| !p.is_empty()).collect();
        candidates.push(parts.join("/"));
        if let Some(last) = parts.last() {
            candidates.push((*last).to_string());
        }
    } else if reference.contains('/') {
        candidates.push(strip_extension(reference).to_string());
        if let Some((_, base)) = reference.rsplit_once('/') {
            candidates.push(base.to_string());
            candidates.push(strip_extension(base).to_string());
        }
    } else if reference.contains('.') {
        // `pkg.module` import path or a bare file name
        candidates.push(reference.replace('.', "/"));
        if let Some((_, last)) = reference.rsplit_once('.') {
            candidates.push(last.to_string());
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| !c.is_empty() && seen.insert(c.clone()));
    candidates
}

/// One volatile edge per (source, resolved target), skipping self-edges and
/// pairs already connected by a durable edge. Output order follows node order
/// and then reference order, so unchanged input yields an identical list.
pub fn derive_edges(graph: &GraphSnapshot) -> Vec<Edge> {
    let candidates = graph
        .nodes
        .iter()
        .filter(|node| node.status != NodeStatus::Archived);
    let index = ReferenceIndex::build(candidates.clone());

    let durable: HashSet<(&str, &str)> = graph
        .edges
        .iter()
        .filter(|edge| !edge.volatile)
        .map(|edge| (edge.source.as_str(), edge.target.as_str()))
        .collect();

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut edges = Vec::new();
    for node in candidates {
        let Some(summary) = &node.summary else {
            continue;
        };
        for reference in &summary.references {
            let Some(target) = index.resolve(reference) else {
                continue;
            };
            if target == node.id || durable.contains(&(node.id.as_str(), target)) {
                continue;
            }
            if seen.insert((node.id.clone(), target.to_string())) {
                edges.push(Edge::volatile(&node.id, target));
            }
        }
    }
    edges
}

/// Replace any previous volatile edges with a fresh derivation. Returns the
/// number of volatile edges now present.
pub fn merge_volatile(graph: &mut GraphSnapshot) -> usize {
    graph.edges.retain(|edge| !edge.volatile);
    let derived = derive_edges(graph);
    let count = derived.len();
    graph.edges.extend(derived);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;
    use pretty_assertions::assert_eq;
    use synapse_protocol::{FileKind, RelationKind};
    use synapse_scanner::ScanSummary;

    fn node(path: &str, references: &[&str]) -> Node {
        let mut node = Node::file(path, FileKind::Source);
        node.summary = Some(ScanSummary {
            symbols: Vec::new(),
            references: references.iter().map(|r| r.to_string()).collect(),
        });
        node
    }

    fn pairs(edges: &[Edge]) -> Vec<(&str, &str)> {
        edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }

    #[test]
    fn resolves_common_reference_spellings() {
        let mut graph = GraphSnapshot::new();
        graph.nodes = vec![
            node(
                "src/login.py",
                &["board", "util.helpers", "os", "login", "graph::types", "lib/canvas.js"],
            ),
            node("src/board.py", &[]),
            node("src/util/helpers.py", &[]),
            node("src/graph/types.rs", &[]),
            node("web/lib/canvas.js", &[]),
        ];

        let edges = derive_edges(&graph);
        assert_eq!(
            pairs(&edges),
            vec![
                ("src/login.py", "src/board.py"),
                ("src/login.py", "src/util/helpers.py"),
                ("src/login.py", "src/graph/types.rs"),
                ("src/login.py", "web/lib/canvas.js"),
            ]
        );
        assert!(edges.iter().all(|e| e.volatile && e.id.starts_with("auto:")));
    }

    #[test]
    fn ambiguous_basenames_do_not_resolve() {
        let mut graph = GraphSnapshot::new();
        graph.nodes = vec![
            node("app.py", &["utils", "api/utils"]),
            node("api/utils.py", &[]),
            node("web/utils.py", &[]),
        ];
        assert_eq!(pairs(&derive_edges(&graph)), vec![("app.py", "api/utils.py")]);
    }

    #[test]
    fn module_files_answer_for_their_directory() {
        let mut graph = GraphSnapshot::new();
        graph.nodes = vec![node("main.py", &["store"]), node("store/__init__.py", &[])];
        assert_eq!(pairs(&derive_edges(&graph)), vec![("main.py", "store/__init__.py")]);
    }

    #[test]
    fn durable_pairs_are_not_duplicated() {
        let mut graph = GraphSnapshot::new();
        graph.nodes = vec![node("a.py", &["b", "b.py"]), node("b.py", &["a"])];
        graph
            .edges
            .push(Edge::durable("a.py", "b.py", RelationKind::Call));

        let count = merge_volatile(&mut graph);
        assert_eq!(count, 1);
        assert_eq!(
            pairs(&graph.edges),
            vec![("a.py", "b.py"), ("b.py", "a.py")]
        );

        let before = graph.edges.clone();
        merge_volatile(&mut graph);
        assert_eq!(graph.edges, before);
    }
}
