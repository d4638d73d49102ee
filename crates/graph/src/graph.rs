use crate::types::{GraphSnapshot, Node};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef, VisitMap};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Read-only petgraph view over the active part of a snapshot.
///
/// Node weights index into `snapshot.nodes`, edge weights into
/// `snapshot.edges`. Self-loops and edges touching proposed or archived
/// nodes are left out.
pub struct GraphView<'a> {
    snapshot: &'a GraphSnapshot,
    graph: DiGraph<usize, usize>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> GraphView<'a> {
    pub fn new(snapshot: &'a GraphSnapshot) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for (position, node) in snapshot.nodes.iter().enumerate() {
            if node.is_active() && !index.contains_key(node.id.as_str()) {
                index.insert(node.id.as_str(), graph.add_node(position));
            }
        }

        let mut seen: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        for (position, edge) in snapshot.edges.iter().enumerate() {
            if edge.source == edge.target {
                continue;
            }
            let (Some(&from), Some(&to)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            // One topological edge per pair; kinds only matter to the renderer
            if seen.insert((from, to)) {
                graph.add_edge(from, to, position);
            }
        }

        Self {
            snapshot,
            graph,
            index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Position of the node in `snapshot.nodes`
    pub fn slot(&self, idx: NodeIndex) -> usize {
        self.graph[idx]
    }

    pub fn node(&self, idx: NodeIndex) -> &'a Node {
        &self.snapshot.nodes[self.graph[idx]]
    }

    /// Active nodes in snapshot order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &'a Node)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, self.node(idx)))
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Direct successors in edge insertion order
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_unstable();
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Identifier of the snapshot edge behind `from -> to`
    pub fn edge_id(&self, from: NodeIndex, to: NodeIndex) -> Option<&'a str> {
        self.graph
            .find_edge(from, to)
            .map(|edge| self.snapshot.edges[self.graph[edge]].id.as_str())
    }

    /// Breadth-first reachability from every root, roots first. The visited
    /// map makes this terminate on cyclic graphs.
    pub fn reachable(&self, roots: &[NodeIndex]) -> Vec<NodeIndex> {
        let Some((&first, rest)) = roots.split_first() else {
            return Vec::new();
        };

        let mut bfs = Bfs::new(&self.graph, first);
        for &root in rest {
            if bfs.discovered.visit(root) {
                bfs.stack.push_back(root);
            }
        }

        let mut order = Vec::new();
        while let Some(idx) = bfs.next(&self.graph) {
            order.push(idx);
        }
        order
    }

    /// Shortest path `from ..= to` by BFS, `None` when `to` is unreachable
    pub fn path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(&prev) = parent.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.successors(current) {
                if visited.insert(next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Nodes whose stem is one of `entry_names`; failing that, sources
    /// (no incoming, some outgoing edges); failing that, the first node.
    pub fn roots(&self, entry_names: &[String]) -> Vec<NodeIndex> {
        let named: Vec<NodeIndex> = self
            .nodes()
            .filter(|(_, node)| {
                let stem = node.stem();
                entry_names.iter().any(|name| name.eq_ignore_ascii_case(&stem))
            })
            .map(|(idx, _)| idx)
            .collect();
        if !named.is_empty() {
            return named;
        }

        let sources: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.in_degree(idx) == 0 && self.out_degree(idx) > 0)
            .collect();
        if !sources.is_empty() {
            return sources;
        }

        self.graph.node_indices().take(1).collect()
    }
}
