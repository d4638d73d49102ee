use crate::config::AnalyzerConfig;
use crate::graph::GraphView;
use crate::types::{GraphSnapshot, Node, NodeKind};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Cycle,
    Bottleneck,
    DeadEnd,
    Unreachable,
}

/// One structural problem with the node and edge ids it implicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<String>,
    pub description: String,
}

/// Findings plus a 0-100 completeness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralReport {
    pub findings: Vec<Finding>,
    pub score: u8,
}

impl StructuralReport {
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |finding| finding.kind == kind)
    }

    /// Findings that name `node_id`
    pub fn about<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings
            .iter()
            .filter(move |finding| finding.nodes.iter().any(|id| id == node_id))
    }
}

/// Read-only analysis of the composite graph. Archived and proposed nodes
/// are ignored.
pub struct StructuralAnalyzer {
    config: AnalyzerConfig,
}

impl StructuralAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, graph: &GraphSnapshot) -> StructuralReport {
        let view = GraphView::new(graph);
        let mut findings = Vec::new();

        findings.extend(self.cycles(&view));
        findings.extend(self.bottlenecks(&view));

        let roots = view.roots(&self.config.entry_names);
        let reachable: HashSet<NodeIndex> = view.reachable(&roots).into_iter().collect();
        findings.extend(self.dead_ends(&view, &reachable));
        findings.extend(self.unreachable(&view, &reachable));

        let penalty: u32 = findings
            .iter()
            .map(|finding| match finding.kind {
                FindingKind::Cycle => self.config.cycle_penalty,
                FindingKind::Bottleneck => self.config.bottleneck_penalty,
                FindingKind::DeadEnd => self.config.dead_end_penalty,
                FindingKind::Unreachable => self.config.unreachable_penalty,
            })
            .sum();
        let score = 100u32.saturating_sub(penalty) as u8;

        log::debug!(
            "Structural analysis: {} findings over {} nodes, score {score}",
            findings.len(),
            view.node_count()
        );
        StructuralReport { findings, score }
    }

    /// For every edge a→b, BFS from b back to a. Each distinct node set is
    /// reported once.
    fn cycles(&self, view: &GraphView<'_>) -> Vec<Finding> {
        let mut seen: HashSet<BTreeSet<NodeIndex>> = HashSet::new();
        let mut findings = Vec::new();

        for (from, _) in view.nodes() {
            for to in view.successors(from) {
                let Some(path) = view.path(to, from) else {
                    continue;
                };
                let members: BTreeSet<NodeIndex> = path.iter().copied().collect();
                if !seen.insert(members) {
                    continue;
                }

                let mut cycle = vec![from];
                cycle.extend(path.iter().copied().take_while(|&idx| idx != from));
                let edges = cycle
                    .iter()
                    .zip(cycle.iter().cycle().skip(1))
                    .filter_map(|(&a, &b)| view.edge_id(a, b).map(str::to_string))
                    .collect();
                let nodes: Vec<String> =
                    cycle.iter().map(|&idx| view.node(idx).id.clone()).collect();

                findings.push(Finding {
                    kind: FindingKind::Cycle,
                    description: format!(
                        "Circular dependency: {} -> {}",
                        nodes.join(" -> "),
                        nodes[0]
                    ),
                    nodes,
                    edges,
                });
            }
        }
        findings
    }

    fn bottlenecks(&self, view: &GraphView<'_>) -> Vec<Finding> {
        let count = view.node_count();
        if count == 0 {
            return Vec::new();
        }
        let mean = view.edge_count() as f64 / count as f64;
        let threshold =
            (self.config.bottleneck_factor * mean).max(self.config.min_bottleneck_degree as f64);

        view.nodes()
            .filter_map(|(idx, node)| {
                let fan_in = view.in_degree(idx);
                let fan_out = view.out_degree(idx);
                if fan_in as f64 <= threshold && fan_out as f64 <= threshold {
                    return None;
                }
                Some(Finding {
                    kind: FindingKind::Bottleneck,
                    nodes: vec![node.id.clone()],
                    edges: Vec::new(),
                    description: format!(
                        "{} has {fan_in} incoming and {fan_out} outgoing edges (threshold {threshold:.1})",
                        node.id
                    ),
                })
            })
            .collect()
    }

    fn dead_ends(&self, view: &GraphView<'_>, reachable: &HashSet<NodeIndex>) -> Vec<Finding> {
        view.nodes()
            .filter(|(idx, node)| {
                reachable.contains(idx)
                    && view.out_degree(*idx) == 0
                    && view.in_degree(*idx) > 0
                    && !self.is_ignored(node)
                    && !self.is_terminal(node)
            })
            .map(|(_, node)| Finding {
                kind: FindingKind::DeadEnd,
                nodes: vec![node.id.clone()],
                edges: Vec::new(),
                description: format!("{} is reachable but leads nowhere", node.id),
            })
            .collect()
    }

    fn unreachable(&self, view: &GraphView<'_>, reachable: &HashSet<NodeIndex>) -> Vec<Finding> {
        view.nodes()
            .filter(|(idx, node)| !reachable.contains(idx) && !self.is_ignored(node))
            .map(|(_, node)| Finding {
                kind: FindingKind::Unreachable,
                nodes: vec![node.id.clone()],
                edges: Vec::new(),
                description: format!("{} is not reachable from any entry point", node.id),
            })
            .collect()
    }

    fn is_ignored(&self, node: &Node) -> bool {
        self.config
            .ignored_kinds
            .iter()
            .any(|kind| kind.eq_ignore_ascii_case(node.kind.as_str()))
    }

    /// Nodes that may legitimately end a chain
    fn is_terminal(&self, node: &Node) -> bool {
        if matches!(node.kind, NodeKind::External { .. } | NodeKind::Config) {
            return true;
        }
        let stem = node.stem();
        self.config.terminal_keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            stem == keyword || stem.ends_with(&format!("_{keyword}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, NodeStatus};
    use pretty_assertions::assert_eq;
    use synapse_protocol::{FileKind, RelationKind};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> GraphSnapshot {
        let mut graph = GraphSnapshot::new();
        for id in ids {
            graph.nodes.push(Node::file(id, FileKind::from_path(id)));
        }
        for (from, to) in edges {
            graph.edges.push(Edge::durable(from, to, RelationKind::Call));
        }
        graph
    }

    fn analyze(graph: &GraphSnapshot) -> StructuralReport {
        StructuralAnalyzer::new(AnalyzerConfig::default()).analyze(graph)
    }

    #[test]
    fn two_node_cycle_is_reported_once() {
        let graph = graph(
            &["main.py", "a.py", "b.py"],
            &[("main.py", "a.py"), ("a.py", "b.py"), ("b.py", "a.py")],
        );
        let report = analyze(&graph);
        let cycles: Vec<&Finding> = report.of_kind(FindingKind::Cycle).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["a.py", "b.py"]);
        assert_eq!(cycles[0].edges, vec!["a.py->b.py#call", "b.py->a.py#call"]);
        assert_eq!(report.score, 85);
    }

    #[test]
    fn hubs_are_bottlenecks() {
        let leaves = ["a.py", "b.py", "c.py", "d.py", "e.py"];
        let mut ids = vec!["main.py", "hub.py"];
        ids.extend(leaves);
        let mut edges = vec![("main.py", "hub.py")];
        edges.extend(leaves.iter().map(|leaf| ("hub.py", *leaf)));
        let report = analyze(&graph(&ids, &edges));

        let hubs: Vec<&Finding> = report.of_kind(FindingKind::Bottleneck).collect();
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].nodes, vec!["hub.py"]);
    }

    #[test]
    fn terminals_and_ignored_kinds_are_not_dead_ends() {
        let graph = graph(
            &["main.py", "models.py", "settings.toml", "README.md", "worker.py"],
            &[
                ("main.py", "models.py"),
                ("main.py", "settings.toml"),
                ("main.py", "worker.py"),
            ],
        );
        let report = analyze(&graph);
        let dead: Vec<&str> = report
            .of_kind(FindingKind::DeadEnd)
            .map(|f| f.nodes[0].as_str())
            .collect();
        assert_eq!(dead, vec!["worker.py"]);
        assert_eq!(report.of_kind(FindingKind::Unreachable).count(), 0);
    }

    #[test]
    fn archived_nodes_are_ignored() {
        let mut graph = graph(&["main.py", "old.py"], &[]);
        graph.nodes[1].status = NodeStatus::Archived;
        let report = analyze(&graph);
        assert!(report.findings.is_empty());
        assert_eq!(report.score, 100);
    }
}
