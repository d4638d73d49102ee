use crate::collision::{self, CollisionGeometry};
use crate::config::{LayoutConfig, PlacementConfig};
use crate::derive;
use crate::error::Result;
use crate::layers;
use crate::layout;
use crate::placement;
use crate::types::{GraphSnapshot, Node, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use synapse_protocol::path_filters::normalize_path;
use synapse_protocol::FileKind;
use synapse_scanner::ScanSummary;

/// A file the specification declares but the disk does not have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedFile {
    pub path: String,
    pub kind: FileKind,
}

/// What one assembly pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub volatile_edges: usize,
    pub dangling_dropped: usize,
    pub proposed_nodes: usize,
    pub moved_nodes: usize,
    /// Nodes pushed out of a user cluster's box after layout
    #[serde(default)]
    pub displaced_nodes: usize,
}

/// Durable graph plus everything derived on read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeGraph {
    #[serde(flatten)]
    pub graph: GraphSnapshot,
    pub report: AssemblyReport,
}

/// Turns the durable graph and fresh scan results into the composite graph.
///
/// ```text
/// durable ──drop dangling──> + summaries + proposed ──derive──> + volatile edges
///        ──rank layout──> ──placement──> ──clear cluster boxes──> composite
/// ```
///
/// The durable input is never modified.
pub struct GraphAssembler {
    layout: LayoutConfig,
    placement: PlacementConfig,
}

impl GraphAssembler {
    pub fn new(layout: LayoutConfig, placement: PlacementConfig) -> Result<Self> {
        layout.validate()?;
        placement.validate()?;
        Ok(Self { layout, placement })
    }

    pub fn assemble(
        &self,
        durable: &GraphSnapshot,
        summaries: &HashMap<String, ScanSummary>,
        proposed: &[ProposedFile],
    ) -> CompositeGraph {
        let mut graph = durable.clone();
        let mut report = AssemblyReport {
            dangling_dropped: graph.drop_dangling_edges(),
            ..Default::default()
        };
        if report.dangling_dropped > 0 {
            log::debug!("Dropped {} dangling edges", report.dangling_dropped);
        }
        graph.edges.retain(|edge| !edge.volatile);
        graph.repair_memberships();

        for node in &mut graph.nodes {
            layers::assign(node, &self.layout);
            node.summary = summaries.get(&node.id).cloned();
        }

        for file in proposed {
            let id = normalize_path(&file.path);
            if id.is_empty() || graph.contains_node(&id) {
                continue;
            }
            let mut node = Node::file(&id, file.kind);
            node.status = NodeStatus::Proposed;
            layers::assign(&mut node, &self.layout);
            graph.nodes.push(node);
            report.proposed_nodes += 1;
        }

        report.volatile_edges = derive::merge_volatile(&mut graph);
        report.moved_nodes = layout::apply_rank_layout(&mut graph, &self.layout);
        placement::apply_placement(&mut graph, &self.placement, &self.layout);
        report.displaced_nodes = collision::clear_user_clusters(
            &mut graph,
            CollisionGeometry {
                node_width: self.layout.node_width,
                node_height: self.layout.node_height,
                padding: self.placement.collision_padding,
                margin: self.placement.collision_margin,
            },
        );

        log::debug!(
            "Assembled {} nodes, {} edges ({} volatile)",
            graph.nodes.len(),
            graph.edges.len(),
            report.volatile_edges
        );
        CompositeGraph { graph, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;
    use pretty_assertions::assert_eq;
    use synapse_protocol::RelationKind;

    fn summary(references: &[&str]) -> ScanSummary {
        ScanSummary {
            symbols: Vec::new(),
            references: references.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn composite_adds_derived_parts_without_touching_durable() {
        let mut durable = GraphSnapshot::new();
        for path in ["main.py", "db.py", "README.md"] {
            durable.nodes.push(Node::file(path, FileKind::from_path(path)));
        }
        durable
            .edges
            .push(Edge::durable("main.py", "ghost.py", RelationKind::Call));
        let original = durable.clone();

        let summaries = HashMap::from([("main.py".to_string(), summary(&["db", "os"]))]);
        let proposed = vec![ProposedFile {
            path: "auth.py".to_string(),
            kind: FileKind::Source,
        }];

        let assembler =
            GraphAssembler::new(LayoutConfig::default(), PlacementConfig::default()).unwrap();
        let composite = assembler.assemble(&durable, &summaries, &proposed);

        assert_eq!(durable, original);
        assert_eq!(composite.report.dangling_dropped, 1);
        assert_eq!(composite.report.volatile_edges, 1);
        assert_eq!(composite.report.proposed_nodes, 1);
        assert_eq!(composite.graph.edges[0].id, "auto:main.py->db.py");
        assert_eq!(
            composite.graph.node("auth.py").unwrap().status,
            NodeStatus::Proposed
        );
        assert!(composite.graph.cluster(placement::DOC_SHELF_ID).is_some());

        // nothing derived leaks back into the durable form
        let back = composite.graph.durable();
        assert_eq!(back.nodes.len(), 3);
        assert!(back.edges.is_empty());
        assert!(back.clusters.is_empty());
    }
}
