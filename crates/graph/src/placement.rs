use crate::config::{LayoutConfig, PlacementConfig};
use crate::types::{Cluster, ClusterRole, GraphSnapshot, NodeKind, NodeStatus};
use std::collections::HashSet;
use synapse_protocol::Position;

pub const DOC_SHELF_ID: &str = "cluster:docs";
pub const STORAGE_ID: &str = "cluster:storage";

/// Shelve documentation nodes and isolate edgeless nodes.
///
/// Runs on the composite graph after rank layout. Automatic clusters from a
/// previous run are replaced; nodes in user clusters, archived nodes and
/// pinned positions are left alone.
pub fn apply_placement(graph: &mut GraphSnapshot, placement: &PlacementConfig, layout: &LayoutConfig) {
    let auto_ids: Vec<String> = graph
        .clusters
        .iter()
        .filter(|cluster| cluster.is_auto())
        .map(|cluster| cluster.id.clone())
        .collect();
    graph.clusters.retain(|cluster| !cluster.is_auto());
    for node in &mut graph.nodes {
        if node.cluster.as_ref().is_some_and(|id| auto_ids.contains(id)) {
            node.cluster = None;
        }
    }

    let connected: HashSet<&str> = graph
        .edges
        .iter()
        .filter(|edge| edge.source != edge.target)
        .flat_map(|edge| [edge.source.as_str(), edge.target.as_str()])
        .collect();

    let mut docs = Vec::new();
    let mut isolated = Vec::new();
    for (slot, node) in graph.nodes.iter().enumerate() {
        if node.cluster.is_some() || node.status == NodeStatus::Archived {
            continue;
        }
        if node.kind == NodeKind::Documentation {
            if placement.doc_shelf {
                docs.push(slot);
            }
        } else if placement.storage_shelf && !connected.contains(node.id.as_str()) {
            isolated.push(slot);
        }
    }

    let shelved: HashSet<usize> = docs.iter().chain(&isolated).copied().collect();
    let main_bottom = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(slot, node)| !shelved.contains(slot) && node.status != NodeStatus::Archived)
        .map(|(_, node)| node.position.y + layout.node_height)
        .fold(layout.origin.y, f64::max);

    let doc_positions = (0..docs.len()).map(|i| {
        placement
            .doc_shelf_origin
            .offset(0.0, i as f64 * placement.shelf_spacing)
    });
    shelve(
        graph,
        Cluster::new(DOC_SHELF_ID, "Documentation", ClusterRole::DocShelf),
        &docs,
        doc_positions.collect(),
    );

    let storage_origin = Position::new(layout.origin.x, main_bottom + placement.storage_gap);
    let storage_positions = (0..isolated.len()).map(|i| {
        storage_origin.offset(i as f64 * layout.column_width, 0.0)
    });
    shelve(
        graph,
        Cluster::new(STORAGE_ID, "Storage", ClusterRole::Storage),
        &isolated,
        storage_positions.collect(),
    );
}

fn shelve(graph: &mut GraphSnapshot, mut cluster: Cluster, slots: &[usize], positions: Vec<Position>) {
    if slots.is_empty() {
        return;
    }
    for (&slot, position) in slots.iter().zip(positions) {
        let node = &mut graph.nodes[slot];
        if !node.pinned {
            node.position = position;
        }
        node.cluster = Some(cluster.id.clone());
        cluster.members.insert(node.id.clone());
    }
    graph.clusters.push(cluster);
}
