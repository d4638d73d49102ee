use crate::types::{ClusterRole, GraphSnapshot, Node, NodeStatus};
use synapse_protocol::Rect;

/// Footprint of a node on the canvas
pub fn node_rect(node: &Node, width: f64, height: f64) -> Rect {
    Rect::at(node.position, width, height)
}

/// Bounding box of a cluster's members, `None` for an unknown or empty cluster
pub fn cluster_bounds(
    graph: &GraphSnapshot,
    cluster_id: &str,
    width: f64,
    height: f64,
) -> Option<Rect> {
    let cluster = graph.cluster(cluster_id)?;
    graph
        .nodes
        .iter()
        .filter(|node| cluster.members.contains(&node.id))
        .map(|node| node_rect(node, width, height))
        .reduce(|acc, rect| acc.union(&rect))
}

/// Node footprint and spacing used by [`resolve_collisions`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionGeometry {
    pub node_width: f64,
    pub node_height: f64,
    pub padding: f64,
    pub margin: f64,
}

/// One-shot displacement of nodes intruding on a cluster.
///
/// Every node outside the cluster whose footprint overlaps the padded
/// bounding box is moved straight down to `bottom + margin` and pinned there.
/// The box only depends on the members, so a second pass finds nothing to
/// move. Returns the ids of the moved nodes.
pub fn resolve_collisions(
    graph: &mut GraphSnapshot,
    cluster_id: &str,
    geometry: CollisionGeometry,
) -> Vec<String> {
    displace_intruders(graph, cluster_id, geometry, true)
}

/// Clear the box of every user cluster after layout has placed the nodes.
///
/// Unlike [`resolve_collisions`] nothing is pinned: layout recomputes the
/// positions on every read. Returns how many nodes moved.
pub fn clear_user_clusters(graph: &mut GraphSnapshot, geometry: CollisionGeometry) -> usize {
    let ids: Vec<String> = graph
        .clusters
        .iter()
        .filter(|cluster| cluster.role == ClusterRole::User)
        .map(|cluster| cluster.id.clone())
        .collect();
    ids.iter()
        .map(|id| displace_intruders(graph, id, geometry, false).len())
        .sum()
}

fn displace_intruders(
    graph: &mut GraphSnapshot,
    cluster_id: &str,
    geometry: CollisionGeometry,
    pin: bool,
) -> Vec<String> {
    let Some(bounds) =
        cluster_bounds(graph, cluster_id, geometry.node_width, geometry.node_height)
    else {
        return Vec::new();
    };
    let members = graph
        .cluster(cluster_id)
        .map(|cluster| cluster.members.clone())
        .unwrap_or_default();
    let bounds = bounds.expand(geometry.padding);
    let target_y = bounds.bottom() + geometry.margin;

    let mut moved = Vec::new();
    for node in &mut graph.nodes {
        if members.contains(&node.id) || node.status == NodeStatus::Archived {
            continue;
        }
        if node_rect(node, geometry.node_width, geometry.node_height).intersects(&bounds) {
            node.position.y = target_y;
            if pin {
                node.pinned = true;
            }
            moved.push(node.id.clone());
        }
    }

    if !moved.is_empty() {
        log::debug!("Moved {} nodes clear of cluster {cluster_id}", moved.len());
    }
    moved
}
