use crate::builder::GraphBuilder;
use crate::collision::{resolve_collisions, CollisionGeometry};
use crate::config::PlacementConfig;
use crate::error::{GraphError, Result};
use crate::types::{Approval, Cluster, ClusterRole, Edge, GraphSnapshot, Node, NodeStatus};
use serde::{Deserialize, Serialize};
use synapse_protocol::path_filters::normalize_path;
use synapse_protocol::{FileKind, Position, RelationKind};

/// A single change to the durable graph, as requested by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateNode {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<FileKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
    },
    DeleteNode {
        id: String,
    },
    /// Explicit placement; pins the node
    MoveNode {
        id: String,
        position: Position,
    },
    /// Make a proposed (or archived) node part of the durable graph
    PromoteNode {
        id: String,
    },
    ArchiveNode {
        id: String,
    },
    CreateEdge {
        source: String,
        target: String,
        #[serde(default)]
        kind: RelationKind,
    },
    UpdateEdge {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<RelationKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approval: Option<Approval>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<f64>,
    },
    DeleteEdge {
        id: String,
    },
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cluster_id: Option<String>,
        label: String,
        members: Vec<String>,
    },
    Ungroup {
        cluster_id: String,
    },
    /// Move every member by an offset, then clear intruders
    MoveCluster {
        cluster_id: String,
        dx: f64,
        dy: f64,
    },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateNode { .. } => "create_node",
            Mutation::DeleteNode { .. } => "delete_node",
            Mutation::MoveNode { .. } => "move_node",
            Mutation::PromoteNode { .. } => "promote_node",
            Mutation::ArchiveNode { .. } => "archive_node",
            Mutation::CreateEdge { .. } => "create_edge",
            Mutation::UpdateEdge { .. } => "update_edge",
            Mutation::DeleteEdge { .. } => "delete_edge",
            Mutation::Group { .. } => "group",
            Mutation::Ungroup { .. } => "ungroup",
            Mutation::MoveCluster { .. } => "move_cluster",
        }
    }
}

/// Applies mutations all-or-nothing: the input graph is never touched and a
/// failed mutation yields an error instead of a partial result.
pub struct GraphEditor {
    builder: GraphBuilder,
    placement: PlacementConfig,
}

impl GraphEditor {
    pub fn new(builder: GraphBuilder, placement: PlacementConfig) -> Result<Self> {
        placement.validate()?;
        Ok(Self { builder, placement })
    }

    /// `graph` is the durable graph, or a composite when promoting a
    /// proposed node. The result is always durable.
    pub fn apply(&self, graph: &GraphSnapshot, mutation: &Mutation) -> Result<GraphSnapshot> {
        let mut next = graph.clone();
        match mutation {
            Mutation::CreateNode {
                path,
                kind,
                position,
            } => {
                let id = normalize_path(path);
                if id.is_empty() {
                    return Err(GraphError::invalid_mutation("node path is empty"));
                }
                if next.contains_node(&id) {
                    return Err(GraphError::DuplicateNode(id));
                }
                let kind = kind.unwrap_or_else(|| FileKind::from_path(&id));
                let mut node = self.builder.node(&id, kind, next.nodes.len());
                if let Some(position) = position {
                    node.position = *position;
                    node.pinned = true;
                }
                next.nodes.push(node);
            }
            Mutation::DeleteNode { id } => {
                require_node(&next, id)?;
                next.nodes.retain(|node| &node.id != id);
                next.edges
                    .retain(|edge| &edge.source != id && &edge.target != id);
                next.detach_from_clusters(id);
                next.prune_clusters();
            }
            Mutation::MoveNode { id, position } => {
                let node = node_mut(&mut next, id)?;
                node.position = *position;
                node.pinned = true;
            }
            Mutation::PromoteNode { id } => {
                let node = node_mut(&mut next, id)?;
                node.status = NodeStatus::Active;
            }
            Mutation::ArchiveNode { id } => {
                node_mut(&mut next, id)?.status = NodeStatus::Archived;
            }
            Mutation::CreateEdge {
                source,
                target,
                kind,
            } => {
                require_node(&next, source)?;
                require_node(&next, target)?;
                if source == target {
                    return Err(GraphError::invalid_mutation(format!(
                        "self-edge on {source}"
                    )));
                }
                if !next.has_edge(source, target, *kind) {
                    next.edges.push(Edge::durable(source, target, *kind));
                }
            }
            Mutation::UpdateEdge {
                id,
                kind,
                approval,
                weight,
            } => {
                let edge = next
                    .edges
                    .iter_mut()
                    .find(|edge| &edge.id == id && !edge.volatile)
                    .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))?;
                if let Some(approval) = approval {
                    edge.approval = *approval;
                }
                if let Some(weight) = weight {
                    if !(weight.is_finite() && *weight > 0.0) {
                        return Err(GraphError::invalid_mutation(format!(
                            "edge weight must be positive, got {weight}"
                        )));
                    }
                    edge.weight = *weight;
                }
                if let Some(kind) = kind {
                    let (source, target) = (edge.source.clone(), edge.target.clone());
                    let renamed = Edge::durable(&source, &target, *kind).id;
                    if renamed != *id && next.edges.iter().any(|e| e.id == renamed) {
                        return Err(GraphError::invalid_mutation(format!(
                            "edge {renamed} already exists"
                        )));
                    }
                    if let Some(edge) = next.edges.iter_mut().find(|edge| &edge.id == id) {
                        edge.kind = *kind;
                        edge.id = renamed;
                    }
                }
            }
            Mutation::DeleteEdge { id } => {
                let before = next.edges.len();
                next.edges.retain(|edge| &edge.id != id);
                if next.edges.len() == before {
                    return Err(GraphError::EdgeNotFound(id.clone()));
                }
            }
            Mutation::Group {
                cluster_id,
                label,
                members,
            } => {
                if members.is_empty() {
                    return Err(GraphError::invalid_mutation("a group needs members"));
                }
                for member in members {
                    require_node(&next, member)?;
                }
                let id = match cluster_id {
                    Some(id) => id.clone(),
                    None => fresh_cluster_id(&next, label),
                };
                for member in members {
                    next.detach_from_clusters(member);
                }
                if next.cluster(&id).is_none() {
                    next.clusters
                        .push(Cluster::new(id.clone(), label.clone(), ClusterRole::User));
                }
                if let Some(cluster) = next.cluster_mut(&id) {
                    cluster.label = label.clone();
                    cluster.members.extend(members.iter().cloned());
                }
                for member in members {
                    if let Some(node) = next.node_mut(member) {
                        node.cluster = Some(id.clone());
                    }
                }
                next.prune_clusters();
            }
            Mutation::Ungroup { cluster_id } => {
                if next.cluster(cluster_id).is_none() {
                    return Err(GraphError::ClusterNotFound(cluster_id.clone()));
                }
                next.clusters.retain(|cluster| &cluster.id != cluster_id);
                for node in &mut next.nodes {
                    if node.cluster.as_ref() == Some(cluster_id) {
                        node.cluster = None;
                    }
                }
                next.prune_clusters();
            }
            Mutation::MoveCluster { cluster_id, dx, dy } => {
                let members = next
                    .cluster(cluster_id)
                    .map(|cluster| cluster.members.clone())
                    .ok_or_else(|| GraphError::ClusterNotFound(cluster_id.clone()))?;
                for node in &mut next.nodes {
                    if members.contains(&node.id) {
                        node.position = node.position.offset(*dx, *dy);
                        node.pinned = true;
                    }
                }
                let layout = self.builder.config();
                resolve_collisions(
                    &mut next,
                    cluster_id,
                    CollisionGeometry {
                        node_width: layout.node_width,
                        node_height: layout.node_height,
                        padding: self.placement.collision_padding,
                        margin: self.placement.collision_margin,
                    },
                );
            }
        }

        log::debug!("Applied {}", mutation.name());
        Ok(next.durable())
    }
}

fn require_node(graph: &GraphSnapshot, id: &str) -> Result<()> {
    if graph.contains_node(id) {
        Ok(())
    } else {
        Err(GraphError::NodeNotFound(id.to_string()))
    }
}

fn node_mut<'a>(graph: &'a mut GraphSnapshot, id: &str) -> Result<&'a mut Node> {
    graph
        .node_mut(id)
        .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
}

fn fresh_cluster_id(graph: &GraphSnapshot, label: &str) -> String {
    let slug: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    let base = format!("cluster:{}", if slug.is_empty() { "group" } else { slug });
    if graph.cluster(&base).is_none() {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| graph.cluster(candidate).is_none())
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use pretty_assertions::assert_eq;

    fn editor() -> GraphEditor {
        GraphEditor::new(
            GraphBuilder::new(LayoutConfig::default()).unwrap(),
            PlacementConfig::default(),
        )
        .unwrap()
    }

    fn seeded() -> GraphSnapshot {
        GraphBuilder::new(LayoutConfig::default())
            .unwrap()
            .from_paths(["main.py", "db.py", "util.py"])
    }

    fn apply(graph: &GraphSnapshot, mutation: Mutation) -> GraphSnapshot {
        editor().apply(graph, &mutation).unwrap()
    }

    #[test]
    fn edge_lifecycle() {
        let create = Mutation::CreateEdge {
            source: "main.py".to_string(),
            target: "db.py".to_string(),
            kind: RelationKind::Call,
        };
        let graph = apply(&seeded(), create.clone());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(apply(&graph, create), graph);

        let graph = apply(
            &graph,
            Mutation::UpdateEdge {
                id: "main.py->db.py#call".to_string(),
                kind: Some(RelationKind::DataFlow),
                approval: Some(Approval::Pending),
                weight: None,
            },
        );
        assert_eq!(graph.edges[0].id, "main.py->db.py#data_flow");
        assert_eq!(graph.edges[0].approval, Approval::Pending);

        let graph = apply(
            &graph,
            Mutation::DeleteEdge {
                id: "main.py->db.py#data_flow".to_string(),
            },
        );
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn invalid_mutations_leave_the_graph_alone() {
        let graph = seeded();
        let editor = editor();
        let missing = Mutation::CreateEdge {
            source: "main.py".to_string(),
            target: "ghost.py".to_string(),
            kind: RelationKind::Call,
        };
        assert!(matches!(
            editor.apply(&graph, &missing),
            Err(GraphError::NodeNotFound(id)) if id == "ghost.py"
        ));

        let self_edge = Mutation::CreateEdge {
            source: "main.py".to_string(),
            target: "main.py".to_string(),
            kind: RelationKind::Call,
        };
        assert!(editor.apply(&graph, &self_edge).is_err());
        assert!(editor
            .apply(&graph, &Mutation::Ungroup { cluster_id: "nope".to_string() })
            .is_err());
        assert_eq!(graph, seeded());
    }

    #[test]
    fn deleting_the_last_member_prunes_the_cluster() {
        let graph = apply(
            &seeded(),
            Mutation::Group {
                cluster_id: None,
                label: "Data Layer".to_string(),
                members: vec!["db.py".to_string()],
            },
        );
        assert_eq!(graph.clusters[0].id, "cluster:data-layer");
        assert_eq!(graph.node("db.py").unwrap().cluster.as_deref(), Some("cluster:data-layer"));

        let graph = apply(&graph, Mutation::DeleteNode { id: "db.py".to_string() });
        assert!(graph.clusters.is_empty());
    }

    #[test]
    fn regrouping_moves_a_node_between_clusters() {
        let group = |id: &str, members: &[&str]| Mutation::Group {
            cluster_id: Some(id.to_string()),
            label: id.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        };
        let graph = apply(&seeded(), group("a", &["db.py"]));
        let graph = apply(&graph, group("b", &["db.py", "util.py"]));
        assert_eq!(graph.clusters.len(), 1);
        assert_eq!(graph.clusters[0].id, "b");
    }

    #[test]
    fn promotion_makes_proposed_nodes_durable() {
        let mut composite = seeded();
        let mut proposed = Node::file("auth.py", FileKind::Source);
        proposed.status = NodeStatus::Proposed;
        composite.nodes.push(proposed);

        let graph = apply(&composite, Mutation::PromoteNode { id: "auth.py".to_string() });
        assert_eq!(graph.node("auth.py").unwrap().status, NodeStatus::Active);
        assert_eq!(graph.nodes.len(), 4);
    }

    #[test]
    fn mutations_are_tagged_json() {
        let parsed: Mutation = serde_json::from_str(
            r#"{"op": "move_cluster", "cluster_id": "core", "dx": 10, "dy": -5}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            Mutation::MoveCluster {
                cluster_id: "core".to_string(),
                dx: 10.0,
                dy: -5.0
            }
        );
    }
}
