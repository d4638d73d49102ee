use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use synapse_protocol::{FileKind, Position, RelationKind, GRAPH_SCHEMA_VERSION};
use synapse_scanner::{Language, ScanSummary, StepKind};

/// Prefix of identifiers for nodes that do not map to a file
pub const SYNTHETIC_PREFIX: &str = "synthetic:";

/// What a node stands for. Kind-specific payload lives on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Source {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Config,
    Documentation,
    Test,
    /// Third-party package referenced by project code
    External { package: String },
    /// Virtual entity such as a merge point
    Synthetic { role: String },
}

impl NodeKind {
    pub fn for_file(path: &str, kind: FileKind) -> Self {
        match kind {
            FileKind::Source => {
                let language = match Language::from_path(path) {
                    Language::Unknown => None,
                    lang => Some(lang.as_str().to_string()),
                };
                NodeKind::Source { language }
            }
            FileKind::Config => NodeKind::Config,
            FileKind::Documentation => NodeKind::Documentation,
            FileKind::Test => NodeKind::Test,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "source",
            NodeKind::Config => "config",
            NodeKind::Documentation => "documentation",
            NodeKind::Test => "test",
            NodeKind::External { .. } => "external",
            NodeKind::Synthetic { .. } => "synthetic",
        }
    }
}

/// Lifecycle: proposed → active → archived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Declared by the specification document but not on disk; never persisted
    Proposed,
    #[default]
    Active,
    Archived,
}

/// A file, logical module or synthetic entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Normalized project-relative path, or `synthetic:<name>`
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub status: NodeStatus,
    pub position: Position,

    /// Set by explicit placement; layout never moves a pinned node
    #[serde(default)]
    pub pinned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// 0 discovery, 1 reasoning, 2 action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u8>,

    /// Ordering within a layer, higher first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Explicit step type for flow extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<StepKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
}

impl Node {
    pub fn file(path: &str, kind: FileKind) -> Self {
        let id = synapse_protocol::path_filters::normalize_path(path);
        let label = id.rsplit('/').next().unwrap_or(&id).to_string();
        Self {
            kind: NodeKind::for_file(&id, kind),
            id,
            label,
            status: NodeStatus::Active,
            position: Position::default(),
            pinned: false,
            cluster: None,
            layer: None,
            priority: None,
            step_type: None,
            summary: None,
        }
    }

    pub fn synthetic(name: &str, role: impl Into<String>) -> Self {
        Self {
            id: format!("{SYNTHETIC_PREFIX}{name}"),
            label: name.to_string(),
            kind: NodeKind::Synthetic { role: role.into() },
            status: NodeStatus::Active,
            position: Position::default(),
            pinned: false,
            cluster: None,
            layer: None,
            priority: None,
            step_type: None,
            summary: None,
        }
    }

    /// Project-relative path, `None` for synthetic nodes
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        if self.id.starts_with(SYNTHETIC_PREFIX) {
            return None;
        }
        Some(&self.id)
    }

    /// Lowercased file name without extension (the label for synthetic nodes)
    #[must_use]
    pub fn stem(&self) -> String {
        let name: &str = match self.path() {
            Some(path) => Path::new(path)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(path),
            None => &self.label,
        };
        name.to_lowercase()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }
}

/// Confirmation state of an edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    #[default]
    Approved,
    Pending,
    Rejected,
    /// Derived from source scanning
    Inferred,
}

fn default_weight() -> f64 {
    1.0
}

/// A directed relation between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: RelationKind,
    #[serde(default)]
    pub approval: Approval,

    /// Advisory line weight for the renderer
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Re-derived on every read, never persisted
    #[serde(default)]
    pub volatile: bool,
}

impl Edge {
    pub fn durable(source: &str, target: &str, kind: RelationKind) -> Self {
        Self {
            id: format!("{source}->{target}#{kind}"),
            source: source.to_string(),
            target: target.to_string(),
            kind,
            approval: Approval::Approved,
            weight: default_weight(),
            volatile: false,
        }
    }

    pub fn volatile(source: &str, target: &str) -> Self {
        Self {
            id: format!("auto:{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
            kind: RelationKind::Dependency,
            approval: Approval::Inferred,
            weight: default_weight(),
            volatile: true,
        }
    }
}

/// Who owns a cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterRole {
    #[default]
    User,
    /// Fixed-position shelf for documentation nodes
    DocShelf,
    /// Nodes left without edges after derivation
    Storage,
}

/// A named grouping of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub role: ClusterRole,
}

impl Cluster {
    pub fn new(id: impl Into<String>, label: impl Into<String>, role: ClusterRole) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            collapsed: false,
            members: BTreeSet::new(),
            role,
        }
    }

    /// Created by the placement policy rather than by a user
    #[must_use]
    pub fn is_auto(&self) -> bool {
        self.role != ClusterRole::User
    }
}

/// Nodes, edges and clusters as exchanged with the store and the renderer.
///
/// The same type carries both the durable graph and the composite graph; the
/// composite additionally holds volatile edges, proposed nodes and automatic
/// clusters, which [`GraphSnapshot::durable`] strips again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default = "schema_version")]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

fn schema_version() -> u32 {
    GRAPH_SCHEMA_VERSION
}

impl Default for GraphSnapshot {
    fn default() -> Self {
        Self {
            version: GRAPH_SCHEMA_VERSION,
            nodes: Vec::new(),
            edges: Vec::new(),
            clusters: Vec::new(),
        }
    }
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    /// Any edge from `source` to `target`, whatever its kind
    pub fn connects(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: RelationKind) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target && edge.kind == kind)
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn cluster_mut(&mut self, id: &str) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|cluster| cluster.id == id)
    }

    pub fn cluster_of(&self, node_id: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|cluster| cluster.members.contains(node_id))
    }

    /// Take a node out of whichever cluster holds it
    pub fn detach_from_clusters(&mut self, node_id: &str) {
        for cluster in &mut self.clusters {
            cluster.members.remove(node_id);
        }
        if let Some(node) = self.node_mut(node_id) {
            node.cluster = None;
        }
    }

    /// Remove clusters without members. Returns the removed ids.
    pub fn prune_clusters(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        self.clusters.retain(|cluster| {
            if cluster.members.is_empty() {
                removed.push(cluster.id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            for node in &mut self.nodes {
                if node.cluster.as_ref().is_some_and(|id| removed.contains(id)) {
                    node.cluster = None;
                }
            }
        }
        removed
    }

    /// Drop edges whose endpoints no longer exist. Returns how many went.
    pub fn drop_dangling_edges(&mut self) -> usize {
        let ids: HashSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        let before = self.edges.len();
        self.edges.retain(|edge| {
            ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str())
        });
        before - self.edges.len()
    }

    /// Make cluster membership consistent: unknown members are dropped, a node
    /// claimed by several clusters stays in the first, `Node::cluster` mirrors
    /// the membership, and empty clusters are pruned.
    pub fn repair_memberships(&mut self) {
        let ids: HashSet<String> = self.nodes.iter().map(|node| node.id.clone()).collect();
        let mut claimed: HashSet<String> = HashSet::new();
        for cluster in &mut self.clusters {
            cluster
                .members
                .retain(|member| ids.contains(member) && claimed.insert(member.clone()));
        }
        for node in &mut self.nodes {
            node.cluster = self
                .clusters
                .iter()
                .find(|cluster| cluster.members.contains(&node.id))
                .map(|cluster| cluster.id.clone());
        }
        self.prune_clusters();
    }

    /// What may be written to the durable store: no volatile edges, no
    /// proposed nodes, no automatic clusters, no scan summaries.
    #[must_use]
    pub fn durable(&self) -> GraphSnapshot {
        let mut durable = self.clone();
        durable
            .nodes
            .retain(|node| node.status != NodeStatus::Proposed);
        durable.edges.retain(|edge| !edge.volatile);
        durable.clusters.retain(|cluster| !cluster.is_auto());
        for node in &mut durable.nodes {
            node.summary = None;
        }
        durable.drop_dangling_edges();
        durable.repair_memberships();
        durable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_nodes_carry_language_and_label() {
        let node = Node::file("./src/login.py", FileKind::Source);
        assert_eq!(node.id, "src/login.py");
        assert_eq!(node.label, "login.py");
        assert_eq!(node.stem(), "login");
        assert_eq!(
            node.kind,
            NodeKind::Source {
                language: Some("python".to_string())
            }
        );
        assert_eq!(node.path(), Some("src/login.py"));

        let merge = Node::synthetic("Merge", "merge");
        assert_eq!(merge.id, "synthetic:Merge");
        assert_eq!(merge.path(), None);
        assert_eq!(merge.stem(), "merge");
    }

    #[test]
    fn node_kind_is_tagged() {
        let json = serde_json::to_value(NodeKind::External {
            package: "axios".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "external", "package": "axios"}));
        let config: NodeKind = serde_json::from_value(serde_json::json!({"type": "config"})).unwrap();
        assert_eq!(config, NodeKind::Config);
    }

    #[test]
    fn durable_view_strips_composite_parts() {
        let mut graph = GraphSnapshot::new();
        graph.nodes.push(Node::file("a.py", FileKind::Source));
        graph.nodes.push(Node::file("b.py", FileKind::Source));
        let mut proposed = Node::file("c.py", FileKind::Source);
        proposed.status = NodeStatus::Proposed;
        graph.nodes.push(proposed);
        graph.edges.push(Edge::durable("a.py", "b.py", RelationKind::Call));
        graph.edges.push(Edge::volatile("b.py", "a.py"));
        graph.edges.push(Edge::durable("a.py", "c.py", RelationKind::Call));
        let mut shelf = Cluster::new("cluster:storage", "Storage", ClusterRole::Storage);
        shelf.members.insert("b.py".to_string());
        graph.clusters.push(shelf);

        let durable = graph.durable();
        assert_eq!(durable.nodes.len(), 2);
        assert_eq!(durable.edges.len(), 1);
        assert!(durable.clusters.is_empty());
        assert_eq!(durable.node("b.py").and_then(|n| n.cluster.clone()), None);
    }

    #[test]
    fn repair_keeps_one_cluster_per_node() {
        let mut graph = GraphSnapshot::new();
        graph.nodes.push(Node::file("a.py", FileKind::Source));
        let mut first = Cluster::new("one", "One", ClusterRole::User);
        first.members.extend(["a.py".to_string(), "gone.py".to_string()]);
        let mut second = Cluster::new("two", "Two", ClusterRole::User);
        second.members.insert("a.py".to_string());
        graph.clusters = vec![first, second];

        graph.repair_memberships();
        assert_eq!(graph.clusters.len(), 1);
        assert_eq!(graph.clusters[0].id, "one");
        assert_eq!(graph.node("a.py").unwrap().cluster.as_deref(), Some("one"));
    }
}
