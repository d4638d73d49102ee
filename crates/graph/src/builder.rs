use crate::config::LayoutConfig;
use crate::error::Result;
use crate::layers;
use crate::types::{Edge, GraphSnapshot, Node};
use synapse_protocol::path_filters::normalize_path;
use synapse_protocol::{FileKind, Position};
use synapse_spec_parser::ProjectStructure;

/// Seeds durable graphs from a parsed structure or a discovered file list
pub struct GraphBuilder {
    config: LayoutConfig,
}

impl GraphBuilder {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// A positioned, layered node for `path`
    pub fn node(&self, path: &str, kind: FileKind, slot: usize) -> Node {
        let mut node = Node::file(path, kind);
        layers::assign(&mut node, &self.config);
        node.position = self.grid_position(slot);
        node
    }

    /// Insertion-order grid; only the relative order is meaningful
    pub fn grid_position(&self, slot: usize) -> Position {
        let columns = self.config.grid_columns.max(1);
        let col = slot % columns;
        let row = slot / columns;
        self.config.origin.offset(
            col as f64 * self.config.column_width,
            row as f64 * self.config.row_height,
        )
    }

    /// Nodes for every declared file plus edges for declared dependencies
    /// between them. Dependencies naming undeclared files are skipped.
    pub fn from_structure(&self, structure: &ProjectStructure) -> GraphSnapshot {
        let mut graph = GraphSnapshot::new();
        for entry in &structure.files {
            self.push_node(&mut graph, &entry.path, entry.kind);
        }

        for dependency in &structure.dependencies {
            let source = normalize_path(&dependency.source);
            let target = normalize_path(&dependency.target);
            if source == target
                || !graph.contains_node(&source)
                || !graph.contains_node(&target)
                || graph.has_edge(&source, &target, dependency.kind)
            {
                log::debug!(
                    "Skipping declared dependency {} -> {}",
                    dependency.source,
                    dependency.target
                );
                continue;
            }
            graph
                .edges
                .push(Edge::durable(&source, &target, dependency.kind));
        }

        log::debug!(
            "Seeded {} nodes and {} edges from structure",
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    /// Nodes for discovered files, classified by path
    pub fn from_paths<I, S>(&self, paths: I) -> GraphSnapshot
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = GraphSnapshot::new();
        for path in paths {
            let path = path.as_ref();
            self.push_node(&mut graph, path, FileKind::from_path(path));
        }
        graph
    }

    /// Fold a freshly seeded graph into an existing durable one. Existing
    /// nodes keep identity, position and status; new nodes continue the grid.
    pub fn merge(&self, existing: &GraphSnapshot, seeded: &GraphSnapshot) -> GraphSnapshot {
        let mut merged = existing.clone();
        let mut slot = merged.nodes.len();

        for node in &seeded.nodes {
            if merged.contains_node(&node.id) {
                continue;
            }
            let mut node = node.clone();
            node.position = self.grid_position(slot);
            slot += 1;
            merged.nodes.push(node);
        }

        for edge in &seeded.edges {
            if !merged.has_edge(&edge.source, &edge.target, edge.kind) {
                merged.edges.push(edge.clone());
            }
        }

        merged
    }

    fn push_node(&self, graph: &mut GraphSnapshot, path: &str, kind: FileKind) {
        let id = normalize_path(path);
        if id.is_empty() || graph.contains_node(&id) {
            return;
        }
        let slot = graph.nodes.len();
        graph.nodes.push(self.node(&id, kind, slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synapse_spec_parser::{DeclaredDependency, FileEntry};
    use synapse_protocol::RelationKind;

    fn builder() -> GraphBuilder {
        GraphBuilder::new(LayoutConfig::default()).unwrap()
    }

    fn structure() -> ProjectStructure {
        let file = |path: &str| FileEntry {
            path: path.to_string(),
            kind: FileKind::from_path(path),
            description: None,
        };
        ProjectStructure {
            files: vec![file("src/main.py"), file("src/db.py"), file("README.md")],
            dependencies: vec![
                DeclaredDependency {
                    source: "src/main.py".to_string(),
                    target: "src/db.py".to_string(),
                    kind: RelationKind::DataFlow,
                },
                DeclaredDependency {
                    source: "src/main.py".to_string(),
                    target: "src/missing.py".to_string(),
                    kind: RelationKind::Call,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn seeds_nodes_and_declared_edges() {
        let graph = builder().from_structure(&structure());
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["src/main.py", "src/db.py", "README.md"]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].id, "src/main.py->src/db.py#data_flow");
        assert_eq!(graph.nodes[0].layer, Some(0));
        assert_eq!(graph.nodes[1].layer, Some(2));
        assert_eq!(graph.nodes[1].position, Position::new(240.0, 0.0));
    }

    #[test]
    fn merge_keeps_existing_nodes() {
        let builder = builder();
        let mut existing = builder.from_paths(["src/db.py"]);
        existing.nodes[0].position = Position::new(900.0, 900.0);
        existing.nodes[0].pinned = true;

        let merged = builder.merge(&existing, &builder.from_structure(&structure()));
        assert_eq!(merged.nodes.len(), 3);
        assert_eq!(merged.nodes[0].position, Position::new(900.0, 900.0));
        assert_eq!(merged.nodes[1].id, "src/main.py");
        assert_eq!(merged.nodes[1].position, builder.grid_position(1));

        let again = builder.merge(&merged, &builder.from_structure(&structure()));
        assert_eq!(again, merged);
    }
}
