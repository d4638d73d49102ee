use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use synapse_engine::{EngineError, ProjectEngine, SeedSource, SynapseConfig};
use synapse_graph::{FindingKind, GraphError, Mutation, NodeStatus};
use synapse_protocol::{Position, RelationKind};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

const DOCUMENT: &str = "\
# Login service

```
📄 example/fake.py
```

- 📄 src/main.py
- 📄 src/auth_router.py
- 📄 src/handlers.py
- 📄 src/storage.py
- 📄 src/planned.py
- 📄 README.md

- src/main.py -> src/auth_router.py (calls)
";

fn documented_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "spec.md", DOCUMENT);
    write(root, "src/main.py", "def main():\n    pass\n");
    write(root, "src/auth_router.py", "import handlers, storage\n");
    write(root, "src/handlers.py", "from storage import save\n");
    write(root, "src/storage.py", "def save(x):\n    return x\n");
    write(root, "README.md", "# Login service\n");
    dir
}

fn engine(root: &Path) -> ProjectEngine {
    let mut config = SynapseConfig::default();
    config.project.scan_concurrency = Some(2);
    ProjectEngine::with_config(root, config).unwrap()
}

fn stored_text(root: &Path) -> String {
    fs::read_to_string(root.join(".synapse/graph.json")).unwrap()
}

#[tokio::test]
async fn seed_from_document_then_refresh() {
    let dir = documented_project();
    let engine = engine(dir.path());

    let report = engine.seed().await.unwrap();
    assert_eq!(report.source, SeedSource::Specification);
    assert_eq!(report.document.as_deref(), Some("spec.md"));
    assert_eq!(report.nodes_added, 5);
    assert_eq!(report.edges_added, 1);
    assert_eq!(report.proposed, vec!["src/planned.py"]);
    assert!(report.written);

    let (composite, stats) = engine.refresh().await.unwrap();
    assert_eq!(stats.files_scanned, 5);
    assert_eq!(stats.volatile_edges, 3);
    assert!(!stats.cancelled);
    assert_eq!(stats.languages.get("python"), Some(&4));
    assert_eq!(
        composite.graph.node("src/planned.py").unwrap().status,
        NodeStatus::Proposed
    );
    assert!(composite.graph.node("example/fake.py").is_none());

    // reads never write derived parts back
    let stored = stored_text(dir.path());
    assert!(!stored.contains("planned.py"));
    assert!(!stored.contains("auto:"));

    let flow = engine.flow_view().await.unwrap();
    let order: Vec<&str> = flow
        .steps
        .iter()
        .filter_map(|step| step.node.as_deref())
        .collect();
    assert_eq!(
        order,
        vec![
            "src/main.py",
            "src/auth_router.py",
            "src/handlers.py",
            "src/storage.py"
        ]
    );

    let report = engine.analyze().await.unwrap();
    assert_eq!(report.of_kind(FindingKind::Cycle).count(), 0);
    assert!(report.score <= 100);
}

#[tokio::test]
async fn discovery_is_used_without_a_document() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/app.py", "import db\n");
    write(dir.path(), "src/db.py", "def query():\n    pass\n");
    write(dir.path(), "node_modules/pkg/index.js", "module.exports = 1;\n");

    let engine = engine(dir.path());
    let first = engine.seed().await.unwrap();
    assert_eq!(first.source, SeedSource::Discovery);
    assert_eq!(first.document, None);
    assert_eq!(first.nodes_added, 2);

    let second = engine.seed().await.unwrap();
    assert_eq!(second.nodes_added, 0);
    assert!(!second.written);

    let composite = engine.state().await.unwrap();
    assert_eq!(composite.graph.nodes.len(), 2);
    assert_eq!(composite.graph.edges[0].id, "auto:src/app.py->src/db.py");
}

#[tokio::test]
async fn state_without_a_store_is_an_unsaved_seed() {
    let dir = documented_project();
    let engine = engine(dir.path());

    let composite = engine.state().await.unwrap();
    assert!(composite.graph.node("src/main.py").is_some());
    assert!(!dir.path().join(".synapse/graph.json").exists());
}

#[tokio::test]
async fn mutations_are_normalized_and_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/app.py", "x = 1\n");
    write(dir.path(), "src/db.py", "y = 2\n");
    let engine = engine(dir.path());
    engine.seed().await.unwrap();

    let graph = engine
        .apply(&Mutation::CreateEdge {
            source: "src/app.py".to_string(),
            target: "src/db.py".to_string(),
            kind: RelationKind::Call,
        })
        .await
        .unwrap();
    assert_eq!(graph.edges.len(), 1);

    let text = stored_text(dir.path());
    assert!(text.contains("\"kind\": \"call\""));
    assert!(!text.contains("\"approval\""));
    assert!(!text.contains("\"weight\""));
    assert!(!text.contains("\"volatile\""));
    assert!(text.ends_with('\n'));

    let err = engine
        .apply(&Mutation::DeleteNode {
            id: "src/missing.py".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::GraphError(GraphError::NodeNotFound(_))
    ));
    assert_eq!(stored_text(dir.path()), text);

    engine
        .apply(&Mutation::MoveNode {
            id: "src/db.py".to_string(),
            position: Position { x: 900.0, y: 40.0 },
        })
        .await
        .unwrap();
    let composite = engine.state().await.unwrap();
    let moved = composite.graph.node("src/db.py").unwrap();
    assert!(moved.pinned);
    assert_eq!(moved.position, Position { x: 900.0, y: 40.0 });
}

#[tokio::test]
async fn declared_files_can_be_promoted() {
    let dir = documented_project();
    let engine = engine(dir.path());
    engine.seed().await.unwrap();

    let graph = engine
        .apply(&Mutation::PromoteNode {
            id: "src/planned.py".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        graph.node("src/planned.py").unwrap().status,
        NodeStatus::Active
    );
    assert!(stored_text(dir.path()).contains("src/planned.py"));

    let composite = engine.state().await.unwrap();
    assert_eq!(
        composite.graph.node("src/planned.py").unwrap().status,
        NodeStatus::Active
    );
}

#[tokio::test]
async fn cancelled_refresh_starts_no_scans() {
    let dir = documented_project();
    let engine = engine(dir.path());
    engine.seed().await.unwrap();

    engine.cancel();
    let (_, stats) = engine.refresh().await.unwrap();
    assert!(stats.cancelled);
    assert_eq!(stats.files_scanned, 0);
    assert_eq!(stats.files_skipped, 5);
    assert_eq!(stats.volatile_edges, 0);

    let (_, stats) = engine.refresh().await.unwrap();
    assert!(!stats.cancelled);
    assert_eq!(stats.files_scanned, 5);
}

#[tokio::test]
async fn single_file_operations_degrade_gracefully() {
    let dir = documented_project();
    let engine = engine(dir.path());

    let summary = engine.scan_file("src/auth_router.py");
    assert_eq!(summary.references, vec!["handlers", "storage"]);
    assert!(engine.scan_file("src/nope.py").is_empty());

    let flow = engine.flow_for_file("src/nope.py").await;
    assert_eq!(flow.name, "src/nope.py");
    assert_eq!(flow.body_len(), 0);

    let structure = engine.parse_spec(dir.path().join("spec.md"));
    assert_eq!(structure.files.len(), 6);
}
