use proptest::prelude::*;
use std::collections::HashSet;
use synapse_graph::{
    apply_rank_layout, derive_edges, merge_volatile, AnalyzerConfig, Edge, FlowConfig,
    FlowExtractor, GraphBuilder, GraphEditor, GraphSnapshot, GraphView, LayoutConfig, Mutation,
    Node, PlacementConfig, StructuralAnalyzer,
};
use synapse_protocol::{FileKind, RelationKind};
use synapse_scanner::ScanSummary;

const KINDS: [RelationKind; 3] = [RelationKind::Dependency, RelationKind::Call, RelationKind::Event];

fn node_id(i: usize) -> String {
    format!("src/mod_{i}.py")
}

/// `n` nodes, durable edges from index pairs (self pairs included on purpose),
/// and references by stem from the second pair list.
fn build_graph(n: usize, edges: &[(usize, usize, usize)], refs: &[(usize, usize)]) -> GraphSnapshot {
    let mut graph = GraphSnapshot::new();
    for i in 0..n {
        let mut node = Node::file(&node_id(i), FileKind::Source);
        node.summary = Some(ScanSummary::default());
        graph.nodes.push(node);
    }
    for &(from, to, kind) in edges {
        let (from, to) = (node_id(from % n), node_id(to % n));
        let kind = KINDS[kind % KINDS.len()];
        if from != to && !graph.has_edge(&from, &to, kind) {
            graph.edges.push(Edge::durable(&from, &to, kind));
        }
    }
    for &(from, to) in refs {
        if let Some(summary) = graph.nodes[from % n].summary.as_mut() {
            summary.references.push(format!("mod_{}", to % n));
        }
    }
    graph
}

fn editor() -> GraphEditor {
    GraphEditor::new(
        GraphBuilder::new(LayoutConfig::default()).unwrap(),
        PlacementConfig::default(),
    )
    .unwrap()
}

#[derive(Debug, Clone)]
enum Step {
    Group(Vec<usize>),
    Delete(usize),
    Ungroup(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        prop::collection::vec(0usize..8, 1..4).prop_map(Step::Group),
        (0usize..8).prop_map(Step::Delete),
        (0usize..4).prop_map(Step::Ungroup),
    ]
}

proptest! {
    #[test]
    fn derivation_is_idempotent_and_duplicate_free(
        n in 2usize..8,
        edges in prop::collection::vec((0usize..8, 0usize..8, 0usize..3), 0..16),
        refs in prop::collection::vec((0usize..8, 0usize..8), 0..24),
    ) {
        let graph = build_graph(n, &edges, &refs);
        let first: HashSet<(String, String)> = derive_edges(&graph)
            .into_iter()
            .map(|e| (e.source, e.target))
            .collect();
        let second: HashSet<(String, String)> = derive_edges(&graph)
            .into_iter()
            .map(|e| (e.source, e.target))
            .collect();
        prop_assert_eq!(&first, &second);

        let mut composite = graph.clone();
        merge_volatile(&mut composite);
        merge_volatile(&mut composite);
        let mut triples = HashSet::new();
        let mut pairs_by_origin: HashSet<(&str, &str, bool)> = HashSet::new();
        for edge in &composite.edges {
            prop_assert!(edge.source != edge.target);
            prop_assert!(triples.insert((&edge.source, &edge.target, edge.kind)));
            pairs_by_origin.insert((edge.source.as_str(), edge.target.as_str(), edge.volatile));
        }
        for &(source, target, volatile) in &pairs_by_origin {
            if volatile {
                prop_assert!(!pairs_by_origin.contains(&(source, target, false)));
            }
        }
    }

    #[test]
    fn traversals_terminate_on_cyclic_graphs(
        n in 1usize..10,
        edges in prop::collection::vec((0usize..10, 0usize..10, 0usize..3), 0..30),
        depth in 1usize..16,
    ) {
        let mut graph = build_graph(n, &edges, &[]);
        let view = GraphView::new(&graph);
        let roots = view.roots(&["mod_0".to_string()]);
        let reachable = view.reachable(&roots);
        prop_assert!(reachable.len() <= n);
        let unique: HashSet<_> = reachable.iter().collect();
        prop_assert_eq!(unique.len(), reachable.len());

        let layout = LayoutConfig { max_rank_depth: depth, ..Default::default() };
        apply_rank_layout(&mut graph, &layout);
        for node in &graph.nodes {
            prop_assert!(node.position.x <= depth as f64 * layout.column_width);
        }

        let flow = FlowExtractor::new(FlowConfig::default()).extract(&graph).flow();
        prop_assert!(flow.body_len() <= n);
        for step in &flow.steps[..flow.end_id()] {
            prop_assert!(step.next.is_some());
        }

        let report = StructuralAnalyzer::new(AnalyzerConfig::default()).analyze(&graph);
        prop_assert!(report.score <= 100);
    }

    #[test]
    fn clusters_never_end_up_empty(steps in prop::collection::vec(step(), 1..20)) {
        let editor = editor();
        let mut graph = GraphBuilder::new(LayoutConfig::default())
            .unwrap()
            .from_paths((0..8).map(node_id));

        for step in steps {
            let mutation = match step {
                Step::Group(members) => Mutation::Group {
                    cluster_id: Some(format!("c{}", members[0] % 4)),
                    label: "group".to_string(),
                    members: members.into_iter().map(node_id).collect(),
                },
                Step::Delete(i) => Mutation::DeleteNode { id: node_id(i) },
                Step::Ungroup(i) => Mutation::Ungroup { cluster_id: format!("c{i}") },
            };
            // Missing nodes or clusters are rejected without changes
            if let Ok(next) = editor.apply(&graph, &mutation) {
                graph = next;
            }

            let mut claimed = HashSet::new();
            for cluster in &graph.clusters {
                prop_assert!(!cluster.members.is_empty());
                for member in &cluster.members {
                    prop_assert!(graph.contains_node(member));
                    prop_assert!(claimed.insert(member.clone()));
                }
            }
        }
    }
}
