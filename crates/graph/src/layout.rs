use crate::config::LayoutConfig;
use crate::graph::GraphView;
use crate::types::GraphSnapshot;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use synapse_protocol::Position;

/// Longest-path ranks by bounded relaxation.
///
/// Each pass pushes every edge target to at least `rank(source) + 1`. At most
/// `max_depth` passes run and no rank exceeds `max_depth`, so a cycle stops
/// climbing at the bound and its nodes keep the last computed rank.
pub fn compute_ranks(view: &GraphView<'_>, max_depth: usize) -> HashMap<NodeIndex, usize> {
    let mut ranks: HashMap<NodeIndex, usize> = view.nodes().map(|(idx, _)| (idx, 0)).collect();
    let edges: Vec<(NodeIndex, NodeIndex)> = view
        .nodes()
        .flat_map(|(idx, _)| view.successors(idx).into_iter().map(move |to| (idx, to)))
        .collect();

    let mut settled = false;
    for _ in 0..max_depth {
        let mut changed = false;
        for &(from, to) in &edges {
            let candidate = (ranks[&from] + 1).min(max_depth);
            if ranks[&to] < candidate {
                ranks.insert(to, candidate);
                changed = true;
            }
        }
        if !changed {
            settled = true;
            break;
        }
    }
    if !settled {
        log::debug!("Rank propagation stopped at depth bound {max_depth}");
    }
    ranks
}

/// Rank layout for the general graph view. Columns are ranks; within a column
/// nodes are ordered by layer, then priority (higher first), then discovery
/// order. Pinned nodes are left where they are. Returns how many moved.
pub fn apply_rank_layout(graph: &mut GraphSnapshot, config: &LayoutConfig) -> usize {
    let placements: Vec<(usize, Position)> = {
        let view = GraphView::new(graph);
        let ranks = compute_ranks(&view, config.max_rank_depth);

        let mut columns: HashMap<usize, Vec<(u8, i32, usize, NodeIndex)>> = HashMap::new();
        for (idx, node) in view.nodes() {
            let order = idx.index();
            columns.entry(ranks[&idx]).or_default().push((
                node.layer.unwrap_or(config.default_layer),
                -node.priority.unwrap_or(config.default_priority),
                order,
                idx,
            ));
        }

        let mut placements = Vec::new();
        for (rank, mut column) in columns {
            column.sort_unstable();
            for (row, &(_, _, _, idx)) in column.iter().enumerate() {
                let position = config.origin.offset(
                    rank as f64 * config.column_width,
                    row as f64 * config.row_height,
                );
                placements.push((view.slot(idx), position));
            }
        }
        placements
    };

    let mut moved = 0;
    for (slot, position) in placements {
        let node = &mut graph.nodes[slot];
        if node.pinned || node.position == position {
            continue;
        }
        node.position = position;
        moved += 1;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node};
    use pretty_assertions::assert_eq;
    use synapse_protocol::{FileKind, RelationKind};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> GraphSnapshot {
        let mut graph = GraphSnapshot::new();
        for id in ids {
            graph.nodes.push(Node::file(id, FileKind::Source));
        }
        for (from, to) in edges {
            graph.edges.push(Edge::durable(from, to, RelationKind::Call));
        }
        graph
    }

    fn rank_of(graph: &GraphSnapshot, id: &str, depth: usize) -> usize {
        let view = GraphView::new(graph);
        let ranks = compute_ranks(&view, depth);
        ranks[&view.index_of(id).unwrap()]
    }

    #[test]
    fn ranks_follow_longest_path() {
        let graph = graph(
            &["a.py", "b.py", "c.py"],
            &[("a.py", "b.py"), ("b.py", "c.py"), ("a.py", "c.py")],
        );
        assert_eq!(rank_of(&graph, "a.py", 64), 0);
        assert_eq!(rank_of(&graph, "b.py", 64), 1);
        assert_eq!(rank_of(&graph, "c.py", 64), 2);
    }

    #[test]
    fn cycles_stop_at_the_depth_bound() {
        let graph = graph(&["a.py", "b.py"], &[("a.py", "b.py"), ("b.py", "a.py")]);
        assert!(rank_of(&graph, "a.py", 8) <= 8);
        assert!(rank_of(&graph, "b.py", 8) <= 8);
    }

    #[test]
    fn layout_respects_pins_and_is_stable() {
        let mut graph = graph(&["main.py", "db.py"], &[("main.py", "db.py")]);
        graph.nodes[1].pinned = true;
        graph.nodes[1].position = Position::new(5.0, 5.0);

        let config = LayoutConfig::default();
        assert_eq!(apply_rank_layout(&mut graph, &config), 0);
        assert_eq!(graph.nodes[0].position, Position::new(0.0, 0.0));
        assert_eq!(graph.nodes[1].position, Position::new(5.0, 5.0));

        graph.nodes[0].position = Position::new(99.0, 0.0);
        assert_eq!(apply_rank_layout(&mut graph, &config), 1);
        assert_eq!(apply_rank_layout(&mut graph, &config), 0);
    }
}
