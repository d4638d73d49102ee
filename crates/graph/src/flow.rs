use crate::config::FlowConfig;
use crate::graph::GraphView;
use crate::types::{GraphSnapshot, Node};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use synapse_protocol::Position;
use synapse_scanner::{Flow, FlowStep, StepKind};

/// A flow step placed on the canvas and tied back to its graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowViewStep {
    #[serde(flatten)]
    pub step: FlowStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub position: Position,
}

/// Architecture-level execution flow of the whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowView {
    pub name: String,
    pub steps: Vec<FlowViewStep>,
}

impl FlowView {
    /// The bare step sequence
    pub fn flow(&self) -> Flow {
        Flow {
            name: self.name.clone(),
            steps: self.steps.iter().map(|s| s.step.clone()).collect(),
        }
    }

    pub fn step_for(&self, node_id: &str) -> Option<&FlowViewStep> {
        self.steps
            .iter()
            .find(|step| step.node.as_deref() == Some(node_id))
    }
}

/// Builds the single coherent flow over the composite graph.
///
/// ```text
/// roots (entry names) ──BFS──> reachable set ──sort (layer, priority, order)──>
///   START → n₁ → … → nₖ → END   successors mapped into sorted index space
/// ```
pub struct FlowExtractor {
    config: FlowConfig,
}

impl FlowExtractor {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, graph: &GraphSnapshot) -> FlowView {
        let view = GraphView::new(graph);
        let roots = view.roots(&self.config.entry_names);
        let mut reachable = view.reachable(&roots);

        // Stable total order; NodeIndex follows snapshot discovery order
        reachable.sort_by_key(|&idx| {
            let node = view.node(idx);
            (
                node.layer.unwrap_or(u8::MAX),
                std::cmp::Reverse(node.priority.unwrap_or(0)),
                idx.index(),
            )
        });

        let end_id = reachable.len() + 1;
        let position_of: HashMap<NodeIndex, usize> = reachable
            .iter()
            .enumerate()
            .map(|(i, &idx)| (idx, i + 1))
            .collect();

        let mut steps = Vec::with_capacity(reachable.len() + 2);
        steps.push(FlowViewStep {
            // With nothing reachable, step 1 is END
            step: terminal(0, StepKind::Start, "START", Some(1)),
            node: None,
            position: self.position(0, 0),
        });

        for (i, &idx) in reachable.iter().enumerate() {
            let node = view.node(idx);
            let id = i + 1;

            let mut targets: Vec<usize> = view
                .successors(idx)
                .into_iter()
                .filter_map(|succ| position_of.get(&succ).copied())
                .filter(|&target| target != id)
                .collect();
            targets.sort_unstable();
            targets.dedup();

            let decision = self.is_decision(node);
            let next = targets.first().copied().unwrap_or(end_id);
            let alt = if decision { targets.get(1).copied() } else { None };

            steps.push(FlowViewStep {
                step: FlowStep {
                    id,
                    kind: if decision {
                        StepKind::Decision
                    } else {
                        StepKind::Process
                    },
                    label: node.label.clone(),
                    line: None,
                    next: Some(next),
                    alt,
                },
                node: Some(node.id.clone()),
                position: self.position(node.layer.unwrap_or(0) as usize, id),
            });
        }

        steps.push(FlowViewStep {
            step: terminal(end_id, StepKind::End, "END", None),
            node: None,
            position: self.position(0, end_id),
        });

        log::debug!(
            "Flow view: {} roots, {} reachable of {} nodes",
            roots.len(),
            reachable.len(),
            view.node_count()
        );

        FlowView {
            name: "architecture".to_string(),
            steps,
        }
    }

    /// Explicit step type wins; otherwise a decision keyword in the stem
    fn is_decision(&self, node: &Node) -> bool {
        match node.step_type {
            Some(kind) => kind == StepKind::Decision,
            None => {
                let stem = node.stem();
                self.config
                    .decision_keywords
                    .iter()
                    .any(|keyword| stem.contains(&keyword.to_lowercase()))
            }
        }
    }

    fn position(&self, column: usize, row: usize) -> Position {
        Position::new(
            column as f64 * self.config.column_width,
            row as f64 * self.config.row_height,
        )
    }
}

fn terminal(id: usize, kind: StepKind, label: &str, next: Option<usize>) -> FlowStep {
    FlowStep {
        id,
        kind,
        label: label.to_string(),
        line: None,
        next,
        alt: None,
    }
}
