use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Category of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Function,
    Type,
    Module,
}

/// A declaration found in a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-indexed line of the declaration
    pub line: usize,
}

/// Declared symbols and outgoing references of one file, in source order.
///
/// References are raw target strings (`board`, `graph::types`, `lib/util.js`);
/// mapping them to graph nodes happens in the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl ScanSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.references.is_empty()
    }
}

/// Kind of a flow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Start,
    End,
    Process,
    Decision,
    Loop,
}

impl StepKind {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, StepKind::Start | StepKind::End)
    }
}

/// One element of a [`Flow`]. Every non-END step has a `next`; only decisions
/// may carry `alt` (the false / else / exception branch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: usize,
    pub kind: StepKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<usize>,
}

/// Ordered, branch-aware control flow of one file.
///
/// `steps[0]` is START, the last step is END, and `steps[i].id == i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub steps: Vec<FlowStep>,
}

impl Flow {
    /// START → END with nothing in between
    pub fn trivial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: vec![
                FlowStep {
                    id: 0,
                    kind: StepKind::Start,
                    label: "START".to_string(),
                    line: None,
                    next: Some(1),
                    alt: None,
                },
                FlowStep {
                    id: 1,
                    kind: StepKind::End,
                    label: "END".to_string(),
                    line: None,
                    next: None,
                    alt: None,
                },
            ],
        }
    }

    #[must_use]
    pub fn end_id(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    #[must_use]
    pub fn step(&self, id: usize) -> Option<&FlowStep> {
        self.steps.get(id)
    }

    /// First step whose label contains `needle`
    #[must_use]
    pub fn find(&self, needle: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|step| step.label.contains(needle))
    }

    /// Steps other than START and END
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.steps.len().saturating_sub(2)
    }

    pub fn successors(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.step(id)
            .into_iter()
            .flat_map(|step| step.next.into_iter().chain(step.alt))
    }

    /// Whether `to` is reachable from `from` following next/alt pointers.
    #[must_use]
    pub fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            queue.extend(self.successors(current));
        }
        false
    }
}
