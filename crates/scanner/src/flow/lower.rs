//! Lowers a block tree to linked [`FlowStep`]s.

use super::blocks::{Block, Case, Stmt};
use crate::types::{FlowStep, StepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Next,
    Alt,
}

/// A lowered region: where control enters it, and the dangling pointers that
/// leave it.
#[derive(Debug, Default)]
struct Fragment {
    entry: Option<usize>,
    exits: Vec<(usize, Slot)>,
}

pub(crate) struct Lowering {
    steps: Vec<FlowStep>,
    max_steps: usize,
    label_max_chars: usize,
    truncated: bool,
}

impl Lowering {
    pub(crate) fn new(max_steps: usize, label_max_chars: usize) -> Self {
        let start = FlowStep {
            id: 0,
            kind: StepKind::Start,
            label: "START".to_string(),
            line: None,
            next: None,
            alt: None,
        };
        Self {
            steps: vec![start],
            max_steps,
            label_max_chars,
            truncated: false,
        }
    }

    /// Lower `blocks` and close the flow with END.
    pub(crate) fn finish(mut self, blocks: &[Block]) -> Vec<FlowStep> {
        let body = self.sequence(blocks, vec![(0, Slot::Next)]);
        if self.truncated {
            log::debug!("Flow truncated at {} steps", self.max_steps);
        }
        let end = self.steps.len();
        self.steps.push(FlowStep {
            id: end,
            kind: StepKind::End,
            label: "END".to_string(),
            line: None,
            next: None,
            alt: None,
        });
        self.patch(&body.exits, end);
        for step in &mut self.steps[..end] {
            if step.next.is_none() {
                step.next = Some(end);
            }
        }
        self.steps
    }

    fn push(&mut self, kind: StepKind, stmt: &Stmt) -> Option<usize> {
        if self.steps.len() > self.max_steps {
            self.truncated = true;
            return None;
        }
        let id = self.steps.len();
        self.steps.push(FlowStep {
            id,
            kind,
            label: label(&stmt.text, self.label_max_chars),
            line: Some(stmt.line),
            next: None,
            alt: None,
        });
        Some(id)
    }

    fn patch(&mut self, exits: &[(usize, Slot)], target: usize) {
        for &(id, slot) in exits {
            let step = &mut self.steps[id];
            match slot {
                Slot::Next if step.next.is_none() => step.next = Some(target),
                Slot::Alt if step.alt.is_none() => step.alt = Some(target),
                _ => {}
            }
        }
    }

    /// Lower `blocks` in order; `incoming` are the pointers that flow into the
    /// first emitted step.
    fn sequence(&mut self, blocks: &[Block], incoming: Vec<(usize, Slot)>) -> Fragment {
        let mut entry = None;
        let mut exits = incoming;
        let mut first = true;

        for block in blocks {
            let fragment = self.block(block);
            match fragment.entry {
                Some(target) => {
                    self.patch(&exits, target);
                    if first {
                        entry = Some(target);
                    }
                    first = false;
                    exits = fragment.exits;
                }
                None if self.truncated => break,
                None => exits.extend(fragment.exits),
            }
        }

        Fragment { entry, exits }
    }

    fn block(&mut self, block: &Block) -> Fragment {
        match block {
            Block::Simple { stmt, terminal } => {
                let Some(id) = self.push(StepKind::Process, stmt) else {
                    return Fragment::default();
                };
                let exits = if *terminal {
                    Vec::new()
                } else {
                    vec![(id, Slot::Next)]
                };
                Fragment {
                    entry: Some(id),
                    exits,
                }
            }
            Block::Group { header, body } => {
                let Some(id) = self.push(StepKind::Process, header) else {
                    return Fragment::default();
                };
                let inner = self.sequence(body, vec![(id, Slot::Next)]);
                Fragment {
                    entry: Some(id),
                    exits: inner.exits,
                }
            }
            Block::If {
                cond,
                then,
                otherwise,
            } => self.branch(cond, then, otherwise.as_deref()),
            Block::Loop { header, body } => {
                let Some(id) = self.push(StepKind::Loop, header) else {
                    return Fragment::default();
                };
                let inner = self.sequence(body, vec![(id, Slot::Next)]);
                Fragment {
                    entry: Some(id),
                    exits: inner.exits,
                }
            }
            Block::Try {
                header,
                body,
                handlers,
                finally,
            } => self.try_block(header, body, handlers, finally.as_deref()),
            Block::Switch {
                header,
                preamble,
                cases,
            } => self.switch(header, preamble, cases),
        }
    }

    fn branch(&mut self, cond: &Stmt, then: &[Block], otherwise: Option<&[Block]>) -> Fragment {
        let Some(id) = self.push(StepKind::Decision, cond) else {
            return Fragment::default();
        };
        let then = self.sequence(then, vec![(id, Slot::Next)]);
        let mut exits = then.exits;

        // Without an else branch the false path falls through to whatever
        // follows the conditional.
        match otherwise {
            Some(otherwise) => {
                let alt = self.sequence(otherwise, vec![(id, Slot::Alt)]);
                exits.extend(alt.exits);
            }
            None => exits.push((id, Slot::Alt)),
        }

        Fragment {
            entry: Some(id),
            exits,
        }
    }

    fn try_block(
        &mut self,
        header: &Stmt,
        body: &[Block],
        handlers: &[Case],
        finally: Option<&[Block]>,
    ) -> Fragment {
        let Some(id) = self.push(StepKind::Decision, header) else {
            return Fragment::default();
        };
        let body = self.sequence(body, vec![(id, Slot::Next)]);
        let mut exits = body.exits;

        // Handlers form a chain hanging off the try's alternate branch.
        let mut pending = if handlers.is_empty() {
            Vec::new()
        } else {
            vec![(id, Slot::Alt)]
        };
        for (idx, handler) in handlers.iter().enumerate() {
            let last = idx + 1 == handlers.len();
            let kind = if last {
                StepKind::Process
            } else {
                StepKind::Decision
            };
            let Some(hid) = self.push(kind, &handler.header) else {
                break;
            };
            self.patch(&pending, hid);
            let inner = self.sequence(&handler.body, vec![(hid, Slot::Next)]);
            exits.extend(inner.exits);
            pending = if last { Vec::new() } else { vec![(hid, Slot::Alt)] };
        }
        match finally {
            Some(finally) => {
                let inner = self.sequence(finally, exits);
                Fragment {
                    entry: Some(id),
                    exits: inner.exits,
                }
            }
            None => Fragment {
                entry: Some(id),
                exits,
            },
        }
    }

    fn switch(&mut self, header: &Stmt, preamble: &[Block], cases: &[Case]) -> Fragment {
        let Some(id) = self.push(StepKind::Process, header) else {
            return Fragment::default();
        };
        let pre = self.sequence(preamble, vec![(id, Slot::Next)]);
        let mut pending = pre.exits;
        let mut exits = Vec::new();

        // A trailing catch-all arm always runs; any other last arm keeps an
        // alternate that leaves the switch when nothing matched.
        for (idx, case) in cases.iter().enumerate() {
            let catch_all = idx + 1 == cases.len() && case.default;
            let kind = if catch_all {
                StepKind::Process
            } else {
                StepKind::Decision
            };
            let Some(cid) = self.push(kind, &case.header) else {
                break;
            };
            self.patch(&pending, cid);
            let body = self.sequence(&case.body, vec![(cid, Slot::Next)]);
            exits.extend(body.exits);
            pending = if catch_all {
                Vec::new()
            } else {
                vec![(cid, Slot::Alt)]
            };
        }
        exits.extend(pending);

        Fragment {
            entry: Some(id),
            exits,
        }
    }
}

/// Collapse whitespace and cap at `max_chars` characters
pub(crate) fn label(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
