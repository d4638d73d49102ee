//! Control-flow scanner: one file's text in, a branch-aware [`Flow`] out.
//!
//! Extraction runs in three passes: [`lexer`] splits text into statements and
//! block delimiters, [`blocks`] recovers conditionals, loops, exception
//! handlers and switches from keywords, and [`lower`] links the result into
//! START/END-bracketed steps.

mod blocks;
mod lexer;
mod lower;

use crate::config::ScannerConfig;
use crate::error::Result;
use crate::language::Language;
use crate::types::Flow;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FlowScanner {
    config: ScannerConfig,
}

impl FlowScanner {
    pub fn new(config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Extract the flow of `text`; `name` picks the block style by extension.
    ///
    /// Never fails: binary, oversized, structureless or too deeply nested
    /// input yields [`Flow::trivial`].
    pub fn scan_str(&self, name: &str, text: &str) -> Flow {
        if text.len() as u64 > self.config.max_file_bytes || text.contains('\0') {
            log::debug!("No flow for {name}: binary or oversized");
            return Flow::trivial(name);
        }

        let language = Language::from_path(name);
        let tokens = lexer::lex(text, language);
        let Some(parsed) = blocks::parse(&tokens, self.config.max_nesting_depth) else {
            log::debug!(
                "No flow for {name}: nesting deeper than {}",
                self.config.max_nesting_depth
            );
            return Flow::trivial(name);
        };
        if parsed.is_empty() {
            return Flow::trivial(name);
        }

        let steps = lower::Lowering::new(self.config.max_flow_steps, self.config.label_max_chars)
            .finish(&parsed);
        Flow {
            name: name.to_string(),
            steps,
        }
    }

    /// Read `path` and extract its flow; unreadable files yield a trivial flow
    pub fn scan_file(&self, path: impl AsRef<Path>) -> Flow {
        let path = path.as_ref();
        let name = path.to_string_lossy();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::debug!("Cannot read {name}: {err}");
                return Flow::trivial(name);
            }
        };
        match std::str::from_utf8(&bytes) {
            Ok(text) => self.scan_str(&name, text),
            Err(_) => {
                log::debug!("No flow for {name}: not UTF-8");
                Flow::trivial(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepKind;
    use pretty_assertions::assert_eq;

    fn scanner() -> FlowScanner {
        FlowScanner::new(ScannerConfig::default()).unwrap()
    }

    fn kinds(flow: &Flow) -> Vec<StepKind> {
        flow.steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn steps_are_indexed_and_bracketed() {
        let flow = scanner().scan_str("a.js", "a();\nif (x) { b(); }\nc();");
        for (idx, step) in flow.steps.iter().enumerate() {
            assert_eq!(step.id, idx);
        }
        assert_eq!(flow.steps[0].kind, StepKind::Start);
        assert_eq!(flow.steps[flow.end_id()].kind, StepKind::End);
        for step in &flow.steps[..flow.end_id()] {
            assert!(step.next.is_some(), "step {} has no successor", step.id);
            if step.kind != StepKind::Decision {
                assert!(step.alt.is_none());
            }
        }
    }

    #[test]
    fn loops_and_terminals() {
        let flow = scanner().scan_str(
            "a.py",
            "for x in items:\n    handle(x)\nreturn done\n",
        );
        assert_eq!(
            kinds(&flow),
            vec![
                StepKind::Start,
                StepKind::Loop,
                StepKind::Process,
                StepKind::Process,
                StepKind::End
            ]
        );
        let ret = flow.find("return done").unwrap();
        assert_eq!(ret.next, Some(flow.end_id()));
    }

    #[test]
    fn early_return_skips_rest_of_branch() {
        let flow = scanner().scan_str(
            "a.go",
            "if err != nil {\n  return err\n}\nrun()\n",
        );
        let cond = flow.find("if err").unwrap();
        let ret = flow.find("return err").unwrap();
        let run = flow.find("run()").unwrap();
        assert_eq!(cond.next, Some(ret.id));
        assert_eq!(cond.alt, Some(run.id));
        assert_eq!(ret.next, Some(flow.end_id()));
        assert_eq!(run.next, Some(flow.end_id()));
    }

    #[test]
    fn step_cap_is_enforced() {
        let scanner = FlowScanner::new(ScannerConfig {
            max_flow_steps: 3,
            ..Default::default()
        })
        .unwrap();
        let flow = scanner.scan_str("a.js", "a();\nb();\nc();\nd();\ne();");
        assert_eq!(flow.body_len(), 3);
        assert_eq!(flow.steps[3].next, Some(flow.end_id()));
    }

    #[test]
    fn long_labels_are_truncated() {
        let scanner = FlowScanner::new(ScannerConfig {
            label_max_chars: 10,
            ..Default::default()
        })
        .unwrap();
        let flow = scanner.scan_str("a.js", "someVeryLongFunctionName(argument);");
        assert_eq!(flow.steps[1].label, "someVer...");
    }

    #[test]
    fn empty_and_binary_input_is_trivial() {
        assert_eq!(scanner().scan_str("a.py", "").body_len(), 0);
        assert_eq!(scanner().scan_str("a.py", "# only a comment\n").body_len(), 0);
        assert_eq!(scanner().scan_str("a.py", "x = 1\0").body_len(), 0);
    }
}
