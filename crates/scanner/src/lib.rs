//! # Synapse Scanner
//!
//! Heuristic, per-file source scanning for the architecture graph.
//!
//! Two independent scanners live here:
//!
//! - [`SymbolScanner`]: declared symbols (classes, functions, types, modules)
//!   and raw outgoing references (imports, includes, `use` paths).
//! - [`FlowScanner`]: an ordered, branch-aware [`Flow`] of one file's control
//!   flow (process / decision / loop steps bracketed by START and END).
//!
//! Neither scanner executes or fully parses the source. Both are best-effort:
//! unreadable, binary, oversized or unsupported input degrades to an empty
//! summary or a trivial START → END flow, never an error.
//!
//! ## Architecture
//!
//! ```text
//! path + text
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> SymbolScanner
//!     │    └─> StrategyRegistry → ExtractionStrategy (regex per language)
//!     │         └─> ScanSummary { symbols, references }
//!     │
//!     └──> FlowScanner
//!          ├─> lexer: statements + block open/close (braces or indentation)
//!          ├─> blocks: if / loop / try / switch recovery
//!          └─> lower: linked FlowSteps (next, alt)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use synapse_scanner::{FlowScanner, ScannerConfig, SymbolScanner};
//!
//! let symbols = SymbolScanner::new(ScannerConfig::default()).unwrap();
//! let summary = symbols.scan_str("login.py", "import board\nclass AuthProvider:\n    pass\n");
//! assert_eq!(summary.references, vec!["board".to_string()]);
//!
//! let flows = FlowScanner::new(ScannerConfig::default()).unwrap();
//! let flow = flows.scan_str("demo.js", "if (x) { A() } else { B() }\nC()");
//! let decision = flow.find("if (x)").unwrap();
//! assert!(decision.alt.is_some());
//! ```

mod config;
mod error;
mod flow;
mod language;
mod strategy;
mod symbols;
mod types;

pub use config::{ScannerConfig, MAX_NESTING_DEPTH};
pub use error::{Result, ScannerError};
pub use flow::FlowScanner;
pub use language::{BlockStyle, Language};
pub use strategy::{
    normalize_reference, ExtractionStrategy, PatternStrategy, ReferenceSplit, StrategyRegistry,
};
pub use symbols::SymbolScanner;
pub use types::{Flow, FlowStep, ScanSummary, StepKind, Symbol, SymbolKind};
