//! # Synapse Spec Parser
//!
//! Extracts the intended project layout (folders, files, declared
//! dependencies and an optional scan scope) from a free-form specification
//! document.
//!
//! Only lines anchored by a marker icon/keyword, a list bullet or a tree
//! glyph are read as entries, and only after everything non-architectural is
//! removed:
//!
//! ```text
//! document
//!     │
//!     ├──> strip fenced code blocks (``` and ~~~)
//!     ├──> strip <!-- HTML comments -->
//!     ├──> neutralize `inline code` spans
//!     │
//!     └──> per line: scope? dependency? folder? file?
//!          └─> ProjectStructure
//! ```
//!
//! An empty result is not an error: callers fall back to directory discovery.
//!
//! ## Example
//!
//! ```rust
//! use synapse_spec_parser::{ParserRules, SpecParser};
//!
//! let parser = SpecParser::new(ParserRules::default()).unwrap();
//! let structure = parser.parse("📄 src/login.py — Auth\n- src/board.py\n");
//! assert_eq!(structure.paths().collect::<Vec<_>>(), ["src/login.py", "src/board.py"]);
//! ```

mod error;
mod parser;
pub mod preprocess;
mod rules;
mod structure;

pub use error::{Result, SpecParserError};
pub use parser::SpecParser;
pub use rules::ParserRules;
pub use structure::{DeclaredDependency, FileEntry, ProjectStructure};
