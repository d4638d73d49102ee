use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about one refresh (scan + assembly)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshStats {
    /// Files read and scanned
    pub files_scanned: usize,

    /// Nodes without a readable file (synthetic, missing, or never started
    /// because the refresh was cancelled)
    pub files_skipped: usize,

    /// Declared symbols across all summaries
    pub symbols: usize,

    /// Raw references across all summaries
    pub references: usize,

    /// Edges derived from references
    pub volatile_edges: usize,

    /// Durable edges whose endpoint no longer exists
    pub dangling_dropped: usize,

    /// Scanned files per language
    pub languages: BTreeMap<String, usize>,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Cancellation was requested before every scan started
    pub cancelled: bool,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str, symbols: usize, references: usize) {
        self.files_scanned += 1;
        self.symbols += symbols;
        self.references += references;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self) {
        self.files_skipped += 1;
    }
}
