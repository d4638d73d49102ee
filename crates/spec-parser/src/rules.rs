use crate::error::{Result, SpecParserError};
use serde::{Deserialize, Serialize};

/// Marker conventions and validation thresholds for specification documents.
///
/// Every field has a default; a rules section in the project configuration
/// only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserRules {
    /// Leading icons/keywords that mark a folder entry
    pub folder_markers: Vec<String>,

    /// Leading icons/keywords that mark a file entry
    pub file_markers: Vec<String>,

    /// List bullets and tree-drawing prefixes that may anchor an entry
    pub bullet_markers: Vec<String>,

    /// Keywords introducing a scan-scope allow-list (`scope: src, lib`)
    pub scope_keywords: Vec<String>,

    /// Arrows between two paths that declare a dependency
    pub dependency_arrows: Vec<String>,

    /// Verbs between two paths that declare a dependency
    pub dependency_verbs: Vec<String>,

    /// Shortest accepted path token, extension included
    pub min_path_len: usize,

    /// Longest accepted extension (without the dot)
    pub max_extension_len: usize,

    /// File stems with more hyphens than this read as prose
    pub max_stem_hyphens: usize,
}

impl Default for ParserRules {
    fn default() -> Self {
        Self {
            folder_markers: strings(&["📁", "📂", "🗂", "folder:", "dir:", "directory:"]),
            file_markers: strings(&["📄", "📝", "📜", "📃", "🐍", "file:"]),
            bullet_markers: strings(&["├──", "└──", "│", "-", "*", "+"]),
            scope_keywords: strings(&["scope:", "scan scope:", "@scope"]),
            dependency_arrows: strings(&["-->", "->", "→", "=>"]),
            dependency_verbs: strings(&[
                "depends on",
                "imports",
                "uses",
                "calls",
                "reads",
                "writes",
                "emits",
                "triggers",
            ]),
            min_path_len: 4,
            max_extension_len: 5,
            max_stem_hyphens: 3,
        }
    }
}

impl ParserRules {
    pub fn validate(&self) -> Result<()> {
        if self.file_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(SpecParserError::invalid_rules(
                "at least one file marker is required",
            ));
        }

        if self.min_path_len < 3 {
            return Err(SpecParserError::invalid_rules(format!(
                "min_path_len ({}) must be at least 3",
                self.min_path_len
            )));
        }

        if self.max_extension_len == 0 || self.max_extension_len > 10 {
            return Err(SpecParserError::invalid_rules(format!(
                "max_extension_len ({}) must be within 1..=10",
                self.max_extension_len
            )));
        }

        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_are_valid() {
        assert!(ParserRules::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_rules() {
        let mut rules = ParserRules {
            file_markers: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(rules.validate().is_err());

        rules.file_markers = vec!["file:".to_string()];
        rules.min_path_len = 1;
        assert!(rules.validate().is_err());

        rules.min_path_len = 4;
        rules.max_extension_len = 0;
        assert!(rules.validate().is_err());
    }
}
