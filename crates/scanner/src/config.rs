use crate::error::{Result, ScannerError};
use serde::{Deserialize, Serialize};

/// Hard ceiling for `max_nesting_depth`; flow extraction recurses per level
pub const MAX_NESTING_DEPTH: usize = 256;

/// Configuration for symbol and control-flow scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Files larger than this are treated as unreadable (empty result)
    pub max_file_bytes: u64,

    /// Upper bound on steps emitted for one flow (START/END excluded)
    pub max_flow_steps: usize,

    /// Step labels are truncated to this many characters
    pub label_max_chars: usize,

    /// Deepest block nesting the flow scanner follows; deeper input yields
    /// a trivial flow
    pub max_nesting_depth: usize,

    /// Languages to scan (empty = all registered languages)
    pub languages: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_048_576,
            max_flow_steps: 400,
            label_max_chars: 80,
            max_nesting_depth: 64,
            languages: vec![],
        }
    }
}

impl ScannerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_file_bytes == 0 {
            return Err(ScannerError::invalid_config("max_file_bytes must be > 0"));
        }

        if self.max_flow_steps == 0 {
            return Err(ScannerError::invalid_config("max_flow_steps must be > 0"));
        }

        if self.label_max_chars < 8 {
            return Err(ScannerError::invalid_config(format!(
                "label_max_chars ({}) must be at least 8",
                self.label_max_chars
            )));
        }

        if self.max_nesting_depth == 0 || self.max_nesting_depth > MAX_NESTING_DEPTH {
            return Err(ScannerError::invalid_config(format!(
                "max_nesting_depth ({}) must be in 1..={MAX_NESTING_DEPTH}",
                self.max_nesting_depth
            )));
        }

        Ok(())
    }

    pub(crate) fn allows_language(&self, language: &str) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ScannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig {
            max_flow_steps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_flow_steps = 10;
        config.label_max_chars = 3;
        assert!(config.validate().is_err());

        config.label_max_chars = 40;
        config.max_file_bytes = 0;
        assert!(config.validate().is_err());

        config.max_file_bytes = 1024;
        config.max_nesting_depth = 0;
        assert!(config.validate().is_err());
        config.max_nesting_depth = MAX_NESTING_DEPTH + 1;
        assert!(config.validate().is_err());
        config.max_nesting_depth = MAX_NESTING_DEPTH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_language_allow_list() {
        let config = ScannerConfig {
            languages: vec!["Python".to_string()],
            ..Default::default()
        };
        assert!(config.allows_language("python"));
        assert!(!config.allows_language("rust"));
        assert!(ScannerConfig::default().allows_language("rust"));
    }
}
