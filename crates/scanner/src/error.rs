use thiserror::Error;

/// Result type for scanner operations
pub type Result<T> = std::result::Result<T, ScannerError>;

/// Errors raised while building scanners. Scanning itself never fails: unreadable
/// or unparseable input degrades to an empty result.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// An extraction pattern failed to compile
    #[error("Invalid pattern for {language}: {source}")]
    InvalidPattern {
        language: String,
        #[source]
        source: regex::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScannerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub(crate) fn invalid_pattern(language: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            language: language.into(),
            source,
        }
    }
}
