use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpecParserError>;

/// Errors raised while building a parser. Parsing itself never fails:
/// malformed documents produce a (possibly empty) structure.
#[derive(Error, Debug)]
pub enum SpecParserError {
    #[error("Invalid parser rules: {0}")]
    InvalidRules(String),

    #[error("Invalid marker pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl SpecParserError {
    pub fn invalid_rules(msg: impl Into<String>) -> Self {
        Self::InvalidRules(msg.into())
    }
}
