use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Graph error: {0}")]
    GraphError(#[from] synapse_graph::GraphError),

    #[error("Scanner error: {0}")]
    ScannerError(#[from] synapse_scanner::ScannerError),

    #[error("Spec parser error: {0}")]
    SpecParserError(#[from] synapse_spec_parser::SpecParserError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The durable store exists but cannot be read back as a graph
    #[error("Corrupt graph state at {path}: {reason}")]
    CorruptState { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
