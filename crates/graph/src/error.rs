use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GraphError {
    pub(crate) fn invalid_mutation(message: impl Into<String>) -> Self {
        GraphError::InvalidMutation(message.into())
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        GraphError::InvalidConfig(message.into())
    }
}
