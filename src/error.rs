use crate::host::NodeRef;
use thiserror::Error;

/// Errors raised by the mirroring engine
#[derive(Error, Debug)]
pub enum MirrorError {
    /// A stylesheet's rule list failed for a reason other than a cross-origin restriction
    #[error("Failed to read stylesheet rules: {0}")]
    CssRules(String),

    /// A handle did not resolve to a node of the host tree
    #[error("Unknown host node: {0}")]
    UnknownNode(NodeRef),

    /// The host tree was asked to do something its structure does not allow
    #[error("Invalid host tree operation: {0}")]
    InvalidTree(String),

    /// A page description could not be turned into a host tree
    #[error("Failed to load page: {0}")]
    PageLoadFailed(String),

    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MirrorError>;
