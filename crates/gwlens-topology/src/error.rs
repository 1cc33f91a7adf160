//! Error types for gwlens-topology

use thiserror::Error;

use crate::extension::ExtensionId;

/// Result type for gwlens-topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Core(#[from] gwlens_core::CoreError),

    #[error(transparent)]
    Policy(#[from] gwlens_policy::PolicyError),

    /// Metadata stored under an extension's key has another extension's shape
    #[error("metadata of node '{node}' under {extension} has an unexpected type")]
    MetadataMismatch { extension: ExtensionId, node: String },

    /// Edge or lookup names a node that is not in the graph
    #[error("node '{id}' is not in the graph")]
    NodeNotFound { id: String },

    /// Replacement document does not have the node's identity
    #[error("cannot replace '{id}' with a document for '{replacement}'")]
    IdentityChange { id: String, replacement: String },

    /// Extension dependencies cannot be satisfied
    #[error("invalid extension pipeline: {message}")]
    InvalidPipeline { message: String },
}
