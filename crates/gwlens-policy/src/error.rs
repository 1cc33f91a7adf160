//! Error types for gwlens-policy

use thiserror::Error;

/// Result type for gwlens-policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Core(#[from] gwlens_core::CoreError),

    /// CRD manifest is missing required fields
    #[error("invalid CustomResourceDefinition '{name}': {message}")]
    InvalidCrd { name: String, message: String },

    /// Object's kind has no registered policy CRD
    #[error("'{policy}' is not a policy: no policy CRD registered for {kind}")]
    UnknownPolicyKind { kind: String, policy: String },

    /// Policy spec has an unusable shape
    #[error("invalid spec in policy '{policy}': {message}")]
    InvalidSpec { policy: String, message: String },

    /// Attempted to merge policies of different kinds
    #[error("cannot merge policies of different kinds: {parent} and {child}")]
    KindMismatch { parent: String, child: String },
}
