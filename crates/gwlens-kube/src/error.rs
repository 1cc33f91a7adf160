//! Error types for gwlens-kube

use gwlens_core::{CoreError, GroupKind};
use thiserror::Error;

/// Result type for gwlens-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// An object returned by the API could not be read as a document
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KubeError {
    /// Wrap as a fetch failure for `group_kind`, the error type fetchers report
    pub fn into_fetch_error(self, group_kind: &GroupKind) -> CoreError {
        match self {
            Self::Core(err) => err,
            other => CoreError::Fetch {
                kind: group_kind.to_string(),
                source: Box::new(other),
            },
        }
    }
}
