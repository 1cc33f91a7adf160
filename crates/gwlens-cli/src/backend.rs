//! Where resources come from: local manifests, the cluster, or both

use async_trait::async_trait;
use gwlens_core::{
    Document, GroupKind, OverlayFetcher, ReferenceGrant, ReferenceGrantFetcher, ResourceFetcher,
    StaticFetcher,
};
use gwlens_kube::KubeFetcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::{CliError, Result};

pub enum Backend {
    /// Local manifests only
    Offline(StaticFetcher),
    /// The cluster
    Live(KubeFetcher),
    /// Local manifests layered over the cluster
    Overlay(OverlayFetcher<KubeFetcher>),
}

impl Backend {
    /// Serve `documents`, over the cluster unless `offline`
    pub async fn open(documents: Vec<Document>, offline: bool) -> Result<Self> {
        if offline {
            return Ok(Self::Offline(StaticFetcher::with_documents(documents)));
        }
        let cluster = connect().await?;
        if documents.is_empty() {
            Ok(Self::Live(cluster))
        } else {
            Ok(Self::Overlay(OverlayFetcher::new(Arc::new(cluster), documents)))
        }
    }
}

pub async fn connect() -> Result<KubeFetcher> {
    KubeFetcher::try_default().await.map_err(CliError::cluster)
}

/// Parse every manifest, defaulting the namespace of namespaced objects
pub fn read_manifests(files: &[PathBuf], default_namespace: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in files {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::io_at(path, e))?;
        let parsed =
            Document::from_yaml_stream(&content).map_err(|e| CliError::manifest(path, e))?;
        debug!(path = %path.display(), count = parsed.len(), "read manifest");
        documents.extend(
            parsed
                .into_iter()
                .map(|doc| doc.with_default_namespace(default_namespace)),
        );
    }
    Ok(documents)
}

#[async_trait]
impl ResourceFetcher for Backend {
    async fn fetch(&self, group_kind: &GroupKind) -> gwlens_core::Result<Vec<Document>> {
        match self {
            Self::Offline(fetcher) => fetcher.fetch(group_kind).await,
            Self::Live(fetcher) => fetcher.fetch(group_kind).await,
            Self::Overlay(fetcher) => fetcher.fetch(group_kind).await,
        }
    }
}

#[async_trait]
impl ReferenceGrantFetcher for Backend {
    async fn fetch_grants_for_namespace(
        &self,
        namespace: &str,
    ) -> gwlens_core::Result<Vec<ReferenceGrant>> {
        match self {
            Self::Offline(fetcher) => fetcher.fetch_grants_for_namespace(namespace).await,
            Self::Live(fetcher) => fetcher.fetch_grants_for_namespace(namespace).await,
            Self::Overlay(fetcher) => fetcher.fetch_grants_for_namespace(namespace).await,
        }
    }
}
