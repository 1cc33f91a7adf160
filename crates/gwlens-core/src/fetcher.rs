//! Data-source contracts
//!
//! Analysis never talks to a cluster directly. It goes through these traits:
//! - [`ResourceFetcher`]: every object of one group-kind
//! - [`ReferenceGrantFetcher`]: ReferenceGrants of one namespace
//!
//! [`StaticFetcher`] serves a fixed set of documents (tests, offline mode) and
//! [`OverlayFetcher`] layers proposed changes over another fetcher.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::grant::ReferenceGrant;
use crate::id::{GroupKind, ResourceId};

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch every object of the given group-kind, across all namespaces
    async fn fetch(&self, group_kind: &GroupKind) -> Result<Vec<Document>>;
}

#[async_trait]
pub trait ReferenceGrantFetcher: Send + Sync {
    /// Fetch the ReferenceGrants living in `namespace`
    async fn fetch_grants_for_namespace(&self, namespace: &str) -> Result<Vec<ReferenceGrant>>;
}

/// In-memory fetcher over a fixed set of documents
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    documents: BTreeMap<GroupKind, BTreeMap<ResourceId, Document>>,
    /// Track fetches per group-kind for assertions
    fetches: Arc<Mutex<BTreeMap<GroupKind, usize>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated documents. Later duplicates replace earlier ones.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut fetcher = Self::new();
        for document in documents {
            fetcher.insert(document);
        }
        fetcher
    }

    /// Create from a multi-document YAML manifest
    pub fn from_manifest(manifest: &str) -> Result<Self> {
        Ok(Self::with_documents(Document::from_yaml_stream(manifest)?))
    }

    pub fn insert(&mut self, document: Document) {
        self.documents
            .entry(document.group_kind())
            .or_default()
            .insert(document.resource_id(), document);
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Document> {
        self.documents.get(&id.group_kind())?.get(id)
    }

    /// Number of times `group_kind` was fetched
    pub fn fetch_count(&self, group_kind: &GroupKind) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group_kind)
            .copied()
            .unwrap_or(0)
    }

    /// Fetches across all group-kinds
    pub fn total_fetches(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn record_fetch(&self, group_kind: &GroupKind) {
        *self
            .fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(group_kind.clone())
            .or_default() += 1;
    }

    fn documents_of(&self, group_kind: &GroupKind) -> Vec<Document> {
        self.documents
            .get(group_kind)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, group_kind: &GroupKind) -> Result<Vec<Document>> {
        self.record_fetch(group_kind);
        let documents = self.documents_of(group_kind);
        debug!(kind = %group_kind, count = documents.len(), "fetched from memory");
        Ok(documents)
    }
}

#[async_trait]
impl ReferenceGrantFetcher for StaticFetcher {
    async fn fetch_grants_for_namespace(&self, namespace: &str) -> Result<Vec<ReferenceGrant>> {
        let group_kind = GroupKind::reference_grant();
        self.record_fetch(&group_kind);
        let grants = self
            .documents_of(&group_kind)
            .iter()
            .filter(|doc| doc.namespace() == namespace)
            .map(ReferenceGrant::from_document)
            .collect::<Result<Vec<_>>>()?;
        debug!(namespace, count = grants.len(), "fetched ReferenceGrants from memory");
        Ok(grants)
    }
}

/// Layers additional documents over another fetcher.
///
/// Documents from the overlay replace inner documents with the same identity.
#[derive(Debug, Clone)]
pub struct OverlayFetcher<F> {
    inner: Arc<F>,
    overlay: StaticFetcher,
}

impl<F> OverlayFetcher<F> {
    pub fn new(inner: Arc<F>, documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            inner,
            overlay: StaticFetcher::with_documents(documents),
        }
    }

    pub fn inner(&self) -> &Arc<F> {
        &self.inner
    }

    fn overlay_documents(&self, group_kind: &GroupKind) -> Vec<Document> {
        self.overlay.documents_of(group_kind)
    }
}

#[async_trait]
impl<F: ResourceFetcher> ResourceFetcher for OverlayFetcher<F> {
    async fn fetch(&self, group_kind: &GroupKind) -> Result<Vec<Document>> {
        let mut merged: BTreeMap<ResourceId, Document> = self
            .inner
            .fetch(group_kind)
            .await?
            .into_iter()
            .map(|doc| (doc.resource_id(), doc))
            .collect();

        let overlay = self.overlay_documents(group_kind);
        debug!(kind = %group_kind, overlaid = overlay.len(), "applying local documents");
        for doc in overlay {
            merged.insert(doc.resource_id(), doc);
        }

        Ok(merged.into_values().collect())
    }
}

#[async_trait]
impl<F: ReferenceGrantFetcher> ReferenceGrantFetcher for OverlayFetcher<F> {
    async fn fetch_grants_for_namespace(&self, namespace: &str) -> Result<Vec<ReferenceGrant>> {
        let mut merged: BTreeMap<ResourceId, ReferenceGrant> = self
            .inner
            .fetch_grants_for_namespace(namespace)
            .await?
            .into_iter()
            .map(|grant| (grant.id(), grant))
            .collect();

        for doc in self.overlay_documents(&GroupKind::reference_grant()) {
            if doc.namespace() == namespace {
                let grant = ReferenceGrant::from_document(&doc)?;
                merged.insert(grant.id(), grant);
            }
        }

        Ok(merged.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: api
  namespace: demo
spec:
  ports: [{port: 80}]
---
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: demo
---
apiVersion: gateway.networking.k8s.io/v1beta1
kind: ReferenceGrant
metadata:
  name: allow
  namespace: demo
spec:
  from: [{group: gateway.networking.k8s.io, kind: HTTPRoute, namespace: other}]
  to: [{group: "", kind: Service}]
"#;

    #[tokio::test]
    async fn test_static_fetch_and_counts() {
        let fetcher = StaticFetcher::from_manifest(MANIFEST).unwrap();

        let services = fetcher.fetch(&GroupKind::service()).await.unwrap();
        assert_eq!(services.len(), 2);
        assert!(fetcher.fetch(&GroupKind::gateway()).await.unwrap().is_empty());

        assert_eq!(fetcher.fetch_count(&GroupKind::service()), 1);
        assert_eq!(fetcher.total_fetches(), 2);
    }

    #[tokio::test]
    async fn test_static_grants_by_namespace() {
        let fetcher = StaticFetcher::from_manifest(MANIFEST).unwrap();
        assert_eq!(fetcher.fetch_grants_for_namespace("demo").await.unwrap().len(), 1);
        assert!(fetcher.fetch_grants_for_namespace("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlay_replaces_and_adds() {
        let base = Arc::new(StaticFetcher::from_manifest(MANIFEST).unwrap());
        let changes = Document::from_yaml_stream(
            r#"
apiVersion: v1
kind: Service
metadata:
  name: api
  namespace: demo
spec:
  ports: [{port: 8080}]
---
apiVersion: v1
kind: Service
metadata:
  name: extra
  namespace: demo
"#,
        )
        .unwrap();

        let overlay = OverlayFetcher::new(base, changes);
        let services = overlay.fetch(&GroupKind::service()).await.unwrap();
        assert_eq!(services.len(), 3);

        let api = services.iter().find(|s| s.name() == "api").unwrap();
        assert_eq!(api.get("spec.ports").unwrap()[0]["port"], 8080);
    }
}
