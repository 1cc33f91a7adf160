//! Cross-namespace reference validation
//!
//! A route may reference a backend in another namespace only when a
//! ReferenceGrant in the backend's namespace exposes the backend and accepts
//! the route's group, kind and namespace.

use async_trait::async_trait;
use gwlens_core::{GroupKind, ReferenceGrant, ReferenceGrantFetcher, ResourceId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Extension, ExtensionId};
use crate::diagnostic::ReferenceDiagnostic;
use crate::error::Result;
use crate::graph::Graph;
use crate::relation::RelationId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceGrantState {
    /// On backends: grants exposing this backend
    pub grants: BTreeMap<ResourceId, ReferenceGrant>,
    /// On routes: references no grant allows
    pub diagnostics: Vec<ReferenceDiagnostic>,
}

pub struct ReferenceGrantExtension {
    fetcher: Arc<dyn ReferenceGrantFetcher>,
}

impl ReferenceGrantExtension {
    pub fn new(fetcher: Arc<dyn ReferenceGrantFetcher>) -> Self {
        Self { fetcher }
    }

    /// Record exposing grants on every backend, fetching each namespace once
    async fn attach_grants(&self, graph: &mut Graph) -> Result<()> {
        let mut by_namespace: BTreeMap<String, Vec<ReferenceGrant>> = BTreeMap::new();

        for backend in graph.node_ids_of(&GroupKind::service()) {
            if !by_namespace.contains_key(&backend.namespace) {
                let grants = self
                    .fetcher
                    .fetch_grants_for_namespace(&backend.namespace)
                    .await?;
                debug!(namespace = %backend.namespace, grants = grants.len(), "fetched ReferenceGrants");
                by_namespace.insert(backend.namespace.clone(), grants);
            }

            let exposing: BTreeMap<ResourceId, ReferenceGrant> = by_namespace
                .get(&backend.namespace)
                .into_iter()
                .flatten()
                .filter(|grant| grant.exposes(&backend))
                .map(|grant| (grant.id(), grant.clone()))
                .collect();

            if !exposing.is_empty()
                && let Some(node) = graph.node_mut(&backend)
            {
                node.metadata_or_default::<ReferenceGrantState>()?.grants = exposing;
            }
        }
        Ok(())
    }

    fn validate_routes(&self, graph: &mut Graph) -> Result<()> {
        let max_depth = graph.max_depth();
        let mut found: Vec<(ResourceId, ReferenceDiagnostic)> = Vec::new();

        for route in graph.nodes_of(&GroupKind::http_route()) {
            if route.depth().is_none_or(|depth| depth > max_depth) {
                continue;
            }
            for backend in graph.out_neighbors(route.id(), RelationId::BackendsOfRoute) {
                if backend.id().namespace == route.id().namespace {
                    continue;
                }
                let permitted = backend
                    .metadata::<ReferenceGrantState>()?
                    .is_some_and(|state| state.grants.values().any(|g| g.accepts(route.id())));
                if !permitted {
                    found.push((
                        route.id().clone(),
                        ReferenceDiagnostic::not_permitted(route.id().clone(), backend.id().clone()),
                    ));
                }
            }
        }

        for (id, diagnostic) in found {
            if let Some(node) = graph.node_mut(&id) {
                node.metadata_or_default::<ReferenceGrantState>()?
                    .diagnostics
                    .push(diagnostic);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Extension for ReferenceGrantExtension {
    fn id(&self) -> ExtensionId {
        ExtensionId::ReferenceGrant
    }

    async fn execute(&self, graph: &mut Graph) -> Result<()> {
        graph.remove_metadata(self.id());
        self.attach_grants(graph).await?;
        self.validate_routes(graph)
    }
}
