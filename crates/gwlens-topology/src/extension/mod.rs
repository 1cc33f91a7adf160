//! Graph extensions
//!
//! An extension enriches a built graph by writing typed metadata onto nodes.
//! Extensions declare their dependencies and a [`Pipeline`] runs them in a
//! dependency-respecting order. Each extension clears its own metadata before
//! running, so re-running is idempotent.

pub mod direct;
pub mod effective;
pub mod not_found;
pub mod ref_grant;

use async_trait::async_trait;
use gwlens_core::{ReferenceGrantFetcher, ResourceId};
use gwlens_policy::PolicyManager;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::diagnostic::ReferenceDiagnostic;
use crate::error::{Result, TopologyError};
use crate::graph::{Graph, Node};

pub use direct::{DirectPolicies, DirectlyAttachedPolicyExtension};
pub use effective::{EffectivePolicies, EffectivePolicyExtension};
pub use not_found::{NotFoundReferenceExtension, NotFoundReferences};
pub use ref_grant::{ReferenceGrantExtension, ReferenceGrantState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExtensionId {
    DirectlyAttachedPolicy,
    EffectivePolicy,
    ReferenceGrant,
    NotFoundReference,
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectlyAttachedPolicy => write!(f, "DirectlyAttachedPolicy"),
            Self::EffectivePolicy => write!(f, "EffectivePolicy"),
            Self::ReferenceGrant => write!(f, "ReferenceGrant"),
            Self::NotFoundReference => write!(f, "NotFoundReference"),
        }
    }
}

/// Metadata stored on a node, one variant per extension
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionData {
    DirectlyAttachedPolicy(DirectPolicies),
    EffectivePolicy(EffectivePolicies),
    ReferenceGrant(ReferenceGrantState),
    NotFoundReference(NotFoundReferences),
}

/// Typed access to one extension's metadata
pub trait ExtensionResult: Sized {
    const ID: ExtensionId;

    fn from_data(data: &ExtensionData) -> Option<&Self>;
    fn from_data_mut(data: &mut ExtensionData) -> Option<&mut Self>;
    fn into_data(self) -> ExtensionData;
}

macro_rules! extension_result {
    ($ty:ty, $variant:ident) => {
        impl ExtensionResult for $ty {
            const ID: ExtensionId = ExtensionId::$variant;

            fn from_data(data: &ExtensionData) -> Option<&Self> {
                match data {
                    ExtensionData::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn from_data_mut(data: &mut ExtensionData) -> Option<&mut Self> {
                match data {
                    ExtensionData::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn into_data(self) -> ExtensionData {
                ExtensionData::$variant(self)
            }
        }
    };
}

extension_result!(DirectPolicies, DirectlyAttachedPolicy);
extension_result!(EffectivePolicies, EffectivePolicy);
extension_result!(ReferenceGrantState, ReferenceGrant);
extension_result!(NotFoundReferences, NotFoundReference);

#[async_trait]
pub trait Extension: Send + Sync {
    fn id(&self) -> ExtensionId;

    /// Extensions that must run before this one
    fn dependencies(&self) -> &'static [ExtensionId] {
        &[]
    }

    async fn execute(&self, graph: &mut Graph) -> Result<()>;
}

/// Ordered set of extensions
pub struct Pipeline {
    extensions: Vec<Box<dyn Extension>>,
}

impl Pipeline {
    /// Order extensions so each runs after its dependencies.
    ///
    /// Ties keep declaration order. Fails on duplicate ids, on dependencies
    /// that are not part of the pipeline, and on cycles.
    pub fn new(extensions: Vec<Box<dyn Extension>>) -> Result<Self> {
        for (i, ext) in extensions.iter().enumerate() {
            if extensions[..i].iter().any(|other| other.id() == ext.id()) {
                return Err(TopologyError::InvalidPipeline {
                    message: format!("{} registered twice", ext.id()),
                });
            }
            for dep in ext.dependencies() {
                if !extensions.iter().any(|other| other.id() == *dep) {
                    return Err(TopologyError::InvalidPipeline {
                        message: format!("{} depends on {}, which is not registered", ext.id(), dep),
                    });
                }
            }
        }

        let mut pending: Vec<Option<Box<dyn Extension>>> =
            extensions.into_iter().map(Some).collect();
        let mut ordered: Vec<Box<dyn Extension>> = Vec::with_capacity(pending.len());

        while ordered.len() < pending.len() {
            let ready = pending.iter().position(|slot| {
                slot.as_ref().is_some_and(|ext| {
                    ext.dependencies()
                        .iter()
                        .all(|dep| ordered.iter().any(|done| done.id() == *dep))
                })
            });

            match ready.and_then(|index| pending[index].take()) {
                Some(ext) => ordered.push(ext),
                None => {
                    let stuck: Vec<String> = pending
                        .iter()
                        .flatten()
                        .map(|ext| ext.id().to_string())
                        .collect();
                    return Err(TopologyError::InvalidPipeline {
                        message: format!("dependency cycle among {}", stuck.join(", ")),
                    });
                }
            }
        }

        Ok(Self {
            extensions: ordered,
        })
    }

    /// Every built-in extension: policy attachment, effective policies and
    /// both reference validators
    pub fn standard(
        policy_manager: Arc<PolicyManager>,
        grants: Arc<dyn ReferenceGrantFetcher>,
    ) -> Result<Self> {
        Self::new(vec![
            Box::new(NotFoundReferenceExtension),
            Box::new(ReferenceGrantExtension::new(grants)),
            Box::new(EffectivePolicyExtension),
            Box::new(DirectlyAttachedPolicyExtension::new(policy_manager)),
        ])
    }

    pub fn order(&self) -> Vec<ExtensionId> {
        self.extensions.iter().map(|ext| ext.id()).collect()
    }

    /// Run every extension in order, stopping at the first failure
    pub async fn run(&self, graph: &mut Graph) -> Result<()> {
        for ext in &self.extensions {
            debug!(extension = %ext.id(), "running extension");
            ext.execute(graph).await?;
        }
        Ok(())
    }
}

/// Diagnostics recorded on one node by the reference validators
pub fn diagnostics_for(node: &Node) -> Result<Vec<ReferenceDiagnostic>> {
    let mut diagnostics = Vec::new();
    if let Some(state) = node.metadata::<ReferenceGrantState>()? {
        diagnostics.extend(state.diagnostics.iter().cloned());
    }
    if let Some(not_found) = node.metadata::<NotFoundReferences>()? {
        diagnostics.extend(not_found.diagnostics.iter().cloned());
    }
    Ok(diagnostics)
}

impl Graph {
    /// Diagnostics recorded on the node `id`, empty when it is not in the graph
    pub fn diagnostics(&self, id: &ResourceId) -> Result<Vec<ReferenceDiagnostic>> {
        match self.node(id) {
            Some(node) => diagnostics_for(node),
            None => Ok(Vec::new()),
        }
    }
}

/// Diagnostics across the whole graph, in node order
pub fn all_diagnostics(graph: &Graph) -> Result<Vec<ReferenceDiagnostic>> {
    let mut diagnostics = Vec::new();
    for node in graph.nodes() {
        diagnostics.extend(diagnostics_for(node)?);
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        id: ExtensionId,
        deps: &'static [ExtensionId],
    }

    #[async_trait]
    impl Extension for Named {
        fn id(&self) -> ExtensionId {
            self.id
        }

        fn dependencies(&self) -> &'static [ExtensionId] {
            self.deps
        }

        async fn execute(&self, _graph: &mut Graph) -> Result<()> {
            Ok(())
        }
    }

    fn named(id: ExtensionId, deps: &'static [ExtensionId]) -> Box<dyn Extension> {
        Box::new(Named { id, deps })
    }

    #[test]
    fn test_dependencies_run_first() {
        let pipeline = Pipeline::new(vec![
            named(ExtensionId::EffectivePolicy, &[ExtensionId::DirectlyAttachedPolicy]),
            named(ExtensionId::NotFoundReference, &[]),
            named(ExtensionId::DirectlyAttachedPolicy, &[]),
        ])
        .unwrap();

        assert_eq!(
            pipeline.order(),
            vec![
                ExtensionId::NotFoundReference,
                ExtensionId::DirectlyAttachedPolicy,
                ExtensionId::EffectivePolicy,
            ]
        );
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let result = Pipeline::new(vec![named(
            ExtensionId::EffectivePolicy,
            &[ExtensionId::DirectlyAttachedPolicy],
        )]);
        assert!(matches!(result, Err(TopologyError::InvalidPipeline { .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = Pipeline::new(vec![
            named(ExtensionId::EffectivePolicy, &[ExtensionId::ReferenceGrant]),
            named(ExtensionId::ReferenceGrant, &[ExtensionId::EffectivePolicy]),
        ]);
        assert!(matches!(result, Err(TopologyError::InvalidPipeline { .. })));
    }

    #[test]
    fn test_standard_order() {
        let manager = Arc::new(PolicyManager::new(&gwlens_core::AnalysisConfig::default()));
        let grants = Arc::new(gwlens_core::StaticFetcher::new());
        let order = Pipeline::standard(manager, grants).unwrap().order();

        let direct = order
            .iter()
            .position(|id| *id == ExtensionId::DirectlyAttachedPolicy)
            .unwrap();
        let effective = order
            .iter()
            .position(|id| *id == ExtensionId::EffectivePolicy)
            .unwrap();
        assert!(direct < effective);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_metadata_mismatch_detected() {
        let doc = gwlens_core::Document::from_yaml(
            "apiVersion: v1\nkind: Service\nmetadata: {name: api, namespace: demo}\n",
        )
        .unwrap();
        let mut node = Node::new(doc);
        node.insert_raw_metadata(
            ExtensionId::EffectivePolicy,
            ExtensionData::NotFoundReference(NotFoundReferences::default()),
        );

        assert!(matches!(
            node.metadata::<EffectivePolicies>(),
            Err(TopologyError::MetadataMismatch { .. })
        ));
        assert!(node.metadata::<DirectPolicies>().unwrap().is_none());
    }
}
