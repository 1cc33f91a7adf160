//! Directly attached policies
//!
//! Records on every node the policies whose target resolves to it.

use async_trait::async_trait;
use gwlens_core::ResourceId;
use gwlens_policy::{Policy, PolicyManager};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

use super::{Extension, ExtensionId};
use crate::error::Result;
use crate::graph::{Graph, Node};

/// Policies attached to one node, keyed by policy identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectPolicies {
    pub policies: BTreeMap<ResourceId, Policy>,
}

impl DirectPolicies {
    pub fn inheritable(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values().filter(|p| p.is_inheritable())
    }
}

/// Attached policies of `node`, empty when none were recorded
pub(crate) fn attached(node: &Node) -> Result<DirectPolicies> {
    Ok(node.metadata::<DirectPolicies>()?.cloned().unwrap_or_default())
}

pub struct DirectlyAttachedPolicyExtension {
    manager: Arc<PolicyManager>,
}

impl DirectlyAttachedPolicyExtension {
    pub fn new(manager: Arc<PolicyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Extension for DirectlyAttachedPolicyExtension {
    fn id(&self) -> ExtensionId {
        ExtensionId::DirectlyAttachedPolicy
    }

    async fn execute(&self, graph: &mut Graph) -> Result<()> {
        graph.remove_metadata(self.id());

        let default_namespace = self.manager.default_namespace();
        for policy in self.manager.policies() {
            let Some(target) = policy.target_ref() else {
                continue;
            };
            let target = target.clone().normalized(default_namespace);
            if let Some(node) = graph.node_mut(&target) {
                trace!(policy = %policy.id(), target = %target, "attaching policy");
                node.metadata_or_default::<DirectPolicies>()?
                    .policies
                    .insert(policy.id(), policy.clone());
            }
        }
        Ok(())
    }
}
