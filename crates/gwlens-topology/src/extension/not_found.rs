//! Dangling reference detection

use async_trait::async_trait;
use gwlens_core::ResourceId;
use tracing::info;

use super::{Extension, ExtensionId};
use crate::diagnostic::ReferenceDiagnostic;
use crate::error::Result;
use crate::graph::Graph;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotFoundReferences {
    pub diagnostics: Vec<ReferenceDiagnostic>,
}

/// Flags references, within max depth, to objects absent from the graph
pub struct NotFoundReferenceExtension;

#[async_trait]
impl Extension for NotFoundReferenceExtension {
    fn id(&self) -> ExtensionId {
        ExtensionId::NotFoundReference
    }

    async fn execute(&self, graph: &mut Graph) -> Result<()> {
        graph.remove_metadata(self.id());

        let max_depth = graph.max_depth();
        let mut found: Vec<(ResourceId, ReferenceDiagnostic)> = Vec::new();

        for relation in graph.relations() {
            for node in graph.nodes_of(&relation.from) {
                if node.depth().is_none_or(|depth| depth > max_depth) {
                    continue;
                }
                for referred in relation.neighbors(node.document()) {
                    if !graph.has_node(&referred) {
                        info!(from = %node.id(), to = %referred, relation = %relation.id, "dangling reference");
                        found.push((
                            node.id().clone(),
                            ReferenceDiagnostic::non_existent(node.id().clone(), referred),
                        ));
                    }
                }
            }
        }

        for (id, diagnostic) in found {
            if let Some(node) = graph.node_mut(&id) {
                node.metadata_or_default::<NotFoundReferences>()?
                    .diagnostics
                    .push(diagnostic);
            }
        }
        Ok(())
    }
}
