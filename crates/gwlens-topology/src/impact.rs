//! Change impact analysis
//!
//! Given proposed manifests, report which reference problems the change
//! introduces, which it fixes and which persist. The graph is built once
//! from the changed state, then rolled back to the live state and
//! re-evaluated.

use gwlens_core::{
    AnalysisConfig, Document, GroupKind, OverlayFetcher, ReferenceGrantFetcher, ResourceFetcher,
    ResourceId,
};
use gwlens_policy::PolicyManager;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::builder::GraphBuilder;
use crate::diagnostic::ReferenceDiagnostic;
use crate::error::Result;
use crate::extension::{Pipeline, all_diagnostics};
use crate::gateway;
use crate::graph::Graph;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    /// Objects that do not exist yet
    pub created: Vec<ResourceId>,
    /// Objects that exist and would be replaced
    pub updated: Vec<ResourceId>,
    /// Problems present only after the change
    pub introduced: Vec<ReferenceDiagnostic>,
    /// Problems present only before the change
    pub fixed: Vec<ReferenceDiagnostic>,
    /// Problems present either way
    pub unchanged: Vec<ReferenceDiagnostic>,
}

impl ImpactReport {
    pub fn has_new_issues(&self) -> bool {
        !self.introduced.is_empty()
    }
}

/// Compare the live state served by `base` with the state after applying `changes`
pub async fn analyze_changes<F>(
    base: Arc<F>,
    changes: Vec<Document>,
    config: &AnalysisConfig,
) -> Result<ImpactReport>
where
    F: ResourceFetcher + ReferenceGrantFetcher + 'static,
{
    let existing = existing_versions(&*base, &changes).await?;

    let overlay = Arc::new(OverlayFetcher::new(base.clone(), changes.clone()));
    let mut graph = GraphBuilder::new(&*overlay)
        .start_from(changes)
        .use_relations(gateway::all_relations())
        .with_max_depth(config.max_depth)
        .build()
        .await?;

    let after = evaluate(&mut graph, &*overlay, overlay.clone(), config).await?;
    debug!(issues = after.len(), "evaluated changed state");

    for (id, previous) in &existing {
        match previous {
            None => {
                graph.delete_node(id);
            }
            Some(document) if graph.has_node(id) => {
                graph.replace_document(id, document.clone())?;
                graph.rewire_node(id)?;
            }
            Some(_) => {}
        }
    }

    let before = evaluate(&mut graph, &*base, base.clone(), config).await?;
    debug!(issues = before.len(), "evaluated live state");

    let (created, updated): (Vec<_>, Vec<_>) =
        existing.iter().partition(|(_, previous)| previous.is_none());

    let report = ImpactReport {
        created: created.into_iter().map(|(id, _)| id.clone()).collect(),
        updated: updated.into_iter().map(|(id, _)| id.clone()).collect(),
        introduced: after.difference(&before).cloned().collect(),
        fixed: before.difference(&after).cloned().collect(),
        unchanged: after.intersection(&before).cloned().collect(),
    };

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        introduced = report.introduced.len(),
        fixed = report.fixed.len(),
        "impact analysis complete"
    );
    Ok(report)
}

/// Live version of every changed object, `None` when it does not exist
async fn existing_versions(
    base: &dyn ResourceFetcher,
    changes: &[Document],
) -> Result<BTreeMap<ResourceId, Option<Document>>> {
    let mut live: BTreeMap<GroupKind, BTreeMap<ResourceId, Document>> = BTreeMap::new();
    let mut existing = BTreeMap::new();

    for change in changes {
        let group_kind = change.group_kind();
        if !live.contains_key(&group_kind) {
            let documents = base.fetch(&group_kind).await?;
            live.insert(
                group_kind.clone(),
                documents
                    .into_iter()
                    .map(|doc| (doc.resource_id(), doc))
                    .collect(),
            );
        }

        let id = change.resource_id();
        let previous = live
            .get(&group_kind)
            .and_then(|docs| docs.get(&id))
            .cloned();
        existing.insert(id, previous);
    }
    Ok(existing)
}

async fn evaluate(
    graph: &mut Graph,
    fetcher: &dyn ResourceFetcher,
    grants: Arc<dyn ReferenceGrantFetcher>,
    config: &AnalysisConfig,
) -> Result<BTreeSet<ReferenceDiagnostic>> {
    let mut manager = PolicyManager::new(config);
    manager.init(fetcher).await?;
    Pipeline::standard(Arc::new(manager), grants)?
        .run(graph)
        .await?;
    Ok(all_diagnostics(graph)?.into_iter().collect())
}
