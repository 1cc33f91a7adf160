//! Graph command - Graphviz rendering of the topology around resources

use gwlens_core::{AnalysisConfig, Document, GroupKind};
use gwlens_topology::{gateway, to_dot};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{NamespaceScope, ResourceKind, build_graph, select};
use crate::backend::{Backend, read_manifests};
use crate::error::{CliError, Result};

/// Run the graph command
///
/// Without a kind, every Gateway API resource in the given manifests is a
/// starting point.
pub async fn run(
    config: &AnalysisConfig,
    kind: Option<ResourceKind>,
    name: Option<&str>,
    scope: NamespaceScope,
    files: &[PathBuf],
    offline: bool,
) -> Result<()> {
    let documents = read_manifests(files, scope.default_namespace(config))?;
    let starts = match kind {
        Some(_) => Vec::new(),
        None => gateway_resources(&documents),
    };
    if kind.is_none() && starts.is_empty() {
        return Err(CliError::usage_with_help(
            "nothing to graph",
            "name a resource kind or pass manifests containing Gateway API resources with -f",
        ));
    }

    let backend = Backend::open(documents, offline).await?;
    let sources = match kind {
        Some(kind) => select(&backend, kind, name, &scope).await?,
        None => starts,
    };

    let graph = build_graph(&backend, sources, config).await?;
    print!("{}", to_dot(&graph));
    Ok(())
}

fn gateway_resources(documents: &[Document]) -> Vec<Document> {
    let kinds: BTreeSet<GroupKind> = gateway::all_relations()
        .iter()
        .flat_map(|relation| [relation.from.clone(), relation.to.clone()])
        .collect();
    documents
        .iter()
        .filter(|doc| kinds.contains(&doc.group_kind()))
        .cloned()
        .collect()
}
