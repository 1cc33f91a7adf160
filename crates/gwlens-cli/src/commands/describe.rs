//! Describe command - policies and reference problems of selected resources

use gwlens_core::{AnalysisConfig, Document, ResourceId};
use miette::IntoDiagnostic;
use std::path::PathBuf;
use std::sync::Arc;

use super::{NamespaceScope, OutputFormat, ResourceKind, analyze_graph, select};
use crate::backend::{Backend, read_manifests};
use crate::display::{self, NodeReport};
use crate::error::Result;

/// Run the describe command
pub async fn run(
    config: &AnalysisConfig,
    kind: ResourceKind,
    name: Option<&str>,
    scope: NamespaceScope,
    files: &[PathBuf],
    offline: bool,
    output: OutputFormat,
) -> Result<()> {
    let documents = read_manifests(files, scope.default_namespace(config))?;
    let backend = Arc::new(Backend::open(documents, offline).await?);

    let sources = select(&*backend, kind, name, &scope).await?;
    let ids: Vec<ResourceId> = sources.iter().map(Document::resource_id).collect();
    let graph = analyze_graph(backend, sources, config).await?;

    let reports = ids
        .iter()
        .filter_map(|id| graph.node(id))
        .map(NodeReport::from_node)
        .collect::<gwlens_topology::Result<Vec<_>>>()
        .into_diagnostic()?;

    match output {
        OutputFormat::Table => display::print_reports(&reports),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&reports).into_diagnostic()?),
    }
    Ok(())
}
