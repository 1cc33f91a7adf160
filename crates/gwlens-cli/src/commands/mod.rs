//! CLI commands

pub mod analyze;
pub mod describe;
pub mod graph;

use clap::ValueEnum;
use gwlens_core::{AnalysisConfig, Document, GroupKind, ResourceFetcher};
use gwlens_policy::PolicyManager;
use gwlens_topology::{Graph, GraphBuilder, Pipeline, gateway};
use miette::IntoDiagnostic;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{CliError, Result};

/// Resource kinds that can be selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    #[value(alias = "gateway", alias = "gtw")]
    Gateways,
    #[value(alias = "httproute")]
    Httproutes,
    #[value(alias = "backend", alias = "services", alias = "service")]
    Backends,
    #[value(alias = "gatewayclass")]
    Gatewayclasses,
    #[value(alias = "namespace", alias = "ns")]
    Namespaces,
}

impl ResourceKind {
    pub fn group_kind(self) -> GroupKind {
        match self {
            Self::Gateways => GroupKind::gateway(),
            Self::Httproutes => GroupKind::http_route(),
            Self::Backends => GroupKind::service(),
            Self::Gatewayclasses => GroupKind::gateway_class(),
            Self::Namespaces => GroupKind::namespace(),
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Gateways => "gateways",
            Self::Httproutes => "httproutes",
            Self::Backends => "backends",
            Self::Gatewayclasses => "gatewayclasses",
            Self::Namespaces => "namespaces",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Namespaces a selection is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    All,
    Only(String),
}

impl NamespaceScope {
    pub fn new(namespace: Option<String>, all_namespaces: bool, config: &AnalysisConfig) -> Self {
        match namespace {
            _ if all_namespaces => Self::All,
            Some(ns) => Self::Only(ns),
            None => Self::Only(config.default_namespace.clone()),
        }
    }

    /// Namespace given to manifests that do not set one
    pub fn default_namespace<'a>(&'a self, config: &'a AnalysisConfig) -> &'a str {
        match self {
            Self::All => &config.default_namespace,
            Self::Only(ns) => ns,
        }
    }

    fn contains(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            _ if document.group_kind().is_cluster_scoped() => true,
            Self::Only(ns) => document.namespace() == ns,
        }
    }
}

/// Load configuration, applying command-line overrides
pub fn load_config(path: Option<&Path>, max_depth: Option<usize>) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => AnalysisConfig::load_from(path),
        None => AnalysisConfig::load(),
    }
    .map_err(CliError::config)?;

    if let Some(max_depth) = max_depth {
        config.max_depth = max_depth;
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Objects of `kind` in `scope`, optionally narrowed to one name
pub async fn select(
    fetcher: &dyn ResourceFetcher,
    kind: ResourceKind,
    name: Option<&str>,
    scope: &NamespaceScope,
) -> Result<Vec<Document>> {
    let selected: Vec<Document> = fetcher
        .fetch(&kind.group_kind())
        .await
        .into_diagnostic()?
        .into_iter()
        .filter(|doc| scope.contains(doc))
        .filter(|doc| name.is_none_or(|name| doc.name() == name))
        .collect();

    if selected.is_empty() {
        let what = match name {
            Some(name) => format!("{} \"{}\"", kind.plural(), name),
            None => kind.plural().to_string(),
        };
        let message = match scope {
            NamespaceScope::Only(ns) if !kind.group_kind().is_cluster_scoped() => {
                format!("no {} found in namespace \"{}\"", what, ns)
            }
            _ => format!("no {} found", what),
        };
        return Err(CliError::not_found(message));
    }
    Ok(selected)
}

/// Build the graph around `sources` with the Gateway API relations
pub async fn build_graph(
    backend: &Backend,
    sources: Vec<Document>,
    config: &AnalysisConfig,
) -> Result<Graph> {
    let graph = GraphBuilder::new(backend)
        .start_from(sources)
        .use_relations(gateway::all_relations())
        .with_max_depth(config.max_depth)
        .build()
        .await
        .into_diagnostic()?;
    Ok(graph)
}

/// Build the graph and run every extension over it
pub async fn analyze_graph(
    backend: Arc<Backend>,
    sources: Vec<Document>,
    config: &AnalysisConfig,
) -> Result<Graph> {
    let mut graph = build_graph(&backend, sources, config).await?;

    let mut manager = PolicyManager::new(config);
    manager.init(&*backend).await.into_diagnostic()?;
    Pipeline::standard(Arc::new(manager), backend)
        .into_diagnostic()?
        .run(&mut graph)
        .await
        .into_diagnostic()?;
    Ok(graph)
}
