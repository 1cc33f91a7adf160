//! Analyze command - reference problems a set of manifests would introduce or fix

use gwlens_core::{AnalysisConfig, StaticFetcher};
use gwlens_topology::analyze_changes;
use miette::IntoDiagnostic;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::OutputFormat;
use crate::backend::{Backend, connect, read_manifests};
use crate::display;
use crate::error::{CliError, Result};

/// Run the analyze command
///
/// Offline, the current state is whatever `state` describes (nothing when
/// empty); otherwise it is read from the cluster.
pub async fn run(
    config: &AnalysisConfig,
    files: &[PathBuf],
    state: &[PathBuf],
    offline: bool,
    strict: bool,
    output: OutputFormat,
) -> Result<()> {
    if !state.is_empty() && !offline {
        return Err(CliError::usage_with_help(
            "--state describes the current state and requires --offline",
            "drop --state to compare against the cluster",
        ));
    }

    let changes = read_manifests(files, &config.default_namespace)?;
    if changes.is_empty() {
        return Err(CliError::usage("the given manifests contain no resources"));
    }

    let base = if offline {
        let current = read_manifests(state, &config.default_namespace)?;
        Backend::Offline(StaticFetcher::with_documents(current))
    } else {
        Backend::Live(connect().await?)
    };

    let report = analyze_changes(Arc::new(base), changes, config)
        .await
        .into_diagnostic()?;

    match output {
        OutputFormat::Table => display::print_impact(&report),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report).into_diagnostic()?),
    }

    if strict && report.has_new_issues() {
        info!(count = report.introduced.len(), "failing on introduced problems");
        return Err(CliError::DiagnosticsFound {
            count: report.introduced.len(),
        });
    }
    Ok(())
}
