//! gwlens - Gateway API topology, policy and reference analysis

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;
mod display;
mod error;
mod exit_codes;

use commands::{NamespaceScope, OutputFormat, ResourceKind};
use error::Result;

#[derive(Parser)]
#[command(name = "gwlens")]
#[command(version)]
#[command(about = "Inspect Gateway API topologies, effective policies and reference problems", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (default: ~/.config/gwlens/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of hops from the selected resources
    #[arg(long, global = true, env = "GWLENS_MAX_DEPTH")]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show attached, inherited and effective policies of resources
    Describe {
        /// Resource kind
        kind: ResourceKind,

        /// Resource name (all resources of the kind if omitted)
        name: Option<String>,

        /// Namespace (default from configuration)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Select resources in every namespace
        #[arg(short = 'A', long, conflicts_with = "namespace")]
        all_namespaces: bool,

        /// Manifest file(s) layered over the cluster state
        #[arg(short = 'f', long = "file")]
        files: Vec<PathBuf>,

        /// Do not contact the cluster, use only the manifests
        #[arg(long, requires = "files")]
        offline: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Report reference problems that applying manifests would introduce or fix
    Analyze {
        /// Manifest file(s) to analyze
        #[arg(short = 'f', long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Manifest file(s) describing the current state (with --offline)
        #[arg(long)]
        state: Vec<PathBuf>,

        /// Do not contact the cluster
        #[arg(long)]
        offline: bool,

        /// Exit with status 2 when new problems are introduced
        #[arg(long)]
        strict: bool,

        /// Namespace for manifests that do not set one
        #[arg(short, long)]
        namespace: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Print the resource graph in Graphviz DOT format
    Graph {
        /// Resource kind to start from (every Gateway API resource in the manifests if omitted)
        kind: Option<ResourceKind>,

        /// Resource name
        #[arg(requires = "kind")]
        name: Option<String>,

        /// Namespace (default from configuration)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Select resources in every namespace
        #[arg(short = 'A', long, conflicts_with = "namespace")]
        all_namespaces: bool,

        /// Manifest file(s) layered over the cluster state
        #[arg(short = 'f', long = "file")]
        files: Vec<PathBuf>,

        /// Do not contact the cluster, use only the manifests
        #[arg(long, requires = "files")]
        offline: bool,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = commands::load_config(cli.config.as_deref(), cli.max_depth)?;

    match cli.command {
        Commands::Describe {
            kind,
            name,
            namespace,
            all_namespaces,
            files,
            offline,
            output,
        } => {
            let scope = NamespaceScope::new(namespace, all_namespaces, &config);
            commands::describe::run(&config, kind, name.as_deref(), scope, &files, offline, output)
                .await
        }

        Commands::Analyze {
            files,
            state,
            offline,
            strict,
            namespace,
            output,
        } => {
            if let Some(namespace) = namespace {
                config.default_namespace = namespace;
            }
            commands::analyze::run(&config, &files, &state, offline, strict, output).await
        }

        Commands::Graph {
            kind,
            name,
            namespace,
            all_namespaces,
            files,
            offline,
        } => {
            let scope = NamespaceScope::new(namespace, all_namespaces, &config);
            commands::graph::run(&config, kind, name.as_deref(), scope, &files, offline).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit_codes::USAGE_ERROR);
        }
    };

    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
