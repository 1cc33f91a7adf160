//! CLI error types with exit code handling

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid combination of arguments
    #[error("{message}")]
    #[diagnostic(code(gwlens::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A manifest could not be parsed
    #[error("Invalid manifest {path}: {message}")]
    #[diagnostic(code(gwlens::cli::manifest))]
    Manifest { path: String, message: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(code(gwlens::cli::config))]
    Config { message: String },

    /// The cluster could not be reached
    #[error("Cannot reach the cluster: {message}")]
    #[diagnostic(
        code(gwlens::cli::cluster),
        help("use --offline with -f to work from manifests only")
    )]
    Cluster { message: String },

    /// Nothing matched the selection
    #[error("{message}")]
    #[diagnostic(code(gwlens::cli::not_found))]
    NotFound { message: String },

    /// Reference problems introduced under `--strict`
    #[error("{count} new reference problem(s) found")]
    #[diagnostic(code(gwlens::cli::diagnostics))]
    DiagnosticsFound { count: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(gwlens::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(gwlens::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::DiagnosticsFound { .. } => exit_codes::DIAGNOSTICS_FOUND,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Manifest { .. }
            | CliError::Config { .. }
            | CliError::Cluster { .. }
            | CliError::NotFound { .. }
            | CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn manifest(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Manifest {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn config(err: impl std::fmt::Display) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }

    pub fn cluster(err: impl std::fmt::Display) -> Self {
        Self::Cluster {
            message: err.to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// IO error annotated with the path it concerns
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
