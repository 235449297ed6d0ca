//! Top-level error types for the layer bundler.
//!
//! [`BundlerError`] is what the CLI reports. Pipeline failures keep the stage
//! that failed so the process can exit with a stage-specific code.

use crate::bundler::{self, PipelineFailure, Stage};
use thiserror::Error;

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for all bundler operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors outside a pipeline run (settings, tool detection, limit check)
    #[error("Bundler error: {0}")]
    Bundler(#[from] bundler::Error),

    /// A pipeline run failed at a stage
    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineFailure),

    /// The archive exceeds the configured platform limits
    #[error("Archive exceeds platform limits: {}", .0.join("; "))]
    LimitsExceeded(Vec<String>),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Another run holds the workspace lock
    #[error("Workspace is locked by another run: {lock_path}")]
    Locked {
        /// Lock file path
        lock_path: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    ///
    /// | Code | Meaning |
    /// |---|---|
    /// | 1 | other error |
    /// | 2 | invalid arguments or configuration |
    /// | 3 | workspace locked by another run |
    /// | 10-14 | failed stage (clean, build, materialize, archive, reconcile) |
    /// | 20 | archive exceeds platform limits |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cli(CliError::Locked { .. }) => 3,
            Self::Cli(CliError::InvalidArguments { .. } | CliError::MissingArgument { .. }) => 2,
            Self::Pipeline(failure) => failure.stage.exit_code(),
            Self::LimitsExceeded(_) => 20,
            _ => 1,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let Self::Pipeline(failure) = self else {
            return vec!["Check the error message above for specific details".to_string()];
        };

        let mut suggestions = match (&failure.stage, &failure.source) {
            (_, bundler::Error::Timeout { .. }) => vec![
                "Raise --stage-timeout or check network access to the package index".to_string(),
            ],
            (Stage::Clean, _) => vec![
                "Check that the workspace path is writable and not in use".to_string(),
            ],
            (Stage::Build, bundler::Error::AmbiguousArtifact { .. }) => vec![
                "Remove stale wheels from the dist directory, or leave --dist-dir unset so it is wiped on every run".to_string(),
            ],
            (Stage::Build, bundler::Error::ArtifactNotFound { .. }) => vec![
                "Check that --project-name matches the name in the build metadata".to_string(),
            ],
            (Stage::Build, _) => vec![
                "Run the build command shown above by hand to see the full output".to_string(),
            ],
            (Stage::Materialize, bundler::Error::DependencyResolution { .. }) => vec![
                "Relax the conflicting version constraints, or check --platform/--python-version".to_string(),
            ],
            (Stage::Materialize, _) => vec![
                "Check disk space and access to the package index".to_string(),
            ],
            (Stage::Archive, _) => vec![
                "Check that the output directory is writable".to_string(),
            ],
            (Stage::Reconcile, _) => vec![
                "Inspect the active environment: the project may be uninstalled".to_string(),
                "The layer archive was written and can still be used".to_string(),
            ],
        };

        if failure.environment_untouched() {
            suggestions.push("The active environment was not modified".to_string());
        }
        suggestions
    }
}
