//! Error types for layer bundling operations.
//!
//! Each pipeline stage fails with its own variant so the orchestrator can
//! report which stage aborted the run and why. The helper traits
//! [`ErrorExt`] and [`Context`] attach file-system and textual context at the
//! call site, and [`bail!`](crate::bail) returns early with a
//! [`Error::GenericError`].

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building a layer archive.
#[derive(Debug, Error)]
pub enum Error {
    /// The workspace could not be removed or created.
    #[error("workspace {path} could not be prepared: {source}")]
    Workspace {
        /// Workspace path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The build collaborator reported failure.
    #[error("build failed: `{command}` exited with {status}{}", stderr_tail(.stderr))]
    Build {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// More than one distribution matched the project name.
    #[error(
        "found {} distributions for `{project}` in {}, expected exactly one:{}",
        .matches.len(),
        .dir.display(),
        bullet_list(.matches)
    )]
    AmbiguousArtifact {
        /// Project name
        project: String,
        /// Directory that was scanned
        dir: PathBuf,
        /// Every matching file, sorted
        matches: Vec<PathBuf>,
    },

    /// No distribution matched the project name.
    #[error(
        "no distribution for `{project}` found in {}{}",
        .dir.display(),
        directory_listing(.contents)
    )]
    ArtifactNotFound {
        /// Project name
        project: String,
        /// Directory that was scanned
        dir: PathBuf,
        /// File names present in the directory
        contents: Vec<String>,
    },

    /// The installer could not satisfy the dependency constraints.
    #[error("dependencies of {} could not be resolved{}", .unit.display(), stderr_tail(.stderr))]
    DependencyResolution {
        /// Distribution being installed
        unit: PathBuf,
        /// Captured standard error
        stderr: String,
    },

    /// Installing into the isolated target failed for another reason.
    #[error("installing {} into {} failed: {reason}", .unit.display(), .target.display())]
    Install {
        /// Distribution being installed
        unit: PathBuf,
        /// Isolated install root
        target: PathBuf,
        /// Failure description
        reason: String,
    },

    /// The archive could not be written.
    #[error("archive {} could not be written: {reason}", .path.display())]
    Archive {
        /// Archive path
        path: PathBuf,
        /// Failure description
        reason: String,
    },

    /// The active environment could not be brought up to date.
    #[error(
        "reconciling `{project}` in the active environment failed: {reason} \
         (the environment may be partially updated, inspect it manually)"
    )]
    Reconciliation {
        /// Project name
        project: String,
        /// Failure description
        reason: String,
    },

    /// A collaborator did not finish within the configured time.
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Configured limit
        after: Duration,
    },

    /// A command could not be spawned.
    #[error("failed to run `{command}`: {error}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Spawn error
        #[source]
        error: io::Error,
    },

    /// File system error with operation and path.
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// Operation being performed
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        error: io::Error,
    },

    /// Zip read error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 20;

    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(MAX_LINES);
    format!("\n{}", lines[start..].join("\n"))
}

fn bullet_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n  • {}", p.display()))
        .collect()
}

fn directory_listing(contents: &[String]) -> String {
    if contents.is_empty() {
        " (directory is empty)".to_string()
    } else {
        format!(
            "\ndirectory contents:{}",
            contents
                .iter()
                .map(|c| format!("\n  • {c}"))
                .collect::<String>()
        )
    }
}

/// Extension for attaching file-system context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps the error in [`Error::Fs`] with the operation and path.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Turns a missing value into [`Error::GenericError`].
pub trait Context<T> {
    /// Attaches a message, producing a bundler error on failure.
    fn context<C: Display>(self, message: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, message: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(message.to_string()))
    }
}

/// Returns early with a formatted [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
