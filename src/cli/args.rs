//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with defaults
//! layered as: command line, then environment, then
//! `[tool.kodegen-layer]` in the project's `pyproject.toml`, then built-in
//! defaults.

use crate::bundler::BuildFrontend;
use clap::Parser;
use std::path::PathBuf;

/// Layer archive bundler for Python libraries
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kodegen_bundler_layer",
    version,
    about = "Layer archive bundler for Python libraries",
    long_about = "Packages a Python library and all of its dependencies into a zip archive for a \
function platform layer, then reinstalls the freshly built wheel into the active environment.

Stages: clean → build → materialize → archive → reconcile

Usage:
  kodegen_bundler_layer --source mylib
  kodegen_bundler_layer --source . --layer-prefix python --output dist/mylib-layer.zip
  kodegen_bundler_layer --platform manylinux2014_x86_64 --python-version 3.12 --check-limits

Exit code 0 = archive guaranteed to exist at the output path."
)]
pub struct Args {
    /// Source tree containing pyproject.toml, setup.cfg or setup.py
    #[arg(
        short = 's',
        long,
        value_name = "DIR",
        default_value = ".",
        env = "KODEGEN_LAYER_SOURCE"
    )]
    pub source: PathBuf,

    /// Project name; required when the build metadata does not declare one statically
    #[arg(short = 'n', long, value_name = "NAME", env = "KODEGEN_LAYER_PROJECT")]
    pub project_name: Option<String>,

    /// Archive path [default: ./<project>-layer.zip]
    #[arg(short = 'o', long, value_name = "PATH", env = "KODEGEN_LAYER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Pipeline-owned workspace; wiped on every run [default: ./.layer-build]
    #[arg(short = 'w', long, value_name = "DIR", env = "KODEGEN_LAYER_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Directory the build writes wheels into [default: <workspace>/dist]
    ///
    /// A directory outside the workspace is not cleaned between runs.
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<PathBuf>,

    /// Python interpreter [default: python3]
    #[arg(long, value_name = "PATH", env = "KODEGEN_LAYER_PYTHON")]
    pub python: Option<PathBuf>,

    /// Build frontend: pip or build
    #[arg(long, value_name = "FRONTEND")]
    pub frontend: Option<BuildFrontend>,

    /// Directory inside the archive holding the installed tree (e.g. python)
    #[arg(long, value_name = "DIR")]
    pub layer_prefix: Option<String>,

    /// Target platform tag for dependency wheels (repeatable)
    #[arg(long = "platform", value_name = "TAG")]
    pub platforms: Vec<String>,

    /// Target Python version for dependency wheels (e.g. 3.12)
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Target Python implementation for dependency wheels (e.g. cp)
    #[arg(long, value_name = "IMPL")]
    pub implementation: Option<String>,

    /// Extra argument passed to every pip install (repeatable)
    #[arg(long = "pip-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub pip_args: Vec<String>,

    /// Abort a stage that runs longer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub stage_timeout: Option<u64>,

    /// Leave the workspace on disk after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Do not touch the active environment
    #[arg(long)]
    pub skip_reconcile: bool,

    /// Check the archive against platform size limits after a successful run
    #[arg(long)]
    pub check_limits: bool,

    /// Zipped size limit in MiB for --check-limits
    #[arg(long, value_name = "MIB", default_value_t = 50)]
    pub max_zipped_mib: u64,

    /// Unzipped size limit in MiB for --check-limits
    #[arg(long, value_name = "MIB", default_value_t = 250)]
    pub max_unzipped_mib: u64,

    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print detailed progress
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print nothing but errors (and the JSON report with --json)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.source.as_os_str().is_empty() {
            return Err("Source cannot be empty".to_string());
        }

        if self
            .project_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err("Project name cannot be empty".to_string());
        }

        if self.stage_timeout == Some(0) {
            return Err("Stage timeout must be at least 1 second".to_string());
        }

        if self.check_limits && (self.max_zipped_mib == 0 || self.max_unzipped_mib == 0) {
            return Err("Size limits must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        // JSON output owns stdout
        let quiet = args.quiet || args.json;
        let output = super::OutputManager::new(args.verbose && !quiet, quiet);

        Self { output }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message if not in quiet mode
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}
