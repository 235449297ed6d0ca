//! Core Settings struct.

use super::{BuildFrontend, PackageSettings, TargetPlatform};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Validated configuration for one pipeline run.
///
/// All paths are absolute. Construct with
/// [`SettingsBuilder`](super::SettingsBuilder).
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_layer::bundler::{PackageSettings, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_layer::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .source_dir("mylib")
///     .package_settings(PackageSettings::new("mylib"))
///     .build()?;
///
/// assert!(settings.output_path().ends_with("mylib-layer.zip"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    package: PackageSettings,
    source_dir: PathBuf,
    workspace_dir: PathBuf,
    dist_dir: PathBuf,
    output_path: PathBuf,
    python: PathBuf,
    frontend: BuildFrontend,
    layer_prefix: Option<PathBuf>,
    target_platform: TargetPlatform,
    pip_args: Vec<String>,
    stage_timeout: Option<Duration>,
    keep_workspace: bool,
    reconcile: bool,
}

impl Settings {
    /// Returns the project name.
    pub fn project_name(&self) -> &str {
        &self.package.project_name
    }

    /// Returns the package metadata.
    pub fn package(&self) -> &PackageSettings {
        &self.package
    }

    /// Returns the source tree.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Returns the pipeline-owned workspace path.
    ///
    /// Everything at this path is deleted at the start of every run.
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Returns the directory the build collaborator writes wheels into.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Returns true if the dist directory lives inside the workspace and is
    /// therefore wiped together with it.
    pub fn dist_in_workspace(&self) -> bool {
        self.dist_dir.starts_with(&self.workspace_dir)
    }

    /// Returns the final archive path.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Returns the Python interpreter used for every collaborator call.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Returns the build frontend.
    pub fn frontend(&self) -> BuildFrontend {
        self.frontend
    }

    /// Returns the relative directory inside the archive that holds the tree.
    pub fn layer_prefix(&self) -> Option<&Path> {
        self.layer_prefix.as_deref()
    }

    /// Returns the cross-target install options.
    pub fn target_platform(&self) -> &TargetPlatform {
        &self.target_platform
    }

    /// Returns extra arguments passed to every `pip install`.
    pub fn pip_args(&self) -> &[String] {
        &self.pip_args
    }

    /// Returns the per-stage timeout, if any.
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout
    }

    /// Returns true if the workspace is left in place after the run.
    pub fn keep_workspace(&self) -> bool {
        self.keep_workspace
    }

    /// Returns true if the active environment is reconciled after archiving.
    pub fn reconcile(&self) -> bool {
        self.reconcile
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        package: PackageSettings,
        source_dir: PathBuf,
        workspace_dir: PathBuf,
        dist_dir: PathBuf,
        output_path: PathBuf,
        python: PathBuf,
        frontend: BuildFrontend,
        layer_prefix: Option<PathBuf>,
        target_platform: TargetPlatform,
        pip_args: Vec<String>,
        stage_timeout: Option<Duration>,
        keep_workspace: bool,
        reconcile: bool,
    ) -> Self {
        Self {
            package,
            source_dir,
            workspace_dir,
            dist_dir,
            output_path,
            python,
            frontend,
            layer_prefix,
            target_platform,
            pip_args,
            stage_timeout,
            keep_workspace,
            reconcile,
        }
    }
}
