//! Builder for constructing Settings.

use super::{BuildFrontend, PackageSettings, Settings, TargetPlatform};
use crate::{
    bail,
    bundler::error::{Context, ErrorExt},
};
use path_absolutize::Absolutize;
use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

/// Workspace path used when none is configured, relative to the current
/// directory.
pub const DEFAULT_WORKSPACE_DIR: &str = ".layer-build";

/// Builder for constructing [`Settings`].
///
/// Only the source tree and the package settings are required. Everything
/// else falls back to a default:
///
/// | Setting | Default |
/// |---|---|
/// | workspace | `./.layer-build` |
/// | dist directory | `<workspace>/dist` |
/// | output | `./<project>-layer.zip` |
/// | python | `python3` |
/// | frontend | [`BuildFrontend::Pip`] |
/// | reconcile | `true` |
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_layer::bundler::{PackageSettings, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_layer::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .source_dir(".")
///     .package_settings(PackageSettings::new("mylib"))
///     .layer_prefix("python")
///     .output_path("dist/mylib-layer.zip")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    package_settings: Option<PackageSettings>,
    source_dir: Option<PathBuf>,
    workspace_dir: Option<PathBuf>,
    dist_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    python: Option<PathBuf>,
    frontend: BuildFrontend,
    layer_prefix: Option<PathBuf>,
    target_platform: TargetPlatform,
    pip_args: Vec<String>,
    stage_timeout: Option<Duration>,
    keep_workspace: bool,
    skip_reconcile: bool,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets package metadata.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets the source tree.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the workspace path. Its contents are deleted on every run.
    pub fn workspace_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.workspace_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the directory the build collaborator writes into.
    ///
    /// A directory outside the workspace is not cleaned between runs, so
    /// stale wheels there make artifact selection fail as ambiguous.
    pub fn dist_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dist_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the archive path.
    pub fn output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the Python interpreter.
    pub fn python<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.python = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the build frontend.
    pub fn frontend(mut self, frontend: BuildFrontend) -> Self {
        self.frontend = frontend;
        self
    }

    /// Installs the tree under this relative directory inside the archive.
    pub fn layer_prefix<P: AsRef<Path>>(mut self, prefix: P) -> Self {
        self.layer_prefix = Some(prefix.as_ref().to_path_buf());
        self
    }

    /// Sets cross-target install options.
    pub fn target_platform(mut self, target: TargetPlatform) -> Self {
        self.target_platform = target;
        self
    }

    /// Sets extra `pip install` arguments.
    pub fn pip_args(mut self, args: Vec<String>) -> Self {
        self.pip_args = args;
        self
    }

    /// Sets a timeout applied to each collaborator stage.
    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Leaves the workspace on disk after the run.
    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    /// Omits the reconcile stage; the active environment is never touched.
    pub fn skip_reconcile(mut self, skip: bool) -> Self {
        self.skip_reconcile = skip;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `package_settings` or `source_dir` is missing
    /// - the project name is empty
    /// - the source tree is not a directory
    /// - the layer prefix is absolute or escapes the archive root
    /// - the workspace contains the source tree, the current directory or
    ///   the output archive
    pub fn build(self) -> crate::bundler::Result<Settings> {
        let package = self
            .package_settings
            .context("package_settings is required")?;
        if package.project_name.trim().is_empty() {
            bail!("project name must not be empty");
        }

        let source_dir = absolute(&self.source_dir.context("source_dir is required")?)?;
        if !source_dir.is_dir() {
            bail!("source tree {} is not a directory", source_dir.display());
        }

        let workspace_dir = absolute(
            self.workspace_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_WORKSPACE_DIR)),
        )?;

        let dist_dir = match &self.dist_dir {
            Some(dir) => absolute(dir)?,
            None => workspace_dir.join("dist"),
        };

        let output_path = match &self.output_path {
            Some(path) => absolute(path)?,
            None => absolute(Path::new(&package.default_archive_name()))?,
        };

        let current_dir = std::env::current_dir().fs_context("reading current directory", ".")?;
        validate_workspace(&workspace_dir, &source_dir, &current_dir, &output_path)?;

        let layer_prefix = match self.layer_prefix {
            Some(prefix) if prefix.as_os_str().is_empty() => None,
            Some(prefix) => Some(validate_prefix(prefix)?),
            None => None,
        };

        Ok(Settings::new(
            package,
            source_dir,
            workspace_dir,
            dist_dir,
            output_path,
            self.python.unwrap_or_else(|| PathBuf::from("python3")),
            self.frontend,
            layer_prefix,
            self.target_platform,
            self.pip_args,
            self.stage_timeout,
            self.keep_workspace,
            !self.skip_reconcile,
        ))
    }
}

fn absolute(path: &Path) -> crate::bundler::Result<PathBuf> {
    Ok(path
        .absolutize()
        .fs_context("resolving path", path)?
        .into_owned())
}

fn validate_workspace(
    workspace: &Path,
    source: &Path,
    current_dir: &Path,
    output: &Path,
) -> crate::bundler::Result<()> {
    if workspace.parent().is_none() {
        bail!("workspace {} must not be a file system root", workspace.display());
    }
    if source.starts_with(workspace) {
        bail!(
            "workspace {} contains the source tree {}; it is wiped on every run",
            workspace.display(),
            source.display()
        );
    }
    if current_dir.starts_with(workspace) {
        bail!(
            "workspace {} contains the current directory; it is wiped on every run",
            workspace.display()
        );
    }
    if output.starts_with(workspace) {
        bail!(
            "output {} is inside the workspace {}; it would be removed after the run",
            output.display(),
            workspace.display()
        );
    }
    Ok(())
}

fn validate_prefix(prefix: PathBuf) -> crate::bundler::Result<PathBuf> {
    if !prefix
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        bail!(
            "layer prefix {} must be a relative path without `..`",
            prefix.display()
        );
    }
    Ok(prefix)
}
