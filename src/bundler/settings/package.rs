//! Project metadata used to locate and manage the distribution.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of name separators, collapsed during normalization.
static SEPARATORS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[-_.]+").ok());

/// Normalizes a distribution name the way package indexes compare them.
///
/// Lowercases and collapses every run of `-`, `_` and `.` into a single `_`,
/// so `My.Lib`, `my-lib` and `my__lib` all become `my_lib`. Wheel file names
/// use the same form for their first component.
pub fn normalize_distribution_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match SEPARATORS.as_ref() {
        Some(separators) => separators.replace_all(&lowered, "_").into_owned(),
        None => lowered,
    }
}

/// Project identity.
///
/// Usually read from `pyproject.toml` by [`crate::metadata::load_project`],
/// or supplied on the command line.
///
/// # Examples
///
/// ```
/// use kodegen_bundler_layer::bundler::PackageSettings;
///
/// let package = PackageSettings::new("My-Lib");
/// assert_eq!(package.normalized_name(), "my_lib");
/// assert_eq!(package.default_archive_name(), "My-Lib-layer.zip");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSettings {
    /// Project name as declared in the build metadata.
    ///
    /// Used for artifact selection and for uninstalling a prior installation
    /// from the active environment.
    pub project_name: String,

    /// Declared version, informational only.
    ///
    /// Default: None
    pub version: Option<String>,
}

impl PackageSettings {
    /// Creates package settings with a name and no version.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            version: None,
        }
    }

    /// Sets the declared version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Returns the normalized distribution name.
    pub fn normalized_name(&self) -> String {
        normalize_distribution_name(&self.project_name)
    }

    /// Returns the default archive file name, `<project>-layer.zip`.
    pub fn default_archive_name(&self) -> String {
        format!("{}-layer.zip", self.project_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_pattern_compiles() {
        assert!(SEPARATORS.is_some());
    }

    #[test]
    fn separator_runs_collapse_to_one_underscore() {
        assert_eq!(normalize_distribution_name("My.Lib"), "my_lib");
        assert_eq!(normalize_distribution_name("my-lib"), "my_lib");
        assert_eq!(normalize_distribution_name("my__lib"), "my_lib");
        assert_eq!(normalize_distribution_name("zope.interface-_.x"), "zope_interface_x");
        assert_eq!(normalize_distribution_name("  Requests  "), "requests");
    }
}
