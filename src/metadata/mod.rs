//! Project metadata discovery from `pyproject.toml` and `setup.cfg`.
//!
//! Only what the pipeline needs is read: the project name (to select the
//! built wheel and to uninstall an older copy), the version (for the
//! report) and the optional `[tool.kodegen-layer]` table with per-project
//! defaults. Everything else in the build metadata is left to the build
//! backend.

use crate::bundler::BuildFrontend;
use crate::error::{BundlerError, CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Per-project defaults from `[tool.kodegen-layer]` in `pyproject.toml`.
///
/// ```toml
/// [tool.kodegen-layer]
/// output = "build/mylib-layer.zip"
/// layer-prefix = "python"
/// platforms = ["manylinux2014_x86_64"]
/// python-version = "3.12"
/// pip-args = ["--index-url", "https://mirror.example/simple"]
/// ```
///
/// Relative paths are relative to the source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LayerConfig {
    /// Archive path
    pub output: Option<PathBuf>,
    /// Workspace path
    pub workspace: Option<PathBuf>,
    /// Directory inside the archive holding the tree
    pub layer_prefix: Option<String>,
    /// Python interpreter
    pub python: Option<PathBuf>,
    /// Build frontend
    pub frontend: Option<BuildFrontend>,
    /// Target platform tags
    pub platforms: Vec<String>,
    /// Target Python version
    pub python_version: Option<String>,
    /// Target Python implementation
    pub implementation: Option<String>,
    /// Extra `pip install` arguments
    pub pip_args: Vec<String>,
    /// Never touch the active environment
    pub skip_reconcile: Option<bool>,
}

/// Metadata discovered in a source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Project name, if declared statically
    pub name: Option<String>,

    /// Project version, if declared statically
    pub version: Option<String>,

    /// File the name was read from
    pub source_file: Option<PathBuf>,

    /// Layer defaults from `[tool.kodegen-layer]`
    pub layer_config: LayerConfig,
}

/// Reads project metadata from `source_dir`.
///
/// `pyproject.toml` is consulted first (`[project]`, then `[tool.poetry]`),
/// then `setup.cfg` (`[metadata]`). A tree with neither file, or with only a
/// `setup.py`, yields metadata without a name; the caller must then supply
/// one.
pub fn load_project(source_dir: &Path) -> Result<ProjectMetadata> {
    let mut metadata = ProjectMetadata::default();

    let pyproject_path = source_dir.join("pyproject.toml");
    if pyproject_path.is_file() {
        let content = std::fs::read_to_string(&pyproject_path).map_err(|e| {
            BundlerError::Cli(CliError::ExecutionFailed {
                command: "read_pyproject".to_string(),
                reason: format!("Failed to read {}: {}", pyproject_path.display(), e),
            })
        })?;
        metadata = parse_pyproject(&content).map_err(|reason| {
            BundlerError::Cli(CliError::InvalidArguments {
                reason: format!("{}: {}", pyproject_path.display(), reason),
            })
        })?;
        if metadata.name.is_some() {
            metadata.source_file = Some(pyproject_path);
            return Ok(metadata);
        }
    }

    let setup_cfg_path = source_dir.join("setup.cfg");
    if setup_cfg_path.is_file() {
        let content = std::fs::read_to_string(&setup_cfg_path).map_err(|e| {
            BundlerError::Cli(CliError::ExecutionFailed {
                command: "read_setup_cfg".to_string(),
                reason: format!("Failed to read {}: {}", setup_cfg_path.display(), e),
            })
        })?;
        let (name, version) = parse_setup_cfg(&content);
        if name.is_some() {
            metadata.name = name;
            metadata.version = metadata.version.or(version);
            metadata.source_file = Some(setup_cfg_path);
            return Ok(metadata);
        }
    }

    log::debug!(
        "No static project name found in {}",
        source_dir.display()
    );
    Ok(metadata)
}

/// Parses the parts of `pyproject.toml` the bundler uses.
pub fn parse_pyproject(content: &str) -> std::result::Result<ProjectMetadata, String> {
    let toml_value: toml::Value =
        toml::from_str(content).map_err(|e| format!("failed to parse: {e}"))?;

    let project = toml_value.get("project");
    let poetry = toml_value.get("tool").and_then(|t| t.get("poetry"));

    let string_field = |key: &str| {
        project
            .and_then(|p| p.get(key))
            .or_else(|| poetry.and_then(|p| p.get(key)))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let layer_config = match toml_value
        .get("tool")
        .and_then(|t| t.get("kodegen-layer"))
    {
        Some(table) => table
            .clone()
            .try_into::<LayerConfig>()
            .map_err(|e| format!("invalid [tool.kodegen-layer]: {e}"))?,
        None => LayerConfig::default(),
    };

    Ok(ProjectMetadata {
        name: string_field("name"),
        version: string_field("version"),
        source_file: None,
        layer_config,
    })
}

/// Extracts `name` and `version` from the `[metadata]` section of a
/// `setup.cfg`.
///
/// Values using `attr:` or `file:` directives are dynamic and ignored.
pub fn parse_setup_cfg(content: &str) -> (Option<String>, Option<String>) {
    let mut in_metadata = false;
    let mut name = None;
    let mut version = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_metadata = line[1..line.len() - 1].trim() == "metadata";
            continue;
        }
        if !in_metadata {
            continue;
        }

        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || value.starts_with("attr:") || value.starts_with("file:") {
            continue;
        }

        match key.trim() {
            "name" => name = Some(value.to_string()),
            "version" => version = Some(value.to_string()),
            _ => {}
        }
    }

    (name, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyproject_project_table() {
        let metadata = parse_pyproject(
            r#"
[project]
name = "mylib"
version = "1.2.0"
dependencies = ["python-dateutil>=2.8"]
"#,
        )
        .expect("valid pyproject");

        assert_eq!(metadata.name.as_deref(), Some("mylib"));
        assert_eq!(metadata.version.as_deref(), Some("1.2.0"));
        assert_eq!(metadata.layer_config, LayerConfig::default());
    }

    #[test]
    fn pyproject_poetry_fallback() {
        let metadata = parse_pyproject(
            r#"
[tool.poetry]
name = "poetry-lib"
version = "0.3.1"
"#,
        )
        .expect("valid pyproject");

        assert_eq!(metadata.name.as_deref(), Some("poetry-lib"));
        assert_eq!(metadata.version.as_deref(), Some("0.3.1"));
    }

    #[test]
    fn pyproject_layer_config() {
        let metadata = parse_pyproject(
            r#"
[project]
name = "mylib"

[tool.kodegen-layer]
layer-prefix = "python"
frontend = "build"
platforms = ["manylinux2014_x86_64"]
python-version = "3.12"
skip-reconcile = true
"#,
        )
        .expect("valid pyproject");

        let config = metadata.layer_config;
        assert_eq!(config.layer_prefix.as_deref(), Some("python"));
        assert_eq!(config.frontend, Some(BuildFrontend::Build));
        assert_eq!(config.platforms, ["manylinux2014_x86_64"]);
        assert_eq!(config.python_version.as_deref(), Some("3.12"));
        assert_eq!(config.skip_reconcile, Some(true));
        assert!(config.pip_args.is_empty());
    }

    #[test]
    fn pyproject_rejects_unknown_layer_keys() {
        let error = parse_pyproject(
            r#"
[tool.kodegen-layer]
layer_prefix = "python"
"#,
        )
        .expect_err("unknown key");

        assert!(error.contains("tool.kodegen-layer"));
    }

    #[test]
    fn setup_cfg_metadata_section() {
        let (name, version) = parse_setup_cfg(
            "[options]\nname = wrong\n\n[metadata]\nname = my-lib\nversion = attr: my_lib.__version__\n",
        );

        assert_eq!(name.as_deref(), Some("my-lib"));
        assert_eq!(version, None);
    }
}
