//! Command line interface for the layer bundler.
//!
//! Reads the project metadata, merges `[tool.kodegen-layer]` defaults with
//! the command line, takes the run lock and drives one pipeline run.

mod args;
mod lock;
mod output;

pub use args::{Args, RuntimeConfig};
pub use lock::RunLock;
pub use output::OutputManager;

use crate::{
    bundler::{
        LayerLimits, LimitReport, PackageSettings, Pip, Pipeline, PipelineReport, Settings,
        SettingsBuilder, TargetPlatform,
        builder::tool_detection::{pip_version, resolve_python},
        limits,
    },
    error::{BundlerError, CliError, Result},
    metadata::{self, LayerConfig, ProjectMetadata},
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const MIB: u64 = 1024 * 1024;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Runs the bundler with already parsed arguments.
///
/// Returns the process exit code on success. Every failure is returned as a
/// [`BundlerError`] whose [`exit_code`](BundlerError::exit_code) the caller
/// should use.
pub async fn execute(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let config = RuntimeConfig::from(&args);

    if !args.source.is_dir() {
        return Err(CliError::InvalidArguments {
            reason: format!("source tree {} is not a directory", args.source.display()),
        }
        .into());
    }

    let project = metadata::load_project(&args.source)?;
    if let Some(file) = &project.source_file {
        config.verbose_println(&format!("Read project metadata from {}", file.display()))?;
    }

    let settings = build_settings(&args, &project)?;
    config.section(&format!("Bundling layer for {}", settings.project_name()))?;
    config.verbose_println(&format!("Source: {}", settings.source_dir().display()))?;
    config.verbose_println(&format!("Workspace: {}", settings.workspace_dir().display()))?;
    config.verbose_println(&format!("Output: {}", settings.output_path().display()))?;

    let python = resolve_python(settings.python())?;
    let pip = pip_version(&python).await?;
    config.verbose_println(&pip)?;

    let lock = RunLock::acquire(settings.workspace_dir())?;
    config.verbose_println(&format!("Holding {}", lock.path().display()))?;

    let toolchain = Pip::from_settings(&settings, python);
    let mut pipeline = Pipeline::new(settings, toolchain);
    for stage in pipeline.planned_stages() {
        config.verbose_println(&format!("Planned stage: {stage}"))?;
    }

    config.progress(&format!(
        "Running {} stages",
        pipeline.planned_stages().len()
    ))?;
    let report = pipeline.run().await?;
    drop(lock);

    let limit_report = if args.check_limits {
        let limits = LayerLimits {
            max_zipped_bytes: args.max_zipped_mib.saturating_mul(MIB),
            max_unzipped_bytes: args.max_unzipped_mib.saturating_mul(MIB),
        };
        config.progress("Checking layer size limits")?;
        Some(limits::check_archive(&report.archive.path, limits).await?)
    } else {
        None
    };

    if args.json {
        let summary = RunSummary {
            report: &report,
            limits: limit_report.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&config, &report, limit_report.as_ref())?;
    }

    match limit_report {
        Some(limit_report) if !limit_report.is_within_limits() => {
            Err(BundlerError::LimitsExceeded(limit_report.violations))
        }
        _ => Ok(0),
    }
}

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    report: &'a PipelineReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<&'a LimitReport>,
}

/// Merges command line arguments over the project's `[tool.kodegen-layer]`
/// table into validated [`Settings`].
fn build_settings(args: &Args, project: &ProjectMetadata) -> Result<Settings> {
    let layer = &project.layer_config;

    let name = args
        .project_name
        .clone()
        .or_else(|| project.name.clone())
        .ok_or_else(|| CliError::MissingArgument {
            argument: "--project-name (no static name in pyproject.toml or setup.cfg)"
                .to_string(),
        })?;

    let mut package = PackageSettings::new(name.trim());
    if let Some(version) = &project.version {
        package = package.with_version(version.clone());
    }

    let mut builder = SettingsBuilder::new()
        .source_dir(&args.source)
        .package_settings(package)
        .frontend(args.frontend.or(layer.frontend).unwrap_or_default())
        .target_platform(target_platform(args, layer))
        .pip_args(if args.pip_args.is_empty() {
            layer.pip_args.clone()
        } else {
            args.pip_args.clone()
        })
        .keep_workspace(args.keep_workspace)
        .skip_reconcile(args.skip_reconcile || layer.skip_reconcile.unwrap_or(false));

    if let Some(workspace) = pick_path(&args.workspace, &layer.workspace, &args.source) {
        builder = builder.workspace_dir(workspace);
    }
    if let Some(output) = pick_path(&args.output, &layer.output, &args.source) {
        builder = builder.output_path(output);
    }
    if let Some(dist_dir) = &args.dist_dir {
        builder = builder.dist_dir(dist_dir);
    }
    if let Some(python) = args
        .python
        .clone()
        .or_else(|| layer.python.as_deref().map(|p| config_python(p, &args.source)))
    {
        builder = builder.python(python);
    }
    if let Some(prefix) = args.layer_prefix.as_ref().or(layer.layer_prefix.as_ref()) {
        builder = builder.layer_prefix(prefix);
    }
    if let Some(secs) = args.stage_timeout {
        builder = builder.stage_timeout(Duration::from_secs(secs));
    }

    builder.build().map_err(|e| {
        BundlerError::from(CliError::InvalidArguments {
            reason: e.to_string(),
        })
    })
}

fn target_platform(args: &Args, layer: &LayerConfig) -> TargetPlatform {
    TargetPlatform {
        platforms: if args.platforms.is_empty() {
            layer.platforms.clone()
        } else {
            args.platforms.clone()
        },
        python_version: args
            .python_version
            .clone()
            .or_else(|| layer.python_version.clone()),
        implementation: args
            .implementation
            .clone()
            .or_else(|| layer.implementation.clone()),
    }
}

/// Command line paths are relative to the current directory, config paths
/// to the source tree.
fn pick_path(cli: &Option<PathBuf>, config: &Option<PathBuf>, source: &Path) -> Option<PathBuf> {
    match (cli, config) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(path)) => Some(source.join(path)),
        (None, None) => None,
    }
}

/// A bare interpreter name from the config is looked up in `PATH`; anything
/// with a directory component is relative to the source tree.
fn config_python(python: &Path, source: &Path) -> PathBuf {
    if python.components().count() > 1 {
        source.join(python)
    } else {
        python.to_path_buf()
    }
}

fn print_report(
    config: &RuntimeConfig,
    report: &PipelineReport,
    limit_report: Option<&LimitReport>,
) -> std::io::Result<()> {
    config.success(&format!(
        "Layer archive written: {}",
        report.archive.path.display()
    ))?;
    config.indent(&format!("Distribution: {}", report.unit.file_name()))?;
    if let Some(version) = &report.version {
        config.indent(&format!("Version: {version}"))?;
    }
    config.indent(&format!(
        "Files: {} ({} bytes zipped)",
        report.archive.files, report.archive.bytes
    ))?;
    config.indent(&format!("SHA-256: {}", report.archive.sha256))?;
    config.verbose_println(&format!("Tree digest: {}", report.tree_digest))?;

    for record in &report.stages {
        config.verbose_println(&format!("{}: {} ms", record.stage, record.duration_ms))?;
    }

    match &report.reconcile {
        Some(outcome) if outcome.replaced_existing => {
            config.success("Replaced the installed copy in the active environment")?
        }
        Some(_) => config.success("Installed into the active environment")?,
        None => config.indent("Active environment left unchanged")?,
    }

    if report.workspace_kept {
        config.indent(&format!("Workspace kept at {}", report.workspace.display()))?;
    }

    if let Some(limit_report) = limit_report {
        if limit_report.is_within_limits() {
            config.success(&format!(
                "Within platform limits ({} bytes unzipped in {} entries)",
                limit_report.unzipped_bytes, limit_report.entries
            ))?;
        } else {
            for violation in &limit_report.violations {
                config.warn(violation)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn command_line_paths_win_over_config() {
        let source = Path::new("/src/mylib");
        assert_eq!(
            pick_path(&Some("out.zip".into()), &Some("cfg.zip".into()), source),
            Some(PathBuf::from("out.zip"))
        );
        assert_eq!(
            pick_path(&None, &Some("build/cfg.zip".into()), source),
            Some(PathBuf::from("/src/mylib/build/cfg.zip"))
        );
        assert_eq!(pick_path(&None, &None, source), None);
    }

    #[test]
    fn config_python_keeps_bare_names() {
        let source = Path::new("/src/mylib");
        assert_eq!(config_python(Path::new("python3.12"), source), PathBuf::from("python3.12"));
        assert_eq!(
            config_python(Path::new(".venv/bin/python"), source),
            PathBuf::from("/src/mylib/.venv/bin/python")
        );
    }

    #[test]
    fn target_platform_prefers_command_line() {
        let args = Args::try_parse_from([
            "kodegen_bundler_layer",
            "--python-version",
            "3.11",
        ])
        .expect("valid arguments");
        let layer = LayerConfig {
            platforms: vec!["manylinux2014_x86_64".into()],
            python_version: Some("3.12".into()),
            ..Default::default()
        };

        let target = target_platform(&args, &layer);
        assert_eq!(target.platforms, ["manylinux2014_x86_64"]);
        assert_eq!(target.python_version.as_deref(), Some("3.11"));
        assert!(target.implementation.is_none());
    }

    #[test]
    fn missing_name_is_a_missing_argument() {
        let args = Args::try_parse_from(["kodegen_bundler_layer"]).expect("valid arguments");
        let error = build_settings(&args, &ProjectMetadata::default()).expect_err("no name");

        assert!(matches!(
            error,
            BundlerError::Cli(CliError::MissingArgument { .. })
        ));
        assert_eq!(error.exit_code(), 2);
    }
}
