//! `pip`-backed collaborators.

use super::{ActiveEnvironment, BuildBackend, TargetInstaller};
use crate::bundler::{
    error::{Error, Result},
    settings::{BuildFrontend, Settings, TargetPlatform},
    utils::process::{self, CommandLine, CommandOutput},
};
use std::path::{Path, PathBuf};

/// Installer messages that mean the constraints cannot be met, as opposed to
/// an I/O or build failure.
const RESOLUTION_MARKERS: &[&str] = &[
    "ResolutionImpossible",
    "No matching distribution found",
    "Could not find a version that satisfies",
    "conflicting dependencies",
    "requires a different Python",
];

/// Collaborators implemented with `python -m pip` (and optionally
/// `python -m build`).
#[derive(Debug, Clone)]
pub struct Pip {
    python: PathBuf,
    frontend: BuildFrontend,
    target_platform: TargetPlatform,
    pip_args: Vec<String>,
}

impl Pip {
    /// Creates collaborators using `python` with default options.
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            frontend: BuildFrontend::default(),
            target_platform: TargetPlatform::default(),
            pip_args: Vec::new(),
        }
    }

    /// Creates collaborators configured from `settings`, using the given
    /// resolved interpreter.
    pub fn from_settings(settings: &Settings, python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            frontend: settings.frontend(),
            target_platform: settings.target_platform().clone(),
            pip_args: settings.pip_args().to_vec(),
        }
    }

    fn python_module(&self, module: &str) -> CommandLine {
        CommandLine::new(&self.python)
            .arg("-m")
            .arg(module)
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
            .env("PIP_NO_INPUT", "1")
    }

    /// Command that builds the wheel.
    pub fn build_command(&self, source_dir: &Path, dist_dir: &Path) -> CommandLine {
        match self.frontend {
            BuildFrontend::Pip => self
                .python_module("pip")
                .args(["wheel", "--no-deps", "--wheel-dir"])
                .arg(dist_dir)
                .arg(source_dir),
            BuildFrontend::Build => self
                .python_module("build")
                .args(["--wheel", "--outdir"])
                .arg(dist_dir)
                .arg(source_dir),
        }
    }

    /// Command that installs the wheel and its closure into `target_dir`.
    pub fn target_install_command(&self, unit: &Path, target_dir: &Path) -> CommandLine {
        let mut command = self
            .python_module("pip")
            // A user-level `user = true` pip config conflicts with --target
            .env("PIP_USER", "0")
            .args(["install", "--no-compile", "--ignore-installed", "--target"])
            .arg(target_dir);

        let target = &self.target_platform;
        for platform in &target.platforms {
            command = command.arg("--platform").arg(platform);
        }
        if let Some(version) = &target.python_version {
            command = command.arg("--python-version").arg(version);
        }
        if let Some(implementation) = &target.implementation {
            command = command.arg("--implementation").arg(implementation);
        }
        if target.is_cross() {
            command = command.arg("--only-binary=:all:");
        }

        command.args(&self.pip_args).arg(unit)
    }

    /// Command that checks whether `project` is installed.
    pub fn show_command(&self, project: &str) -> CommandLine {
        self.python_module("pip").args(["show", "--quiet", project])
    }

    /// Command that removes `project` from the active environment.
    pub fn uninstall_command(&self, project: &str) -> CommandLine {
        self.python_module("pip").args(["uninstall", "--yes", project])
    }

    /// Command that installs `unit` into the active environment.
    pub fn install_command(&self, unit: &Path) -> CommandLine {
        self.python_module("pip")
            .arg("install")
            .args(&self.pip_args)
            .arg(unit)
    }
}

/// Classifies a failed isolated install.
pub(crate) fn classify_install_failure(
    unit: &Path,
    target_dir: &Path,
    output: &CommandOutput,
) -> Error {
    if RESOLUTION_MARKERS
        .iter()
        .any(|marker| output.stderr.contains(marker))
    {
        Error::DependencyResolution {
            unit: unit.to_path_buf(),
            stderr: output.stderr.clone(),
        }
    } else {
        let last_line = output
            .stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or_default();
        Error::Install {
            unit: unit.to_path_buf(),
            target: target_dir.to_path_buf(),
            reason: format!("pip {}: {}", output.status_description(), last_line.trim()),
        }
    }
}

fn failure_reason(command: &CommandLine, output: &CommandOutput) -> String {
    format!(
        "`{}` failed with {}: {}",
        command,
        output.status_description(),
        output.stderr.trim()
    )
}

impl BuildBackend for Pip {
    async fn build_distribution(&self, source_dir: &Path, dist_dir: &Path) -> Result<()> {
        let command = self.build_command(source_dir, dist_dir);
        let output = process::run(&command).await?;

        if !output.status.success() {
            return Err(Error::Build {
                command: command.to_string(),
                status: output.status_description(),
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

impl TargetInstaller for Pip {
    async fn install_into(&self, unit: &Path, target_dir: &Path) -> Result<()> {
        let command = self.target_install_command(unit, target_dir);
        let output = process::run(&command).await?;

        if !output.status.success() {
            return Err(classify_install_failure(unit, target_dir, &output));
        }
        Ok(())
    }
}

impl ActiveEnvironment for Pip {
    async fn is_installed(&self, project: &str) -> Result<bool> {
        // `pip show` exits non-zero when the package is absent
        let output = process::run(&self.show_command(project)).await?;
        Ok(output.status.success())
    }

    async fn uninstall(&self, project: &str) -> Result<()> {
        let command = self.uninstall_command(project);
        let output = process::run(&command).await?;

        if !output.status.success() {
            return Err(Error::GenericError(failure_reason(&command, &output)));
        }
        Ok(())
    }

    async fn install(&self, unit: &Path) -> Result<()> {
        let command = self.install_command(unit);
        let output = process::run(&command).await?;

        if !output.status.success() {
            return Err(Error::GenericError(failure_reason(&command, &output)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pip() -> Pip {
        Pip::new("/usr/bin/python3")
    }

    #[test]
    fn build_command_uses_pip_wheel_without_deps() {
        let command = pip().build_command(Path::new("/src/mylib"), Path::new("/ws/dist"));

        assert_eq!(command.program, PathBuf::from("/usr/bin/python3"));
        assert_eq!(
            command.arg_strings(),
            ["-m", "pip", "wheel", "--no-deps", "--wheel-dir", "/ws/dist", "/src/mylib"]
        );
    }

    #[test]
    fn build_frontend_switches_to_python_build() {
        let mut pip = pip();
        pip.frontend = BuildFrontend::Build;
        let command = pip.build_command(Path::new("/src/mylib"), Path::new("/ws/dist"));

        assert_eq!(
            command.arg_strings(),
            ["-m", "build", "--wheel", "--outdir", "/ws/dist", "/src/mylib"]
        );
    }

    #[test]
    fn target_install_is_isolated() {
        let command = pip().target_install_command(
            Path::new("/ws/dist/mylib-1.0-py3-none-any.whl"),
            Path::new("/ws/target"),
        );
        let args = command.arg_strings();

        assert!(args.windows(2).any(|w| w == ["--target", "/ws/target"]));
        assert!(args.contains(&"--ignore-installed".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--platform")));
        assert_eq!(
            args.last().map(String::as_str),
            Some("/ws/dist/mylib-1.0-py3-none-any.whl")
        );
        assert!(command.envs.contains(&("PIP_USER".to_string(), "0".to_string())));
    }

    #[test]
    fn cross_target_install_requires_binary_wheels() {
        let mut pip = pip();
        pip.target_platform = TargetPlatform {
            platforms: vec!["manylinux2014_x86_64".into(), "manylinux_2_28_x86_64".into()],
            python_version: Some("3.12".into()),
            implementation: Some("cp".into()),
        };
        pip.pip_args = vec!["--index-url".into(), "https://mirror.example/simple".into()];

        let args = pip
            .target_install_command(Path::new("unit.whl"), Path::new("target"))
            .arg_strings();

        assert!(args.windows(2).any(|w| w == ["--platform", "manylinux2014_x86_64"]));
        assert!(args.windows(2).any(|w| w == ["--platform", "manylinux_2_28_x86_64"]));
        assert!(args.windows(2).any(|w| w == ["--python-version", "3.12"]));
        assert!(args.windows(2).any(|w| w == ["--implementation", "cp"]));
        assert!(args.contains(&"--only-binary=:all:".to_string()));
        assert!(
            args.windows(2)
                .any(|w| w == ["--index-url", "https://mirror.example/simple"])
        );
        assert_eq!(args.last().map(String::as_str), Some("unit.whl"));
    }

    #[test]
    fn environment_commands_target_the_project() {
        let pip = pip();

        assert_eq!(
            pip.show_command("mylib").arg_strings(),
            ["-m", "pip", "show", "--quiet", "mylib"]
        );
        assert_eq!(
            pip.uninstall_command("mylib").arg_strings(),
            ["-m", "pip", "uninstall", "--yes", "mylib"]
        );
        assert_eq!(
            pip.install_command(Path::new("mylib.whl")).arg_strings(),
            ["-m", "pip", "install", "mylib.whl"]
        );
    }

    #[cfg(unix)]
    fn output(code: i32, stderr: &str) -> CommandOutput {
        use std::os::unix::process::ExitStatusExt;

        CommandOutput {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn unsatisfiable_constraints_are_resolution_errors() {
        let failure = output(
            1,
            "ERROR: Could not find a version that satisfies the requirement foo>=99\n\
             ERROR: No matching distribution found for foo>=99\n",
        );

        let error = classify_install_failure(Path::new("u.whl"), Path::new("t"), &failure);
        assert!(matches!(error, Error::DependencyResolution { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn other_install_failures_are_install_errors() {
        let failure = output(
            1,
            "ERROR: Could not install packages due to an OSError: [Errno 28] No space left on device\n",
        );

        match classify_install_failure(Path::new("u.whl"), Path::new("t"), &failure) {
            Error::Install { reason, .. } => {
                assert!(reason.contains("exit code 1"));
                assert!(reason.contains("No space left on device"));
            }
            other => panic!("expected install error, got {other:?}"),
        }
    }
}
