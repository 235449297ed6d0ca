//! Shared test helpers for pipeline integration tests.

#![allow(dead_code)]

use kodegen_bundler_layer::bundler::{
    ActiveEnvironment, BuildBackend, Error, PackageSettings, Result, SettingsBuilder,
    TargetInstaller,
};
use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tempfile::TempDir;

pub const WHEEL: &str = "mylib-1.0.0-py3-none-any.whl";

/// What the fake installer does when asked to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Writes the project and one dependency.
    Files,
    /// Succeeds without writing anything.
    Empty,
    /// Fails as if the constraints were unsatisfiable.
    Unresolvable,
    /// Fails while writing into the target directory.
    IoFailure,
}

/// In-process stand-in for `pip`.
///
/// Every collaborator call is recorded by name so tests can assert ordering
/// and which stages touched the environment.
pub struct FakeToolchain {
    pub wheels: Vec<String>,
    pub build_delay: Option<Duration>,
    pub build_fails: bool,
    pub install_outcome: InstallOutcome,
    /// Extra file content written as `mylib/payload.bin`
    pub payload: Option<Vec<u8>>,
    pub env_install_fails: bool,
    pub uninstall_fails: bool,
    pub installed: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self {
            wheels: vec![WHEEL.to_string()],
            build_delay: None,
            build_fails: false,
            install_outcome: InstallOutcome::Files,
            payload: None,
            env_install_fails: false,
            uninstall_fails: false,
            installed: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeToolchain {
    pub fn with_wheels(wheels: &[&str]) -> Self {
        Self {
            wheels: wheels.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c == name)
    }

    pub fn is_installed_now(&self) -> bool {
        *self.installed.lock().unwrap()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

impl BuildBackend for FakeToolchain {
    async fn build_distribution(&self, _source_dir: &Path, dist_dir: &Path) -> Result<()> {
        self.record("build");
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        if self.build_fails {
            return Err(Error::Build {
                command: "python -m pip wheel --no-deps".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "error: invalid command 'bdist_wheel'".to_string(),
            });
        }
        for wheel in &self.wheels {
            std::fs::write(dist_dir.join(wheel), b"PK fake wheel").unwrap();
        }
        Ok(())
    }
}

impl TargetInstaller for FakeToolchain {
    async fn install_into(&self, unit: &Path, target_dir: &Path) -> Result<()> {
        self.record("install_into");
        match self.install_outcome {
            InstallOutcome::Files => {
                write_file(target_dir, "mylib/__init__.py", "__version__ = '1.0.0'\n");
                write_file(target_dir, "mylib-1.0.0.dist-info/METADATA", "Name: mylib\n");
                write_file(target_dir, "dateutil/__init__.py", "# dependency\n");
                write_file(target_dir, "dateutil/parser.py", "def parse(s):\n    return s\n");
                if let Some(payload) = &self.payload {
                    std::fs::write(target_dir.join("mylib/payload.bin"), payload).unwrap();
                }
                Ok(())
            }
            InstallOutcome::Empty => Ok(()),
            InstallOutcome::IoFailure => Err(Error::Install {
                unit: unit.to_path_buf(),
                target: target_dir.to_path_buf(),
                reason: "No space left on device (os error 28)".to_string(),
            }),
            InstallOutcome::Unresolvable => Err(Error::DependencyResolution {
                unit: unit.to_path_buf(),
                stderr: "ERROR: ResolutionImpossible: conflicting dependencies".to_string(),
            }),
        }
    }
}

impl ActiveEnvironment for FakeToolchain {
    async fn is_installed(&self, _project: &str) -> Result<bool> {
        self.record("is_installed");
        Ok(self.is_installed_now())
    }

    async fn uninstall(&self, _project: &str) -> Result<()> {
        self.record("uninstall");
        if self.uninstall_fails {
            return Err(Error::GenericError("permission denied".to_string()));
        }
        *self.installed.lock().unwrap() = false;
        Ok(())
    }

    async fn install(&self, _unit: &Path) -> Result<()> {
        self.record("install");
        if self.env_install_fails {
            return Err(Error::GenericError("index unreachable".to_string()));
        }
        *self.installed.lock().unwrap() = true;
        Ok(())
    }
}

/// A temporary project tree with workspace and output paths beside it.
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "src/mylib/__init__.py", "__version__ = '1.0.0'\n");
        write_file(
            temp.path(),
            "src/pyproject.toml",
            "[project]\nname = \"mylib\"\nversion = \"1.0.0\"\n",
        );
        Self { temp }
    }

    pub fn source(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    pub fn workspace(&self) -> PathBuf {
        self.temp.path().join("ws")
    }

    pub fn output(&self) -> PathBuf {
        self.temp.path().join("out").join("mylib-layer.zip")
    }

    /// Settings builder pointing at this fixture's paths.
    pub fn settings(&self) -> SettingsBuilder {
        SettingsBuilder::new()
            .source_dir(self.source())
            .package_settings(PackageSettings::new("mylib").with_version("1.0.0"))
            .workspace_dir(self.workspace())
            .output_path(self.output())
    }
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Sorted entry names of a zip archive.
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

/// Content of one archive entry.
pub fn archive_entry(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

/// Deterministic, effectively incompressible bytes.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// Names of the entries in `dir`; empty if it does not exist.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// True once `dir` holds a `.partial` file.
pub fn has_partial(dir: &Path) -> bool {
    dir_entries(dir).iter().any(|name| name.ends_with(".partial"))
}

/// Waits for a cancelled archive writer to clean up after itself, returning
/// whatever is still left in `dir`.
pub async fn settled_entries(dir: &Path) -> Vec<String> {
    for _ in 0..200 {
        let left = dir_entries(dir);
        if left.is_empty() {
            return left;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    dir_entries(dir)
}
