//! Build frontend selection and cross-target install options.

use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Tool used to turn the source tree into a wheel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFrontend {
    /// `python -m pip wheel --no-deps`
    #[default]
    Pip,
    /// `python -m build --wheel` (requires the `build` package)
    Build,
}

impl fmt::Display for BuildFrontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pip => f.write_str("pip"),
            Self::Build => f.write_str("build"),
        }
    }
}

impl FromStr for BuildFrontend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pip" => Ok(Self::Pip),
            "build" => Ok(Self::Build),
            other => Err(format!(
                "unknown build frontend `{other}`, expected `pip` or `build`"
            )),
        }
    }
}

/// Interpreter and platform the layer is installed for.
///
/// When the function platform runs a different OS or architecture than the
/// build host, the isolated install has to fetch wheels for the platform
/// instead of the host. Setting any platform tag switches the installer to
/// binary-only mode, since source builds would target the host.
///
/// # Examples
///
/// ```
/// use kodegen_bundler_layer::bundler::TargetPlatform;
///
/// let target = TargetPlatform {
///     platforms: vec!["manylinux2014_x86_64".into()],
///     python_version: Some("3.12".into()),
///     implementation: Some("cp".into()),
/// };
/// assert!(target.is_cross());
/// assert!(!TargetPlatform::default().is_cross());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetPlatform {
    /// Platform tags, e.g. `manylinux2014_x86_64`.
    pub platforms: Vec<String>,

    /// Python version, e.g. `3.12`.
    pub python_version: Option<String>,

    /// Python implementation tag, e.g. `cp`.
    pub implementation: Option<String>,
}

impl TargetPlatform {
    /// Returns true if installs must target something other than the host.
    pub fn is_cross(&self) -> bool {
        !self.platforms.is_empty() || self.python_version.is_some() || self.implementation.is_some()
    }
}
