//! Configuration structures for layer bundling.
//!
//! [`Settings`] is the validated configuration every pipeline stage reads.
//! It is constructed through [`SettingsBuilder`], which fills in defaults,
//! absolutizes paths and rejects layouts that would make the destructive
//! workspace reset touch user data.

mod builder;
mod core;
mod package;
mod target;

pub use builder::{DEFAULT_WORKSPACE_DIR, SettingsBuilder};
pub use core::Settings;
pub use package::{PackageSettings, normalize_distribution_name};
pub use target::{BuildFrontend, TargetPlatform};
