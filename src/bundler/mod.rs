//! Layer archive bundling.
//!
//! Turns a Python source tree into a dependency-complete zip for a function
//! platform layer, then brings the caller's environment up to date with the
//! freshly built distribution.
//!
//! The stages, in order:
//!
//! 1. [`workspace`] - reset the pipeline-owned workspace
//! 2. [`artifact`] - build the wheel and select exactly one
//! 3. [`materialize`] - install it with its closure into the workspace
//! 4. [`archive`] - zip the installed tree
//! 5. [`reconcile`] - replace the installation in the active environment
//!
//! [`Pipeline`] sequences them; [`toolchain`] holds the collaborator seams
//! and their `pip` implementation.

pub mod archive;
pub mod artifact;
pub mod builder;
pub mod error;
pub mod limits;
pub mod materialize;
pub mod reconcile;
pub mod settings;
pub mod toolchain;
pub mod utils;
pub mod workspace;

pub use archive::ArchiveSummary;
pub use artifact::DistributableUnit;
pub use builder::{Pipeline, PipelineFailure, PipelineReport, PipelineState, Stage, StageRecord};
pub use error::{Error, Result};
pub use limits::{LayerLimits, LimitReport};
pub use reconcile::ReconcileOutcome;
pub use settings::{BuildFrontend, PackageSettings, Settings, SettingsBuilder, TargetPlatform};
pub use toolchain::{ActiveEnvironment, BuildBackend, Pip, TargetInstaller, Toolchain};
pub use workspace::Workspace;
