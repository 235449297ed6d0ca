//! Pipeline orchestration and coordination.
//!
//! This module provides the [`Pipeline`] orchestrator, which runs the layer
//! build as a strict sequence of stages:
//!
//! ```text
//! Clean → Build → Materialize → Archive → Reconcile → Done
//!   │       │          │           │          │
//!   └───────┴──────────┴───────────┴──────────┴──→ Failed(stage)
//! ```
//!
//! A stage only starts after the previous one succeeded. The first failure
//! ends the run: no later stage executes, no archive is left at the output
//! path, and unless the failing stage is Reconcile itself the active
//! environment is exactly as it was before the run.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_layer::bundler::{PackageSettings, Pip, Pipeline, SettingsBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsBuilder::new()
//!     .source_dir("mylib")
//!     .package_settings(PackageSettings::new("mylib"))
//!     .build()?;
//!
//! let pip = Pip::from_settings(&settings, "/usr/bin/python3");
//! let report = Pipeline::new(settings, pip).run().await?;
//!
//! println!("Created: {} ({} bytes)", report.archive.path.display(), report.archive.bytes);
//! println!("SHA256: {}", report.archive.sha256);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 of archives and materialized trees
//! - [`orchestrator`] - the [`Pipeline`] state machine
//! - [`stage`] - [`Stage`], [`PipelineState`] and [`StageRecord`]
//! - [`tool_detection`] - Python interpreter lookup

pub mod checksum;
pub mod orchestrator;
pub mod stage;
pub mod tool_detection;

pub use orchestrator::{Pipeline, PipelineFailure, PipelineReport};
pub use stage::{PipelineState, Stage, StageRecord};
