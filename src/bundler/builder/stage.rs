//! Pipeline stages and run state.

use serde::Serialize;
use std::fmt;

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reset the workspace and drop a stale archive.
    Clean,
    /// Build the distribution and select it.
    Build,
    /// Install the distribution and its closure into the workspace.
    Materialize,
    /// Write the layer archive.
    Archive,
    /// Replace the installation in the active environment.
    Reconcile,
}

impl Stage {
    /// Every stage, in order.
    pub const ALL: [Stage; 5] = [
        Stage::Clean,
        Stage::Build,
        Stage::Materialize,
        Stage::Archive,
        Stage::Reconcile,
    ];

    /// Returns the lowercase stage name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Build => "build",
            Stage::Materialize => "materialize",
            Stage::Archive => "archive",
            Stage::Reconcile => "reconcile",
        }
    }

    /// Process exit code reported when this stage fails.
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Clean => 10,
            Stage::Build => 11,
            Stage::Materialize => 12,
            Stage::Archive => 13,
            Stage::Reconcile => 14,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "stage")]
pub enum PipelineState {
    /// Not started.
    Pending,
    /// Executing the given stage.
    Running(Stage),
    /// Every stage succeeded.
    Done,
    /// The given stage failed; later stages never ran.
    Failed(Stage),
}

impl PipelineState {
    /// Returns true for [`Done`](Self::Done) and [`Failed`](Self::Failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// A completed stage and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// The stage
    pub stage: Stage,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}
