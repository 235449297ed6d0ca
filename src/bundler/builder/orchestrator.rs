//! Main pipeline orchestration.
//!
//! This module provides the [`Pipeline`] that sequences the workspace,
//! build, install, archive and reconcile stages for one run.

use super::{
    checksum::tree_digest,
    stage::{PipelineState, Stage, StageRecord},
};
use crate::bundler::{
    archive::{ArchiveSummary, archive_directory},
    artifact::{DistributableUnit, build_distribution},
    error::{Error, ErrorExt, Result},
    materialize::materialize,
    reconcile::{ReconcileOutcome, reconcile},
    settings::Settings,
    toolchain::Toolchain,
    workspace::Workspace,
};
use chrono::{DateTime, Utc};
use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// Outcome of a successful run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineReport {
    /// Project name
    pub project: String,
    /// Declared or wheel version
    pub version: Option<String>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// The distribution that was packaged and installed
    pub unit: DistributableUnit,
    /// The archive that was written
    pub archive: ArchiveSummary,
    /// SHA-256 over the materialized tree's relative paths and contents
    pub tree_digest: String,
    /// What reconciliation did; `None` if the stage was skipped
    pub reconcile: Option<ReconcileOutcome>,
    /// Every completed stage, in order
    pub stages: Vec<StageRecord>,
    /// Workspace path
    pub workspace: PathBuf,
    /// True if the workspace was left on disk
    pub workspace_kept: bool,
}

/// A run that ended in [`PipelineState::Failed`].
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineFailure {
    /// The stage that failed
    pub stage: Stage,
    /// Why it failed
    #[source]
    pub source: Error,
    /// Stages that completed before the failure
    pub completed: Vec<StageRecord>,
}

impl PipelineFailure {
    /// Returns true if the active environment was not modified by the run.
    pub fn environment_untouched(&self) -> bool {
        self.stage != Stage::Reconcile
    }
}

/// Layer build pipeline.
///
/// Owns the settings and the collaborators for one or more runs. Runs are
/// independent: each starts from a wiped workspace.
pub struct Pipeline<T> {
    settings: Settings,
    toolchain: T,
    state: PipelineState,
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Toolchain> Pipeline<T> {
    /// Creates a pipeline in the [`PipelineState::Pending`] state.
    pub fn new(settings: Settings, toolchain: T) -> Self {
        Self {
            settings,
            toolchain,
            state: PipelineState::Pending,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the collaborators.
    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Returns the state of the current or last run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the stages a run executes, in order.
    ///
    /// Reconcile is omitted when the settings disable it.
    pub fn planned_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| *stage != Stage::Reconcile || self.settings.reconcile())
            .collect()
    }

    /// Executes every stage in order.
    ///
    /// The workspace is removed afterwards, on success and on failure,
    /// unless the settings keep it. A cleanup failure is logged and never
    /// changes the result.
    pub async fn run(&mut self) -> std::result::Result<PipelineReport, PipelineFailure> {
        let started_at = Utc::now();
        let mut records = Vec::new();
        let mut workspace = None;

        let result = self.execute(started_at, &mut records, &mut workspace).await;

        if let Some(workspace) = workspace {
            if self.settings.keep_workspace() {
                log::info!("Keeping workspace at {}", workspace.root().display());
            } else if let Err(e) = workspace.cleanup().await {
                log::warn!("Failed to clean up workspace: {}", e);
            }
        }

        match &result {
            Ok(_) => log::info!("✓ Pipeline done"),
            Err(failure) => log::error!("Pipeline failed: {}", failure),
        }
        result
    }

    async fn execute(
        &mut self,
        started_at: DateTime<Utc>,
        records: &mut Vec<StageRecord>,
        workspace_slot: &mut Option<Workspace>,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        let Self {
            settings,
            toolchain,
            state,
        } = self;
        let (settings, toolchain) = (&*settings, &*toolchain);
        let limit = settings.stage_timeout();
        let project = settings.project_name();

        let workspace = run_stage(state, records, limit, Stage::Clean, async {
            let workspace = Workspace::prepare(settings.workspace_dir()).await?;
            if !settings.dist_in_workspace() {
                tokio::fs::create_dir_all(settings.dist_dir())
                    .await
                    .fs_context("creating dist directory", settings.dist_dir())?;
            }
            remove_stale_archive(settings.output_path()).await?;
            Ok::<_, Error>(workspace)
        })
        .await?;
        *workspace_slot = Some(workspace.clone());

        let unit = run_stage(
            state,
            records,
            limit,
            Stage::Build,
            build_distribution(toolchain, settings.source_dir(), settings.dist_dir(), project),
        )
        .await?;

        let install_dir = workspace.install_dir(settings.layer_prefix());
        let digest = run_stage(state, records, limit, Stage::Materialize, async {
            materialize(toolchain, &unit, &install_dir).await?;
            tree_digest(&workspace.target_dir()).await
        })
        .await?;

        let archive = run_stage(
            state,
            records,
            limit,
            Stage::Archive,
            archive_directory(&workspace.target_dir(), settings.output_path()),
        )
        .await?;

        let reconciled = if settings.reconcile() {
            Some(
                run_stage(
                    state,
                    records,
                    limit,
                    Stage::Reconcile,
                    reconcile(toolchain, project, &unit),
                )
                .await?,
            )
        } else {
            log::info!("Skipping reconcile; the active environment is left unchanged");
            None
        };

        *state = PipelineState::Done;

        Ok(PipelineReport {
            project: project.to_string(),
            version: settings
                .package()
                .version
                .clone()
                .or_else(|| unit.version().map(String::from)),
            started_at,
            unit,
            archive,
            tree_digest: digest,
            reconcile: reconciled,
            stages: records.clone(),
            workspace: workspace.root().to_path_buf(),
            workspace_kept: settings.keep_workspace(),
        })
    }
}

/// Runs one stage, recording its duration or turning its error into a
/// [`PipelineFailure`].
async fn run_stage<F, R>(
    state: &mut PipelineState,
    records: &mut Vec<StageRecord>,
    limit: Option<Duration>,
    stage: Stage,
    work: F,
) -> std::result::Result<R, PipelineFailure>
where
    F: Future<Output = Result<R>>,
{
    *state = PipelineState::Running(stage);
    log::info!("▶ Stage {}", stage);
    let started = Instant::now();

    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout {
                    operation: format!("{stage} stage"),
                    after: limit,
                })
            }),
        None => work.await,
    };

    match result {
        Ok(value) => {
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            log::debug!("Stage {} finished in {} ms", stage, duration_ms);
            records.push(StageRecord { stage, duration_ms });
            Ok(value)
        }
        Err(source) => {
            *state = PipelineState::Failed(stage);
            Err(PipelineFailure {
                stage,
                source,
                completed: records.clone(),
            })
        }
    }
}

/// Removes an archive left at `output` by an earlier run.
///
/// Only regular files and symlinks are removed; a directory at the output
/// path is reported instead of being deleted.
async fn remove_stale_archive(output: &Path) -> Result<()> {
    let metadata = match tokio::fs::symlink_metadata(output).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).fs_context("inspecting output path", output),
    };

    if metadata.is_dir() {
        return Err(Error::GenericError(format!(
            "output path {} is a directory",
            output.display()
        )));
    }

    tokio::fs::remove_file(output)
        .await
        .fs_context("removing stale archive", output)?;
    log::info!("Removed stale archive {}", output.display());
    Ok(())
}
