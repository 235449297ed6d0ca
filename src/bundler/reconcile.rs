//! Active environment reconciliation.
//!
//! Runs last, after the archive exists. The project is removed from the
//! caller's environment if present and the fresh distribution is installed,
//! so the environment ends in the same state whether or not an earlier build
//! was installed.

use crate::bundler::{
    artifact::DistributableUnit,
    error::{Error, Result},
    toolchain::ActiveEnvironment,
};

/// What reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileOutcome {
    /// True if a prior installation was removed before installing.
    pub replaced_existing: bool,
}

/// Replaces any installed copy of `project` with `unit`.
///
/// Finding nothing to remove is not an error.
///
/// # Errors
///
/// [`Error::Reconciliation`] if an existing installation cannot be
/// inspected or removed, or if the fresh install fails. The environment may
/// be left without the project in that case.
pub async fn reconcile<E: ActiveEnvironment>(
    env: &E,
    project: &str,
    unit: &DistributableUnit,
) -> Result<ReconcileOutcome> {
    let failed = |reason: String| Error::Reconciliation {
        project: project.to_string(),
        reason,
    };

    let installed = env
        .is_installed(project)
        .await
        .map_err(|e| failed(format!("checking for an existing installation: {e}")))?;

    if installed {
        log::info!("Removing installed `{}` from the active environment", project);
        env.uninstall(project)
            .await
            .map_err(|e| failed(format!("removing the existing installation: {e}")))?;
    } else {
        log::debug!("`{}` is not installed, nothing to remove", project);
    }

    log::info!("Installing {} into the active environment", unit.file_name());
    env.install(unit.path())
        .await
        .map_err(|e| failed(format!("installing {}: {e}", unit.file_name())))?;

    log::info!("✓ Active environment now has {}", unit.file_name());
    Ok(ReconcileOutcome {
        replaced_existing: installed,
    })
}
