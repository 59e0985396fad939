//! Working trees and the transient clone directory.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::utils::io;

/// A local checkout of one external project.
#[derive(Debug, Clone)]
pub struct WorkingTree {
    pub name: String,
    pub path: PathBuf,
    pub remote_url: Option<String>,
    pub branch: String,
    pub token: Option<String>,
    pub install_command: Option<String>,
    pub build_command: Option<String>,
    /// Build output directory, relative to `path`.
    pub build_output: PathBuf,
}

impl WorkingTree {
    pub fn from_project(project: &ProjectConfig, path: PathBuf, token: Option<String>) -> Self {
        Self {
            name: project.name.clone(),
            path,
            remote_url: project.repo_url.clone(),
            branch: project.branch.clone(),
            token,
            install_command: project.install_command.clone(),
            build_command: project.build_command.clone(),
            build_output: PathBuf::from(&project.build_output),
        }
    }

    pub fn build_output_dir(&self) -> PathBuf {
        self.path.join(&self.build_output)
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// Outcome of releasing a transient directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOutcome {
    Removed,
    AlreadyAbsent,
    Failed(String),
    /// No transient directory was held.
    NotApplicable,
}

/// Scoped ownership of a transient directory.
///
/// The directory is removed on `release()` or, if that never happens because
/// a step failed, when the guard is dropped. Removal errors are logged and
/// swallowed so they never mask the failure being reported.
#[derive(Debug)]
pub struct TransientDir {
    path: Option<PathBuf>,
}

impl TransientDir {
    /// Take ownership of `path`. The directory itself is created lazily by whatever clones into it.
    pub fn acquire(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A guard that owns nothing (local builds).
    pub fn none() -> Self {
        Self { path: None }
    }

    pub fn release(mut self) -> CleanupOutcome {
        match self.path.take() {
            Some(path) => remove(&path),
            None => CleanupOutcome::NotApplicable,
        }
    }
}

impl Drop for TransientDir {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            remove(&path);
        }
    }
}

fn remove(path: &Path) -> CleanupOutcome {
    match io::remove_dir_if_exists(path, "remove transient directory") {
        Ok(true) => {
            crate::log_status!("cleanup", "Removed {}", path.display());
            CleanupOutcome::Removed
        }
        Ok(false) => CleanupOutcome::AlreadyAbsent,
        Err(e) => {
            let reason = e
                .details
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string();
            crate::log_status!(
                "cleanup",
                "Warning: could not remove {}: {}",
                path.display(),
                reason
            );
            tracing::warn!(path = %path.display(), error = %reason, "transient directory cleanup failed");
            CleanupOutcome::Failed(reason)
        }
    }
}
