//! External tools the pipeline drives: version control, package install, build.
//!
//! The pipeline only talks to the `Toolchain` trait so tests can swap in a
//! fake that never spawns processes.

use crate::error::{Error, Result, StepFailedDetails};
use crate::git;
use crate::utils::command::{self, PassthroughStatus};
use crate::workspace::WorkingTree;

/// Whether a step did work or had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEffect {
    Ran,
    Skipped,
}

pub trait Toolchain: Send + Sync {
    /// Bring `tree` to the tip of its remote branch (clone if absent, hard reset if present).
    fn sync(&self, tree: &WorkingTree) -> Result<()>;

    /// Install the tree's declared dependencies.
    fn install(&self, tree: &WorkingTree) -> Result<StepEffect>;

    /// Run the tree's build command.
    fn build(&self, tree: &WorkingTree) -> Result<()>;
}

/// Production toolchain: `git` for sync, `sh -c` for install and build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellToolchain;

impl Toolchain for ShellToolchain {
    fn sync(&self, tree: &WorkingTree) -> Result<()> {
        let token = tree.token.as_deref();
        let remote = tree.remote_url.as_deref().ok_or_else(|| {
            Error::sync_failed(sync_failure(tree, None, None, "no repo_url configured"))
                .with_hint(format!(
                    "Set repo_url for '{}' in showcase.json",
                    tree.name
                ))
        })?;
        let url = git::authenticated_url(remote, token);

        let result = if tree.path.exists() {
            if !git::is_git_repo(&tree.path) {
                return Err(Error::sync_failed(sync_failure(
                    tree,
                    None,
                    None,
                    "directory exists but is not a git repository",
                )));
            }
            crate::log_status!("sync", "Updating {} ({})", tree.name, tree.branch);
            git::fetch(&tree.path, &url, &tree.branch)
                .and_then(|_| git::reset_hard(&tree.path, &tree.branch))
        } else {
            crate::log_status!("sync", "Cloning {} ({})", tree.name, tree.branch);
            git::clone_repo(&url, &tree.branch, &tree.path)
        };

        result.map_err(|e| {
            let exit_code = e.details["exitCode"].as_i64().map(|c| c as i32);
            Error::sync_failed(sync_failure(
                tree,
                e.details["command"].as_str(),
                exit_code,
                &command::redact(&e.message, token),
            ))
        })
    }

    fn install(&self, tree: &WorkingTree) -> Result<StepEffect> {
        let cmd = match tree.install_command.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => return Ok(StepEffect::Skipped),
        };

        crate::log_status!("install", "{} $ {}", tree.name, cmd);
        let status = command::run_passthrough(cmd, &tree.path);
        if status.success {
            Ok(StepEffect::Ran)
        } else {
            Err(Error::install_failed(step_failure(tree, cmd, &status)))
        }
    }

    fn build(&self, tree: &WorkingTree) -> Result<()> {
        let cmd = tree.build_command.as_deref().ok_or_else(|| {
            Error::build_failed(StepFailedDetails {
                project: tree.name.clone(),
                command: None,
                exit_code: None,
                working_dir: tree.display_path(),
                error: "no build_command configured".to_string(),
            })
            .with_hint(format!(
                "Set build_command for '{}' in showcase.json",
                tree.name
            ))
        })?;

        crate::log_status!("build", "{} $ {}", tree.name, cmd);
        let status = command::run_passthrough(cmd, &tree.path);
        if status.success {
            Ok(())
        } else {
            Err(Error::build_failed(step_failure(tree, cmd, &status)))
        }
    }
}

fn step_failure(tree: &WorkingTree, cmd: &str, status: &PassthroughStatus) -> StepFailedDetails {
    StepFailedDetails {
        project: tree.name.clone(),
        command: Some(cmd.to_string()),
        exit_code: Some(status.exit_code),
        working_dir: tree.display_path(),
        error: describe_exit(status),
    }
}

fn sync_failure(
    tree: &WorkingTree,
    git_command: Option<&str>,
    exit_code: Option<i32>,
    error: &str,
) -> StepFailedDetails {
    StepFailedDetails {
        project: tree.name.clone(),
        command: git_command.map(str::to_string),
        exit_code,
        working_dir: tree.display_path(),
        error: error.to_string(),
    }
}

/// Translate universal POSIX exit codes only; the tools themselves are opaque.
fn describe_exit(status: &PassthroughStatus) -> String {
    if let Some(spawn) = &status.spawn_error {
        return format!("could not start command: {}", spawn);
    }

    let hint = match status.exit_code {
        127 => " (command not found; check that it is installed and in PATH)",
        126 => " (permission denied; check the script's permissions)",
        _ => "",
    };
    format!("exit code {}{}", status.exit_code, hint)
}
