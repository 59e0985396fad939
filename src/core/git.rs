use std::path::Path;

use crate::error::{Error, GitCommandFailedDetails, Result};
use crate::paths;
use crate::utils::{command, io};

/// Clone a single branch of a repository into `target_dir`.
pub fn clone_repo(url: &str, branch: &str, target_dir: &Path) -> Result<()> {
    let target = paths::absolutize(target_dir);
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    io::ensure_dir(parent, "create clone parent")?;

    run_git(
        parent,
        &["clone", "--branch", branch, url, &target.to_string_lossy()],
        "git clone",
    )?;
    Ok(())
}

/// Point `origin` at `url` and fetch `branch` from it.
///
/// The URL is reset on every fetch so a rotated credential takes effect on
/// checkouts that were cloned with an older one.
pub fn fetch(repo_dir: &Path, url: &str, branch: &str) -> Result<()> {
    run_git(
        repo_dir,
        &["remote", "set-url", "origin", url],
        "git remote set-url",
    )?;
    run_git(repo_dir, &["fetch", "origin", branch], "git fetch")?;
    Ok(())
}

/// Move the checked-out branch to `origin/<branch>`, discarding local edits.
pub fn reset_hard(repo_dir: &Path, branch: &str) -> Result<()> {
    let target = format!("origin/{}", branch);
    run_git(repo_dir, &["reset", "--hard", &target], "git reset")?;
    Ok(())
}

/// True only when `path` is the root of a working tree, not merely somewhere inside one.
pub fn is_git_repo(path: &Path) -> bool {
    if !path.is_dir() || !command::succeeded_in(path, "git", &["rev-parse", "--git-dir"]) {
        return false;
    }

    let toplevel = match run_git(path, &["rev-parse", "--show-toplevel"], "git rev-parse") {
        Ok(t) => t,
        Err(_) => return false,
    };

    match (Path::new(&toplevel).canonicalize(), path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Embed a token into an HTTP(S) remote URL.
///
/// Non-HTTP URLs (ssh, file, local paths) are returned unchanged since they
/// authenticate by other means.
pub fn authenticated_url(url: &str, token: Option<&str>) -> String {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return url.to_string(),
    };

    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            // Drop any credentials already present in the URL.
            let host_and_path = match rest.split_once('@') {
                Some((userinfo, tail)) if !userinfo.contains('/') => tail,
                _ => rest,
            };
            return format!("{}{}@{}", scheme, token, host_and_path);
        }
    }

    url.to_string()
}

/// Run git without ever prompting for credentials; a prompt would hang unattended builds.
///
/// A failure keeps git's own stderr and exit code.
fn run_git(dir: &Path, args: &[&str], context: &str) -> Result<String> {
    let output = command::output_in(dir, "git", args, &[("GIT_TERMINAL_PROMPT", "0")], context)
        .map_err(|e| {
            Error::git_command_failed(GitCommandFailedDetails {
                command: context.to_string(),
                exit_code: None,
                error: e.details["error"]
                    .as_str()
                    .unwrap_or("could not start git")
                    .to_string(),
            })
        })?;

    if !output.status.success() {
        return Err(Error::git_command_failed(GitCommandFailedDetails {
            command: context.to_string(),
            exit_code: output.status.code(),
            error: command::error_text(&output),
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;
    use std::process::Command;

    pub fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(["-c", "user.name=Test User", "-c", "user.email=test@test.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Commit hash of HEAD, if the directory is a repository with commits.
    pub fn head_commit(repo_dir: &Path) -> Option<String> {
        super::run_git(repo_dir, &["rev-parse", "HEAD"], "git rev-parse").ok()
    }

    /// Create a repository on branch `main` with the given files committed.
    pub fn init_upstream(dir: &Path, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).expect("Failed to create upstream dir");
        git(dir, &["init"]);
        git(dir, &["checkout", "-b", "main"]);
        commit_files(dir, files, "Initial commit");
    }

    pub fn commit_files(dir: &Path, files: &[(&str, &str)], message: &str) {
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(path, content).expect("Failed to write file");
        }
        git(dir, &["add", "."]);
        git(dir, &["commit", "-m", message]);
    }
}
