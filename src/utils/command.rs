//! Command execution primitives with consistent error handling.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{Error, Result};

/// Run a program in a specific directory, capturing its output whatever the exit status.
///
/// Only a failure to spawn is an error; callers that need the exit code or
/// stderr of a failed run inspect the `Output` themselves.
pub fn output_in(
    dir: &Path,
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    context: &str,
) -> Result<Output> {
    Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .current_dir(dir)
        .output()
        .map_err(|e| {
            Error::internal_io(
                format!("Failed to run {}: {}", context, e),
                Some(context.to_string()),
            )
        })
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

/// Check if a command succeeds in a directory without capturing output.
pub fn succeeded_in(dir: &Path, program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Exit status of a command whose output went straight to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughStatus {
    pub success: bool,
    pub exit_code: i32,
    /// Set when the process could not be spawned at all.
    pub spawn_error: Option<String>,
}

/// Run a shell command with stdout/stderr inherited from this process.
///
/// Install and build tools stream their own progress, so nothing is captured.
pub fn run_passthrough(command: &str, dir: &Path) -> PassthroughStatus {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    cmd.current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    match cmd.status() {
        Ok(status) => PassthroughStatus {
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
            spawn_error: None,
        },
        Err(e) => PassthroughStatus {
            success: false,
            exit_code: -1,
            spawn_error: Some(e.to_string()),
        },
    }
}

/// Replace every occurrence of `secret` in `text` with `***`.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => text.replace(s, "***"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_in_captures_stdout() {
        let output = output_in(Path::new("."), "echo", &["hello"], &[], "echo test").unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn output_in_fails_with_invalid_command() {
        let err = output_in(Path::new("."), "nonexistent_command_xyz", &[], &[], "test").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[cfg(unix)]
    #[test]
    fn output_in_passes_environment() {
        let output = output_in(
            Path::new("."),
            "sh",
            &["-c", "echo $SHOWCASE_TEST_VAR"],
            &[("SHOWCASE_TEST_VAR", "set")],
            "env test",
        )
        .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "set");
    }

    #[cfg(unix)]
    #[test]
    fn output_in_keeps_failed_status_and_stderr() {
        let output = output_in(
            Path::new("."),
            "sh",
            &["-c", "echo broken >&2; exit 4"],
            &[],
            "failing script",
        )
        .unwrap();
        assert_eq!(output.status.code(), Some(4));
        assert_eq!(error_text(&output), "broken");
    }

    #[test]
    fn error_text_prefers_stderr() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"stderr content".to_vec(),
        };
        assert_eq!(error_text(&output), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"".to_vec(),
        };
        assert_eq!(error_text(&output), "stdout content");
    }

    #[cfg(unix)]
    #[test]
    fn run_passthrough_reports_exit_code() {
        let status = run_passthrough("exit 3", Path::new("."));
        assert!(!status.success);
        assert_eq!(status.exit_code, 3);
        assert!(status.spawn_error.is_none());
    }

    #[test]
    fn run_passthrough_reports_missing_directory() {
        let status = run_passthrough("true", Path::new("/nonexistent/dir/for/showcase"));
        assert!(!status.success);
        assert!(status.spawn_error.is_some());
    }

    #[test]
    fn redact_masks_secret() {
        assert_eq!(
            redact("https://abc123@github.com/x.git", Some("abc123")),
            "https://***@github.com/x.git"
        );
        assert_eq!(redact("nothing here", None), "nothing here");
        assert_eq!(redact("keep", Some("")), "keep");
    }
}
