use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,
    ValidationInvalidJson,

    PipelineSyncFailed,
    PipelineInstallFailed,
    PipelineBuildFailed,
    PipelineCopyFailed,

    WebhookSignatureInvalid,

    GitCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::PipelineSyncFailed => "pipeline.sync_failed",
            ErrorCode::PipelineInstallFailed => "pipeline.install_failed",
            ErrorCode::PipelineBuildFailed => "pipeline.build_failed",
            ErrorCode::PipelineCopyFailed => "pipeline.copy_failed",

            ErrorCode::WebhookSignatureInvalid => "webhook.signature_invalid",

            ErrorCode::GitCommandFailed => "git.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// True for failures raised by one of the pipeline stages.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            ErrorCode::PipelineSyncFailed
                | ErrorCode::PipelineInstallFailed
                | ErrorCode::PipelineBuildFailed
                | ErrorCode::PipelineCopyFailed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

/// Context for a failed sync, install or build step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailedDetails {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub working_dir: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommandFailedDetails {
    pub command: String,
    /// `None` when git could not be started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFailedDetails {
    pub source: String,
    pub destination: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let problem = problem.into();
        let message = format!("Invalid {}: {}", field, problem);
        let details = to_details(InvalidArgumentDetails { field, problem });

        Self::new(ErrorCode::ValidationInvalidArgument, message, details)
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn sync_failed(details: StepFailedDetails) -> Self {
        let message = format!(
            "Repository sync failed for '{}': {}",
            details.project, details.error
        );
        Self::new(ErrorCode::PipelineSyncFailed, message, to_details(details))
    }

    pub fn install_failed(details: StepFailedDetails) -> Self {
        let message = format!(
            "Dependency install failed for '{}': {}",
            details.project, details.error
        );
        Self::new(ErrorCode::PipelineInstallFailed, message, to_details(details))
    }

    pub fn build_failed(details: StepFailedDetails) -> Self {
        let message = format!("Build failed for '{}': {}", details.project, details.error);
        Self::new(ErrorCode::PipelineBuildFailed, message, to_details(details))
    }

    pub fn copy_failed(
        source: impl Into<String>,
        destination: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let error = error.into();
        let message = format!("Copy from {} failed: {}", source, error);
        let details = to_details(CopyFailedDetails {
            source,
            destination: destination.into(),
            error,
        });

        Self::new(ErrorCode::PipelineCopyFailed, message, details)
    }

    pub fn signature_invalid(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::WebhookSignatureInvalid,
            "Webhook signature verification failed",
            serde_json::json!({ "reason": reason.into() }),
        )
    }

    pub fn git_command_failed(details: GitCommandFailedDetails) -> Self {
        let message = format!("{} failed: {}", details.command, details.error);
        Self::new(ErrorCode::GitCommandFailed, message, to_details(details))
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        let message = format!("Missing required configuration key: {}", key);
        let details = to_details(ConfigMissingKeyDetails { key, path });

        Self::new(ErrorCode::ConfigMissingKey, message, details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        let message = format!("Invalid configuration value: {}", problem);
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem,
        });

        Self::new(ErrorCode::ConfigInvalidValue, message, details)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failed_carries_step_details() {
        let err = Error::build_failed(StepFailedDetails {
            project: "TetrisGame".to_string(),
            command: Some("npm run buildforHost".to_string()),
            exit_code: Some(2),
            working_dir: "/tmp/TetrisGame".to_string(),
            error: "exit code 2".to_string(),
        });

        assert_eq!(err.code.as_str(), "pipeline.build_failed");
        assert!(err.code.is_pipeline_failure());
        assert_eq!(err.details["exitCode"], 2);
        assert_eq!(err.details["command"], "npm run buildforHost");
        assert!(err.message.contains("TetrisGame"));
    }

    #[test]
    fn sync_failed_keeps_git_exit_code() {
        let err = Error::sync_failed(StepFailedDetails {
            project: "TetrisGame".to_string(),
            command: Some("git clone".to_string()),
            exit_code: Some(128),
            working_dir: "/tmp/work/TetrisGame".to_string(),
            error: "git clone failed: fatal: repository not found".to_string(),
        });

        assert_eq!(err.code.as_str(), "pipeline.sync_failed");
        assert_eq!(err.details["exitCode"], 128);
        assert!(err.message.contains("repository not found"));
    }

    #[test]
    fn git_command_failed_reports_command_and_stderr() {
        let err = Error::git_command_failed(GitCommandFailedDetails {
            command: "git fetch".to_string(),
            exit_code: Some(128),
            error: "fatal: couldn't find remote ref main".to_string(),
        });

        assert_eq!(err.message, "git fetch failed: fatal: couldn't find remote ref main");
        assert_eq!(err.details["exitCode"], 128);
        assert_eq!(err.details["command"], "git fetch");
    }

    #[test]
    fn signature_invalid_is_not_a_pipeline_failure() {
        let err = Error::signature_invalid("missing header");
        assert_eq!(err.code.as_str(), "webhook.signature_invalid");
        assert!(!err.code.is_pipeline_failure());
        assert_eq!(err.details["reason"], "missing header");
    }

    #[test]
    fn with_hint_appends_hints_in_order() {
        let err = Error::config_missing_key("GITHUB_TOKEN", None)
            .with_hint("first")
            .with_hint("second");
        let messages: Vec<_> = err.hints.iter().map(|h| h.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
