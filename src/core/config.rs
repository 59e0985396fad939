use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Fallback used when no webhook secret is configured anywhere.
pub const DEFAULT_WEBHOOK_SECRET: &str = "your-webhook-secret";

/// Environment variable that overrides the configured webhook secret.
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";

/// Root configuration structure for showcase.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseConfig {
    /// First project: static files copied verbatim to the output root.
    #[serde(default = "default_site")]
    pub site: ProjectConfig,

    /// Second project: installed, built, and mounted under `game_mount`.
    #[serde(default = "default_game")]
    pub game: ProjectConfig,

    #[serde(default = "default_projects_root")]
    pub projects_root: String,

    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[serde(default = "default_game_mount")]
    pub game_mount: String,

    /// Top-level site entries left out of the output. Defaults to `[".git"]`
    /// so repository metadata is never published; `[]` copies the site verbatim.
    #[serde(default = "default_copy_exclude")]
    pub copy_exclude: Vec<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            game: default_game(),
            projects_root: default_projects_root(),
            work_dir: default_work_dir(),
            output_path: default_output_path(),
            game_mount: default_game_mount(),
            copy_exclude: default_copy_exclude(),
            server: ServerConfig::default(),
            webhook: WebhookConfig::default(),
            token_env: default_token_env(),
        }
    }
}

/// One external project checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Explicit checkout location for local builds (defaults to `<projects_root>/<name>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Build output directory, relative to the checkout.
    #[serde(default = "default_build_output")]
    pub build_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_webhook_port")]
    pub port: u16,

    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Branch whose pushes trigger a rebuild.
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_webhook_port(),
            path: default_webhook_path(),
            branch: default_branch(),
            secret: None,
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_site() -> ProjectConfig {
    ProjectConfig {
        name: "ResumeWebsite".to_string(),
        repo_url: None,
        branch: default_branch(),
        path: None,
        install_command: None,
        build_command: None,
        build_output: default_build_output(),
    }
}

fn default_game() -> ProjectConfig {
    ProjectConfig {
        name: "TetrisGame".to_string(),
        repo_url: None,
        branch: default_branch(),
        path: None,
        install_command: Some("npm install".to_string()),
        build_command: Some("npm run buildforHost".to_string()),
        build_output: default_build_output(),
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_build_output() -> String {
    "dist".to_string()
}

fn default_projects_root() -> String {
    "projects".to_string()
}

fn default_work_dir() -> String {
    ".showcase-work".to_string()
}

fn default_output_path() -> String {
    "dist".to_string()
}

fn default_game_mount() -> String {
    "game".to_string()
}

fn default_copy_exclude() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3731
}

fn default_webhook_port() -> u16 {
    3732
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

// =============================================================================
// Derived paths
// =============================================================================

impl ShowcaseConfig {
    pub fn output_dir(&self) -> PathBuf {
        paths::expand(&self.output_path)
    }

    pub fn work_dir(&self) -> PathBuf {
        paths::expand(&self.work_dir)
    }

    /// Checkout location used by local builds.
    pub fn local_tree_path(&self, project: &ProjectConfig) -> PathBuf {
        match &project.path {
            Some(p) => paths::expand(p),
            None => paths::expand(&self.projects_root).join(&project.name),
        }
    }

    /// Checkout location used by synced builds (inside the transient work dir).
    pub fn synced_tree_path(&self, project: &ProjectConfig) -> PathBuf {
        self.work_dir().join(&project.name)
    }

    /// Nested output path for the game build, relative to the output root.
    pub fn game_subpath(&self) -> PathBuf {
        Path::new(&self.game_mount).join(&self.game.name)
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        for (key, project) in [("site.name", &self.site), ("game.name", &self.game)] {
            if !is_single_segment(&project.name) {
                return Err(Error::config_invalid_value(
                    key,
                    Some(project.name.clone()),
                    "project name must be a single, non-empty path segment",
                ));
            }
        }

        if !is_single_segment(&self.game_mount) {
            return Err(Error::config_invalid_value(
                "game_mount",
                Some(self.game_mount.clone()),
                "game mount must be a single, non-empty path segment",
            ));
        }

        if self.site.name == self.game.name {
            return Err(Error::config_invalid_value(
                "game.name",
                Some(self.game.name.clone()),
                "site and game must use different names",
            ));
        }

        if self.output_path.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "output_path",
                None,
                "output path must not be empty",
            ));
        }

        if !self.webhook.path.starts_with('/') {
            return Err(Error::config_invalid_value(
                "webhook.path",
                Some(self.webhook.path.clone()),
                "webhook path must start with '/'",
            ));
        }

        Ok(())
    }

    /// Read the remote credential from the environment.
    ///
    /// Remote sync cannot run without it, so absence is an error rather than
    /// a silent fallback to anonymous access.
    pub fn require_token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(
                Error::config_missing_key(self.token_env.clone(), None).with_hint(format!(
                    "Export {} with a token that can read both repositories",
                    self.token_env
                )),
            ),
        }
    }

    /// Resolve the webhook secret: env var, then config file, then the fixed default.
    pub fn webhook_secret(&self) -> WebhookSecret {
        if let Ok(secret) = std::env::var(WEBHOOK_SECRET_ENV) {
            if !secret.is_empty() {
                return WebhookSecret {
                    value: secret,
                    is_default: false,
                };
            }
        }

        match &self.webhook.secret {
            Some(secret) if !secret.is_empty() => WebhookSecret {
                value: secret.clone(),
                is_default: false,
            },
            _ => WebhookSecret {
                value: DEFAULT_WEBHOOK_SECRET.to_string(),
                is_default: true,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSecret {
    pub value: String,
    /// True when no secret was configured and the well-known default is in use.
    pub is_default: bool,
}

fn is_single_segment(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains('/')
        && !trimmed.contains('\\')
}

// =============================================================================
// Loading functions
// =============================================================================

/// Where the active configuration came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum ConfigSource {
    File(String),
    Builtin,
}

/// Load configuration.
///
/// An explicit path must exist. Otherwise `./showcase.json`, then the global
/// `~/.config/showcase/showcase.json`, then built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<(ShowcaseConfig, ConfigSource)> {
    let candidate = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::config_missing_key(
                    "config",
                    Some(path.display().to_string()),
                )
                .with_hint("Pass an existing showcase.json with --config"));
            }
            Some(path.to_path_buf())
        }
        None => discover(),
    };

    let (config, source) = match candidate {
        Some(path) => (
            load_from_file(&path)?,
            ConfigSource::File(path.display().to_string()),
        ),
        None => (ShowcaseConfig::default(), ConfigSource::Builtin),
    };

    config.validate()?;
    Ok((config, source))
}

fn discover() -> Option<PathBuf> {
    let local = paths::local_config();
    if local.exists() {
        return Some(local);
    }

    paths::global_config().ok().filter(|p| p.exists())
}

/// Parse a showcase.json file, filling missing keys from built-in defaults.
pub fn load_from_file(path: &Path) -> Result<ShowcaseConfig> {
    let content = io::read_file(path, &format!("read {}", path.display()))?;
    parse(&content, &path.display().to_string())
}

pub fn parse(content: &str, origin: &str) -> Result<ShowcaseConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin() -> ShowcaseConfig {
    ShowcaseConfig::default()
}
