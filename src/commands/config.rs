use clap::{Args, Subcommand};
use serde::Serialize;

use showcase::config::{self, ConfigSource, ShowcaseConfig, WEBHOOK_SECRET_ENV};
use showcase::paths;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the active configuration (file merged over built-in defaults)
    Show {
        /// Show only built-in defaults (ignore showcase.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Show where showcase.json is looked up
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<ShowcaseConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ConfigSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_secret: Option<SecretStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<PathEntry>>,
}

#[derive(Debug, Serialize)]
struct SecretStatus {
    env: String,
    using_default: bool,
}

#[derive(Debug, Serialize)]
struct PathEntry {
    scope: String,
    path: String,
    exists: bool,
}

pub fn run(args: ConfigArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin, global),
        ConfigCommand::Path => path(global),
    }
}

fn show(builtin: bool, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    let (mut cfg, source) = if builtin {
        (config::builtin(), ConfigSource::Builtin)
    } else {
        global.load_config()?
    };

    let secret = cfg.webhook_secret();
    if cfg.webhook.secret.is_some() {
        cfg.webhook.secret = Some("***".to_string());
    }

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(cfg),
            source: Some(source),
            webhook_secret: Some(SecretStatus {
                env: WEBHOOK_SECRET_ENV.to_string(),
                using_default: secret.is_default,
            }),
            paths: None,
        },
        0,
    ))
}

fn path(global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    let mut entries = Vec::new();

    if let Some(explicit) = &global.config {
        entries.push(entry("explicit", explicit));
    }
    entries.push(entry("local", &paths::local_config()));
    entries.push(entry("global", &paths::global_config()?));

    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            config: None,
            source: None,
            webhook_secret: None,
            paths: Some(entries),
        },
        0,
    ))
}

fn entry(scope: &str, path: &std::path::Path) -> PathEntry {
    PathEntry {
        scope: scope.to_string(),
        path: path.display().to_string(),
        exists: path.exists(),
    }
}
