use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use showcase::config::WEBHOOK_SECRET_ENV;
use showcase::http::{self, webhook};
use showcase::{logging, Error};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct WebhookArgs {
    /// Port to listen on (overrides webhook.port)
    #[arg(long, short)]
    pub port: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct WebhookOutput {
    command: String,
    address: String,
    path: String,
    branch: String,
    default_secret: bool,
}

pub fn run(args: WebhookArgs, global: &crate::commands::GlobalArgs) -> CmdResult<WebhookOutput> {
    logging::init_logging();
    let (config, _) = global.load_config()?;

    let secret = config.webhook_secret();
    if secret.is_default {
        tracing::warn!(
            "{} is not set; using the well-known default secret. Anyone who knows it can trigger builds",
            WEBHOOK_SECRET_ENV
        );
    }

    let port = args.port.unwrap_or(config.webhook.port);
    let address = format!("{}:{}", config.webhook.bind, port);
    let path = config.webhook.path.clone();
    let branch = config.webhook.branch.clone();
    tracing::info!(path = %path, branch = %branch, "webhook receiver configured");

    let state = webhook::WebhookState::new(
        secret.value,
        branch.clone(),
        Arc::new(webhook::PipelineTrigger::new(config)),
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::internal_io(e.to_string(), Some("start async runtime".to_string())))?;
    runtime.block_on(http::serve(
        webhook::router(&path, state),
        &address,
        "webhook",
    ))?;

    Ok((
        WebhookOutput {
            command: "webhook".to_string(),
            address,
            path,
            branch,
            default_secret: secret.is_default,
        },
        0,
    ))
}
