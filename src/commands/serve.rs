use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use showcase::http::{self, static_site};
use showcase::{logging, paths, Error};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides server.port)
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory to serve (defaults to the configured output directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ServeOutput {
    command: String,
    address: String,
    root: String,
}

pub fn run(args: ServeArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ServeOutput> {
    logging::init_logging();
    let (config, _) = global.load_config()?;

    let root = match args.dir {
        Some(dir) => paths::absolutize(&dir),
        None => paths::absolutize(&config.output_dir()),
    };
    if !root.is_dir() {
        return Err(Error::validation_invalid_argument(
            "dir",
            format!("{} is not a directory", root.display()),
        )
        .with_hint("Run `showcase build` first or pass --dir"));
    }

    let port = args.port.unwrap_or(config.server.port);
    let address = format!("{}:{}", config.server.bind, port);
    tracing::info!(root = %root.display(), "serving static site");

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::internal_io(e.to_string(), Some("start async runtime".to_string())))?;
    runtime.block_on(http::serve(
        static_site::router(&root),
        &address,
        "static",
    ))?;

    Ok((
        ServeOutput {
            command: "serve".to_string(),
            address,
            root: root.display().to_string(),
        },
        0,
    ))
}
