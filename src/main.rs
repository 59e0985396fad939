use clap::Parser;
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{build, config, serve, webhook};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "showcase")]
#[command(version = VERSION)]
#[command(about = "Build and serve a portfolio site with an embedded game")]
struct Cli {
    /// Path to showcase.json (defaults to ./showcase.json, then the global config)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Assemble the site and the game build into the output directory
    Build(build::BuildArgs),
    /// Serve the assembled output directory
    Serve(serve::ServeArgs),
    /// Receive push webhooks and rebuild on pushes to the tracked branch
    Webhook(webhook::WebhookArgs),
    /// Inspect configuration
    Config(config::ConfigArgs),
}

impl Commands {
    /// Prefix for the one-line failure message on stderr.
    fn failure_label(&self) -> &'static str {
        match self {
            Commands::Build(_) => "Build failed",
            Commands::Serve(_) => "Server failed",
            Commands::Webhook(_) => "Webhook server failed",
            Commands::Config(_) => "Config error",
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { config: cli.config };

    let label = cli.command.failure_label();
    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = &json_result {
        eprintln!("{}: {}", label, err.message);
    }
    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err.message);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
