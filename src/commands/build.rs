use clap::Args;
use serde::Serialize;

use showcase::config::ConfigSource;
use showcase::logging;
use showcase::pipeline::{self, PipelineMode, PipelineRunResult};
use showcase::ShellToolchain;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct BuildArgs {
    /// Clone or hard-reset both repositories into the work directory first
    /// (requires the token environment variable)
    #[arg(long)]
    pub sync: bool,
}

#[derive(Debug, Serialize)]
pub struct BuildOutput {
    command: String,
    config: ConfigSource,
    #[serde(flatten)]
    result: PipelineRunResult,
}

pub fn run(args: BuildArgs, global: &crate::commands::GlobalArgs) -> CmdResult<BuildOutput> {
    // Cleanup failures are reported through tracing; install the subscriber
    // before anything can fail.
    logging::init_logging();

    let (config, source) = global.load_config()?;

    let (mode, token) = if args.sync {
        (PipelineMode::Sync, Some(config.require_token()?))
    } else {
        (PipelineMode::Local, None)
    };

    let plan = pipeline::plan(&config, mode, token);
    let result = pipeline::run(&plan, &ShellToolchain)?;

    Ok((
        BuildOutput {
            command: "build".to_string(),
            config: source,
            result,
        },
        0,
    ))
}
