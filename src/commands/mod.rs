use std::path::PathBuf;

use showcase::config::{ConfigSource, ShowcaseConfig};

pub type CmdResult<T> = showcase::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Load and validate configuration honoring `--config`.
    pub fn load_config(&self) -> showcase::Result<(ShowcaseConfig, ConfigSource)> {
        showcase::config::load(self.config.as_deref())
    }
}

pub mod build;
pub mod config;
pub mod serve;
pub mod webhook;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (showcase::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Serve(args) => dispatch!(args, global, serve),
        crate::Commands::Webhook(args) => dispatch!(args, global, webhook),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
