// Public modules
pub mod assemble;
pub mod config;
pub mod error;
pub mod git;
pub mod http;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod toolchain;
pub mod webhook;
pub mod workspace;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use pipeline::{PipelineMode, PipelineRunResult, PipelineStage};
pub use toolchain::{ShellToolchain, StepEffect, Toolchain};
pub use workspace::{CleanupOutcome, TransientDir, WorkingTree};
