//! Output assembly: merge two source trees into one deployable directory.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Inputs for one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyLayout {
    /// Tree copied verbatim to the output root.
    pub site_root: PathBuf,
    /// Build output copied under `nested_path`.
    pub game_build: PathBuf,
    pub output: PathBuf,
    /// Relative path inside `output`, e.g. `game/TetrisGame`.
    pub nested_path: PathBuf,
    /// Top-level entries of `site_root` that are never copied.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub output: String,
    pub removed_previous: bool,
    pub site_files: usize,
    pub game_files: usize,
    pub nested_path: String,
}

/// Rebuild the output directory from scratch.
///
/// Order matters: the output is wiped and recreated, the site is copied, and
/// only then is the nested game path created and filled. A stale game build
/// can therefore never survive, and the site copy can never overwrite the
/// freshly built game files.
pub fn assemble(layout: &AssemblyLayout) -> Result<AssemblyReport> {
    check_layout(layout)?;

    if !layout.site_root.is_dir() {
        return Err(missing_source(&layout.site_root, &layout.output));
    }
    if !layout.game_build.is_dir() {
        return Err(missing_source(&layout.game_build, &layout.output)
            .with_hint("The game build did not produce its output directory; check build_output"));
    }

    let removed_previous = io::remove_dir_if_exists(&layout.output, "clean output directory")?;
    if removed_previous {
        crate::log_status!("assemble", "Removed previous {}", layout.output.display());
    }
    io::ensure_dir(&layout.output, "create output directory")?;

    crate::log_status!(
        "assemble",
        "Copying {} -> {}",
        layout.site_root.display(),
        layout.output.display()
    );
    let site_files = io::copy_tree(&layout.site_root, &layout.output, &layout.exclude)
        .map_err(|e| copy_error(&layout.site_root, &layout.output, e))?;

    let nested = layout.output.join(&layout.nested_path);
    io::ensure_dir(&nested, "create nested game directory")?;

    crate::log_status!(
        "assemble",
        "Copying {} -> {}",
        layout.game_build.display(),
        nested.display()
    );
    let game_files = io::copy_tree(&layout.game_build, &nested, &[])
        .map_err(|e| copy_error(&layout.game_build, &nested, e))?;

    Ok(AssemblyReport {
        output: layout.output.display().to_string(),
        removed_previous,
        site_files,
        game_files,
        nested_path: layout.nested_path.display().to_string(),
    })
}

/// Reject layouts where cleaning or copying would eat a source tree.
fn check_layout(layout: &AssemblyLayout) -> Result<()> {
    let output = paths::absolutize(&layout.output);
    let site = paths::absolutize(&layout.site_root);
    let game = paths::absolutize(&layout.game_build);

    if layout.nested_path.is_absolute() || layout.nested_path.as_os_str().is_empty() {
        return Err(Error::config_invalid_value(
            "game_mount",
            Some(layout.nested_path.display().to_string()),
            "nested game path must be relative and non-empty",
        ));
    }

    if output.starts_with(&site) || site.starts_with(&output) {
        return Err(Error::config_invalid_value(
            "output_path",
            Some(layout.output.display().to_string()),
            "output directory must not overlap the site source tree",
        ));
    }

    if game.starts_with(&output) || output.starts_with(&game) {
        return Err(Error::config_invalid_value(
            "output_path",
            Some(layout.output.display().to_string()),
            "output directory must not overlap the game build output",
        ));
    }

    Ok(())
}

fn missing_source(source: &Path, destination: &Path) -> Error {
    Error::copy_failed(
        source.display().to_string(),
        destination.display().to_string(),
        "source directory does not exist",
    )
}

fn copy_error(source: &Path, destination: &Path, err: std::io::Error) -> Error {
    Error::copy_failed(
        source.display().to_string(),
        destination.display().to_string(),
        err.to_string(),
    )
}
