use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory and the global config dir.
pub const CONFIG_FILE: &str = "showcase.json";

/// Base showcase config directory (~/.config/showcase/ on all platforms)
pub fn showcase() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("showcase"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("showcase"))
    }
}

/// Global showcase.json config file path
pub fn global_config() -> Result<PathBuf> {
    Ok(showcase()?.join(CONFIG_FILE))
}

/// showcase.json in the current working directory
pub fn local_config() -> PathBuf {
    PathBuf::from(CONFIG_FILE)
}

/// Expand `~` and environment variables in a configured path.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Resolve a path against the current working directory without touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
