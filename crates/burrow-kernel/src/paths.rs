//! XDG Base Directory paths for burrow.
//!
//! | Purpose | XDG Variable | Default | burrow Path |
//! |---------|--------------|---------|-------------|
//! | Config | `$XDG_CONFIG_HOME` | `~/.config` | `$XDG_CONFIG_HOME/burrow/config.toml` |
//! | Data | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/burrow/tenants/` |

use std::path::PathBuf;

use directories::BaseDirs;

/// Get the config directory.
///
/// Uses `$XDG_CONFIG_HOME/burrow` or falls back to `~/.config/burrow`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| dirs_fallback().join(".config"))
        .join("burrow")
}

/// Default configuration file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the data directory.
///
/// Uses `$XDG_DATA_HOME/burrow` or falls back to `~/.local/share/burrow`.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| dirs_fallback().join(".local").join("share"))
        .join("burrow")
}

/// Default parent of provisioned tenant roots when no `base_dir` is set.
pub fn tenants_dir() -> PathBuf {
    data_dir().join("tenants")
}

/// Fallback home directory when BaseDirs fails.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
