use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Directory holding the config file and log files.
///
/// `GPTCLIP_CONFIG_DIR` overrides the default per-user location
/// (`~/.config/gpt-clip` on Linux).
pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GPTCLIP_CONFIG_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let base = dirs::config_dir().ok_or_else(|| anyhow!("Could not find user config directory"))?;
    Ok(base.join("gpt-clip"))
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.json"))
}

/// Log files live beside the config file.
pub fn get_log_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
