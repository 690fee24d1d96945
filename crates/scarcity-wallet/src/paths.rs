//! Data-directory resolution and node-config persistence.

use std::path::PathBuf;

use scarcity_types::config::NodeConfig;

use crate::{atomic_write, Result};

/// Resolve the data directory.
///
/// `SCARCITY_DATA_DIR` overrides everything; otherwise a dot-directory
/// under the user's home, with /tmp as the last resort.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SCARCITY_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".scarcity"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/scarcity"))
}

/// Config file path inside a data directory.
pub fn config_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("config.json")
}

/// Load the node config, fill defaults for a missing file, then overlay
/// the well-known environment variables.
pub fn load_config(path: &std::path::Path) -> Result<NodeConfig> {
    let mut config = match std::fs::read(path) {
        Ok(raw) => serde_json::from_slice(&raw)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => NodeConfig::default(),
        Err(e) => return Err(e.into()),
    };
    config.apply_env();
    Ok(config)
}

/// Persist the node config.
pub fn save_config(path: &std::path::Path, config: &NodeConfig) -> Result<()> {
    let raw = serde_json::to_vec_pretty(config)?;
    atomic_write(path, &raw)?;
    Ok(())
}
