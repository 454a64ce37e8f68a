// SSH Tunnel Launcher - CLI Config Module
// Loads launcher settings from the user's config directory

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use ssh_tunnel_launcher_common::LauncherSettings;

/// CLI configuration (wrapper around LauncherSettings with file I/O)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub launcher: LauncherSettings,
}

impl CliConfig {
    /// Load CLI configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_optional(Self::config_path().as_deref())
    }

    /// Without a known location the settings file counts as missing
    fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                warn!("Could not determine config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load CLI configuration from `path`, falling back to defaults when the
    /// file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read launcher settings {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse launcher settings {}", path.display()))?;

        Ok(config)
    }

    /// Get the path to the CLI configuration file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ssh-tunnel-launcher").join("launcher.toml"))
    }
}
