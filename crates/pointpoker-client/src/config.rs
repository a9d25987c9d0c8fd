//! Client configuration, loaded from RON.
//!
//! ```ron
//! (
//!     default_point_scale: [1.0, 2.0, 3.0, 5.0, 8.0, 13.0],
//!     preferences_path: Some("/home/me/.local/share/pointpoker/prefs.json"),
//!     mask_placeholder: "?",
//! )
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use pointpoker_types::PointScale;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::constants::{APP_DIR, CONFIG_FILE, DEFAULT_POINT_SCALE, MASK_PLACEHOLDER, PREFERENCES_FILE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scale a new room draft starts from.
    pub default_point_scale: PointScale,
    /// Where preferences are persisted. `None` uses the platform data dir.
    pub preferences_path: Option<PathBuf>,
    /// Placeholder shown for hidden votes.
    pub mask_placeholder: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_point_scale: PointScale::from_values(DEFAULT_POINT_SCALE),
            preferences_path: None,
            mask_placeholder: MASK_PLACEHOLDER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        info!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Load the default config file if it exists, else use defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Resolved preferences path.
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path.clone().unwrap_or_else(default_preferences_path)
    }
}

/// `<config dir>/pointpoker/client.ron`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

/// `<data dir>/pointpoker/prefs.json`, falling back to the working directory.
pub fn default_preferences_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(PREFERENCES_FILE)
}
