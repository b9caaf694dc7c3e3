//! Configuration management for Meridian
//!
//! Loads and validates the TOML configuration file. Every section and key is
//! optional; missing values take the defaults below.
//!
//! ```toml
//! [general]
//! max_fps = 60
//! layout_file = "~/.config/meridian/outputs.toml"
//!
//! [view]
//! min_width = 64
//! min_height = 48
//! focus_on_map = true
//!
//! [cursor]
//! default_image = "left_ptr"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct containing all Meridian settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MeridianConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// View placement defaults
    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub cursor: CursorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Upper bound of frame ticks per second
    #[serde(default = "GeneralConfig::default_max_fps")]
    pub max_fps: u32,

    /// Persisted output layout snapshots (`.toml` or `.json`)
    #[serde(default = "GeneralConfig::default_layout_file")]
    pub layout_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    /// Minimum width used when a client gives no size hint
    #[serde(default = "ViewConfig::default_min_width")]
    pub min_width: i32,

    /// Minimum height used when a client gives no size hint
    #[serde(default = "ViewConfig::default_min_height")]
    pub min_height: i32,

    /// Give keyboard focus to views as soon as they map
    #[serde(default = "ViewConfig::default_focus_on_map")]
    pub focus_on_map: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CursorConfig {
    /// Cursor image shown when the pointer is over no surface
    #[serde(default = "CursorConfig::default_image")]
    pub default_image: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_fps: Self::default_max_fps(),
            layout_file: Self::default_layout_file(),
        }
    }
}

impl GeneralConfig {
    fn default_max_fps() -> u32 {
        60
    }
    fn default_layout_file() -> String {
        "~/.config/meridian/outputs.toml".to_string()
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_width: Self::default_min_width(),
            min_height: Self::default_min_height(),
            focus_on_map: Self::default_focus_on_map(),
        }
    }
}

impl ViewConfig {
    fn default_min_width() -> i32 {
        64
    }
    fn default_min_height() -> i32 {
        48
    }
    fn default_focus_on_map() -> bool {
        true
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            default_image: Self::default_image(),
        }
    }
}

impl CursorConfig {
    fn default_image() -> String {
        "left_ptr".to_string()
    }
}

/// Expands a leading `~` to `$HOME`
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl MeridianConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path)?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: MeridianConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.general.max_fps == 0 || self.general.max_fps > 1000 {
            anyhow::bail!("Invalid max_fps: must be between 1 and 1000");
        }

        if self.view.min_width < 1 || self.view.min_height < 1 {
            anyhow::bail!(
                "Invalid minimum view size {}x{}: both dimensions must be positive",
                self.view.min_width,
                self.view.min_height
            );
        }

        if self.cursor.default_image.trim().is_empty() {
            anyhow::bail!("Invalid cursor default_image: must not be empty");
        }

        Ok(())
    }

    /// Minimum view size used when clients give no hint
    pub fn fallback_min_size(&self) -> (i32, i32) {
        (self.view.min_width, self.view.min_height)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}
