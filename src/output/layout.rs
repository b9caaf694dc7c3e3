//! Multi-monitor layout resolution
//!
//! Persisted configuration is a list of named snapshots, each describing one
//! arrangement of outputs. Given the outputs currently connected, the resolver
//! picks the **first** snapshot (in file order) whose members are exactly the
//! connected set by count and name. There is no scoring: when a docked and an
//! undocked arrangement both fit, file order decides.
//!
//! When nothing matches, or no configuration exists, outputs are placed left to
//! right at scale 1 with the first one primary.
//!
//! ```toml
//! [[snapshot]]
//! name = "docked"
//!
//! [[snapshot.output]]
//! name = "HDMI-1"
//! x = 0
//! y = 0
//! primary = true
//!
//! [[snapshot.output]]
//! name = "LVDS-1"
//! x = 2560
//! y = 360
//! scale = 1.25
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A connected (or just reported) output as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub name: String,
    pub pixel_width: i32,
    pub pixel_height: i32,
    pub connected: bool,
}

/// One persisted output entry of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSetting {
    pub name: String,
    #[serde(default = "OutputSetting::default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub primary: bool,
    #[serde(default = "OutputSetting::default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl OutputSetting {
    fn default_scale() -> f64 {
        1.0
    }
    fn default_enabled() -> bool {
        true
    }
}

/// A named arrangement of outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub name: String,
    #[serde(rename = "output", default)]
    pub outputs: Vec<OutputSetting>,
}

impl LayoutSnapshot {
    /// Member count equals the connected count and every member is connected
    pub fn matches(&self, connected: &[&OutputInfo]) -> bool {
        self.outputs.len() == connected.len()
            && self
                .outputs
                .iter()
                .all(|setting| connected.iter().any(|o| o.name == setting.name))
    }
}

/// The persisted list of snapshots; read-only to the compositor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLayoutConfig {
    #[serde(rename = "snapshot", default)]
    pub snapshots: Vec<LayoutSnapshot>,
}

/// Live settings to apply to one output
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlacement {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub scale: f64,
    pub primary: bool,
    pub enabled: bool,
}

impl From<&OutputSetting> for OutputPlacement {
    fn from(setting: &OutputSetting) -> Self {
        Self {
            name: setting.name.clone(),
            x: setting.x,
            y: setting.y,
            scale: setting.scale,
            primary: setting.primary,
            enabled: setting.enabled,
        }
    }
}

#[derive(Debug, Error)]
pub enum LayoutFileError {
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML layout file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON layout file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported layout file format: {0}")]
    UnsupportedFormat(String),
}

impl OutputLayoutConfig {
    /// Loads snapshots from a `.toml` or `.json` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LayoutFileError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LayoutFileError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents)?,
            Some("json") => serde_json::from_str(&contents)?,
            other => {
                return Err(LayoutFileError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        info!(
            "📐 Loaded {} output layout snapshot(s) from {}",
            config.snapshots.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, LayoutFileError> {
        Ok(toml::from_str(contents)?)
    }
}

/// Left to right in iteration order, scale 1, first output primary
pub fn default_layout(connected: &[&OutputInfo]) -> Vec<OutputPlacement> {
    let mut x = 0;
    connected
        .iter()
        .enumerate()
        .map(|(i, output)| {
            let placement = OutputPlacement {
                name: output.name.clone(),
                x,
                y: 0,
                scale: 1.0,
                primary: i == 0,
                enabled: true,
            };
            x += output.pixel_width;
            placement
        })
        .collect()
}

/// Resolves live output settings for the given outputs
///
/// Disconnected entries are ignored. Returns an empty list when nothing is
/// connected.
pub fn resolve_layout(
    outputs: &[OutputInfo],
    config: Option<&OutputLayoutConfig>,
) -> Vec<OutputPlacement> {
    let connected: Vec<&OutputInfo> = outputs.iter().filter(|o| o.connected).collect();
    if connected.is_empty() {
        return Vec::new();
    }

    let fallback = default_layout(&connected);
    let Some(config) = config else {
        debug!("No output layout configuration, using default layout");
        return fallback;
    };

    match config.snapshots.iter().find(|s| s.matches(&connected)) {
        Some(snapshot) => {
            info!("📐 Using output layout snapshot '{}'", snapshot.name);
            for output in connected.iter().filter(|o| {
                !snapshot.outputs.iter().any(|setting| setting.name == o.name)
            }) {
                warn!(
                    "⚠️ Snapshot '{}' has no entry for {}, keeping its current settings",
                    snapshot.name, output.name
                );
            }
            snapshot.outputs.iter().map(OutputPlacement::from).collect()
        }
        None => {
            debug!(
                "No layout snapshot matches {} connected output(s), using default layout",
                connected.len()
            );
            fallback
        }
    }
}
