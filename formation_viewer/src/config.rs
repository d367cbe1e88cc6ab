//! Viewer configuration, loaded from an optional TOML file.
//!
//! Every section and every field is optional; anything left out keeps its
//! default.
//!
//! ```toml
//! [machine]
//! confirm_frames = 8
//!
//! [blend]
//! override_policy = "population"
//!
//! [population]
//! particles = 800
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use gesture_mode::{ClassifierConfig, MachineConfig};
use motion_blend::{BlendConfig, CameraConfig, PopulationConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// ViewerConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub classifier: ClassifierConfig,
    pub machine:    MachineConfig,
    pub blend:      BlendConfig,
    pub camera:     CameraConfig,
    pub population: PopulationConfig,
    pub simulator:  SimulatorConfig,
}

/// Settings for the keyboard-driven landmark simulator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Detector frames per second.
    pub frame_rate: f32,
    /// Wrist-to-knuckle distance of the synthetic hand, in normalized units.
    pub hand_size:  f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig { frame_rate: 30.0, hand_size: 0.08 }
    }
}

impl SimulatorConfig {
    pub fn frame_period(&self) -> Duration {
        let hz = if self.frame_rate.is_finite() { self.frame_rate.clamp(1.0, 240.0) } else { 30.0 };
        Duration::from_secs_f32(1.0 / hz)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
