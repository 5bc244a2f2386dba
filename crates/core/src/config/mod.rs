use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{text::DEFAULT_ROW_CAP, MoireError, Result};

/// Top-level configuration structure for the application.
///
/// Values are fixed at startup; nothing in the core reconfigures itself at
/// runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub terminal: TerminalConfig,
    pub animation: AnimationConfig,
}

impl AppConfig {
    /// Parses a JSON document, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Serializes the configuration as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings the terminal or the animation cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.terminal.validate()?;
        self.animation.validate()
    }
}

/// Dimensions of the scrolling text terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Characters per emitted column.
    pub width: usize,
    /// Maximum number of newline-terminated rows kept in the buffer.
    pub row_cap: Option<usize>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            width: 200,
            row_cap: Some(DEFAULT_ROW_CAP),
        }
    }
}

impl TerminalConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(MoireError::InvalidConfig(
                "terminal width must be positive".to_string(),
            ));
        }
        if self.row_cap == Some(0) {
            return Err(MoireError::InvalidConfig(
                "row cap must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the moire animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub frame_delay_ms: u64,
    pub min_radius: u32,
    pub max_radius: u32,
    /// Probability that a tick spawns a cluster of circles.
    pub density: f64,
    /// Upper bound of the random offset applied to each circle of a cluster.
    pub cluster_spread: u32,
    pub moire_char: char,
    pub empty_char: char,
    /// Fixed PRNG seed; a time-derived seed is used when absent.
    pub seed: Option<u64>,
    pub sine: SineConfig,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_delay_ms: 40,
            min_radius: 2,
            max_radius: 8,
            density: 0.3,
            cluster_spread: 8,
            moire_char: ':',
            empty_char: ' ',
            seed: None,
            sine: SineConfig::default(),
        }
    }
}

impl AnimationConfig {
    /// Delay between two frames.
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Number of columns kept queued ahead of the render position.
    pub fn window_len(&self) -> usize {
        self.max_radius as usize * 2 + 1
    }

    fn validate(&self) -> Result<()> {
        if self.frame_delay_ms == 0 {
            return Err(MoireError::InvalidConfig(
                "frame delay must be positive".to_string(),
            ));
        }
        if self.min_radius > self.max_radius {
            return Err(MoireError::InvalidConfig(format!(
                "min radius {} exceeds max radius {}",
                self.min_radius, self.max_radius
            )));
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(MoireError::InvalidConfig(format!(
                "density {} is outside [0, 1]",
                self.density
            )));
        }
        Ok(())
    }
}

/// Sine trace stamped over the emitted columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SineConfig {
    pub enabled: bool,
    pub glyph: char,
    pub amplitude: u32,
    /// Phase increment per tick, in radians.
    pub step: f64,
}

impl Default for SineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            glyph: '_',
            amplitude: 25,
            step: 0.1,
        }
    }
}
