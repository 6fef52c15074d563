//! Engine configuration
//!
//! Saved and loaded in RON or JSON, the same two formats used for scenes.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;
use crate::renderer::Color;

/// Fastest variable loop interval
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Highest accepted frame rate cap
pub const MAX_FPS_LIMIT: u32 = 1000;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Frame buffer width
    pub width: u32,
    /// Frame buffer height
    pub height: u32,
    /// Variable loop frame cap; `None` ticks as fast as the timer allows
    pub fps_limit: Option<u32>,
    /// Fixed loop interval in milliseconds
    pub fixed_delta_ms: u64,
    /// Color the frame buffer is cleared to
    pub background: Color,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("BeeEngine"),
            width: 800,
            height: 600,
            fps_limit: None,
            fixed_delta_ms: 20,
            background: Color::BLACK,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    /// Set the window title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set frame buffer dimensions
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Cap the variable loop
    #[must_use]
    pub fn with_fps_limit(mut self, fps: Option<u32>) -> Self {
        self.fps_limit = fps;
        self
    }

    /// Set the fixed loop interval
    #[must_use]
    pub fn with_fixed_delta(mut self, millis: u64) -> Self {
        self.fixed_delta_ms = millis;
        self
    }

    /// Set the clear color
    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Set the default log filter, e.g. `"bee_engine=debug"`
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        match self.fps_limit {
            Some(fps) if !(1..=MAX_FPS_LIMIT).contains(&fps) => {
                return Err(ConfigError::InvalidFpsLimit(fps));
            }
            _ => {}
        }
        if self.fixed_delta_ms == 0 {
            return Err(ConfigError::InvalidFixedDelta);
        }
        Ok(())
    }

    /// Variable loop interval
    #[must_use]
    pub fn variable_interval(&self) -> Duration {
        match self.fps_limit {
            Some(fps) if fps > 0 => Duration::from_millis(1000 / u64::from(fps)).max(MIN_TICK),
            _ => MIN_TICK,
        }
    }

    /// Fixed loop interval
    #[must_use]
    pub fn fixed_interval(&self) -> Duration {
        Duration::from_millis(self.fixed_delta_ms.max(1))
    }

    /// Save to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Load and validate a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = ron::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Load and validate a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}
