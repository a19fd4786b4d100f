//! Configuration for attribute installation and scene output
//!
//! Loadable from TOML:
//!
//! ```toml
//! [layout]
//! direction = "rtl"
//!
//! [priorities]
//! high = 800
//! low = 200
//!
//! [root]
//! width = 320
//! height = 480
//!
//! [output]
//! precision = 2
//! ```
//!
//! Every table and key is optional; missing values keep their defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::attribute::{LayoutDirection, Priority};

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid priority {name} = {value}: must lie between 0 and 1000")]
    InvalidPriority { name: &'static str, value: f64 },
}

/// Configuration options for installation and solving
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Resolves leading/trailing to left/right
    pub direction: LayoutDirection,

    /// Value `Priority::High` maps to on the 0..=1000 scale
    pub high_priority: f64,

    /// Value `Priority::Low` maps to
    pub low_priority: f64,

    /// Size given to script roots declared without one
    pub default_root_size: (f64, f64),

    /// Decimal places kept when printing frames
    pub precision: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::LeftToRight,
            high_priority: 750.0,
            low_priority: 250.0,
            default_root_size: (320.0, 480.0),
            precision: 3,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    layout: Option<TomlLayout>,
    priorities: Option<TomlPriorities>,
    root: Option<TomlRoot>,
    output: Option<TomlOutput>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLayout {
    direction: Option<LayoutDirection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPriorities {
    high: Option<f64>,
    low: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRoot {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlOutput {
    precision: Option<usize>,
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(direction) = parsed.layout.and_then(|l| l.direction) {
            config.direction = direction;
        }
        if let Some(priorities) = parsed.priorities {
            if let Some(high) = priorities.high {
                config.high_priority = checked_priority("high", high)?;
            }
            if let Some(low) = priorities.low {
                config.low_priority = checked_priority("low", low)?;
            }
        }
        if let Some(root) = parsed.root {
            let (width, height) = config.default_root_size;
            config.default_root_size = (root.width.unwrap_or(width), root.height.unwrap_or(height));
        }
        if let Some(precision) = parsed.output.and_then(|o| o.precision) {
            config.precision = precision;
        }
        Ok(config)
    }

    /// Set the layout direction
    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the values for `High` and `Low` priorities
    pub fn with_priorities(mut self, high: f64, low: f64) -> Self {
        self.high_priority = high;
        self.low_priority = low;
        self
    }

    /// Set the default root size
    pub fn with_root_size(mut self, width: f64, height: f64) -> Self {
        self.default_root_size = (width, height);
        self
    }

    /// Set the number of decimals printed
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Replace symbolic priorities with their configured numeric value.
    pub fn resolve_priority(&self, priority: Priority) -> Priority {
        match priority {
            Priority::High => Priority::Custom(self.high_priority),
            Priority::Low => Priority::Custom(self.low_priority),
            Priority::Custom(value) if value >= 1000.0 => Priority::Required,
            other => other,
        }
    }
}

fn checked_priority(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1000.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidPriority { name, value })
    }
}
