//! Rune frames configuration system
//!
//! This crate provides centralized configuration for the frame motion core,
//! loading settings from `rune.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`RuneConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RuneConfig {
    /// Variant transition and timeline animation settings
    pub motion: MotionConfig,
}

/// Motion core configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Extra wait added to `duration + delay` before a stalled transition is
    /// treated as complete.
    pub fallback_padding_ms: f64,
    /// Largest anchor count still played as a declarative keyframe animation.
    pub keyframe_anchor_limit: usize,
    /// Frame spacing used when sampling manual interpolation frames.
    pub frame_interval_ms: f64,
    /// Easing name used when a played timeline sets no curve or names an unknown one.
    pub default_easing: String,
    /// Cancel a pending delayed hover application when a newer hover event
    /// targets the same frame.
    pub cancel_superseded_hover: bool,
    /// Upper bound on chained `listen` passes drained in one `run_pending` call.
    pub max_listen_cascade: usize,
    /// Performance scoring penalties
    pub performance: PerformanceConfig,
}

/// Penalties used by the performance impact analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Penalty for properties that force layout recomputation.
    pub layout_penalty: u32,
    /// Penalty for properties that are expensive to paint.
    pub paint_penalty: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            fallback_padding_ms: 100.0,
            keyframe_anchor_limit: 10,
            frame_interval_ms: 16.0,
            default_easing: "ease".to_string(),
            cancel_superseded_hover: true,
            max_listen_cascade: 32,
            performance: PerformanceConfig::default(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            layout_penalty: 20,
            paint_penalty: 10,
        }
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the rune.toml configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("rune.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        let motion = &mut self.motion;

        if let Ok(val) = std::env::var("RUNE_MOTION_FALLBACK_PADDING_MS") {
            if let Ok(padding) = val.parse::<f64>() {
                motion.fallback_padding_ms = padding;
            }
        }
        if let Ok(val) = std::env::var("RUNE_MOTION_KEYFRAME_LIMIT") {
            if let Ok(limit) = val.parse::<usize>() {
                motion.keyframe_anchor_limit = limit;
            }
        }
        if let Ok(val) = std::env::var("RUNE_MOTION_FRAME_INTERVAL_MS") {
            if let Ok(interval) = val.parse::<f64>() {
                motion.frame_interval_ms = interval;
            }
        }
        if let Ok(easing) = std::env::var("RUNE_MOTION_EASING") {
            motion.default_easing = easing;
        }
        if let Ok(val) = std::env::var("RUNE_MOTION_CANCEL_HOVER") {
            motion.cancel_superseded_hover = val == "1" || val.eq_ignore_ascii_case("true");
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
