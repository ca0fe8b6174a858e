//! Engine configuration
//!
//! All knobs have built-in defaults defined in code; a TOML file can
//! override any subset. Configuration is bootstrap-only: the engine reads it
//! once at construction (the free-preview threshold is the one runtime
//! exception and has its own setter on the engine).

use std::path::Path;

use serde::Deserialize;

use playgate_common::{Error, Result};

/// Corner of the player the skip button is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipButtonPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Periodic time-signal polling interval (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Window within which repeated play requests are ignored (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Skip button behavior
    #[serde(default)]
    pub skip: SkipButtonConfig,

    /// Free-preview gate tuning
    #[serde(default)]
    pub gate: GateConfig,

    /// Integrity monitor tuning
    #[serde(default)]
    pub integrity: IntegrityConfig,
}

/// Skip button configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SkipButtonConfig {
    /// Auto-hide delay for the skip button (milliseconds, 0 = never hide)
    #[serde(default = "default_auto_hide_ms")]
    pub auto_hide_ms: u64,

    /// Corner the button is anchored to
    #[serde(default)]
    pub position: SkipButtonPosition,
}

/// Free-preview gate configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Threshold comparison tolerance (seconds)
    #[serde(default = "default_gate_epsilon")]
    pub epsilon: f64,

    /// How far behind the threshold the position is clamped on overshoot
    /// (seconds)
    #[serde(default = "default_gate_clamp_back")]
    pub clamp_back: f64,
}

/// Integrity monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrityConfig {
    /// Overlay presence poll interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tamper detections tolerated before terminal lockout
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_debounce_ms() -> u64 {
    120
}

fn default_auto_hide_ms() -> u64 {
    5000
}

fn default_gate_epsilon() -> f64 {
    0.01
}

fn default_gate_clamp_back() -> f64 {
    0.1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            debounce_ms: default_debounce_ms(),
            skip: SkipButtonConfig::default(),
            gate: GateConfig::default(),
            integrity: IntegrityConfig::default(),
        }
    }
}

impl Default for SkipButtonConfig {
    fn default() -> Self {
        Self {
            auto_hide_ms: default_auto_hide_ms(),
            position: SkipButtonPosition::default(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            epsilon: default_gate_epsilon(),
            clamp_back: default_gate_clamp_back(),
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing fields fall back to built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }
}
