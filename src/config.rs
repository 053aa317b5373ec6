//! Engine configuration.
//!
//! One consistent set of thresholds and limits, exposed as named constants
//! and grouped into [`VizConfig`] for hosts that load them from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};
use crate::highlight::HighlightStyle;
use crate::layout::LayoutConfig;
use crate::render::RenderStyle;

/// Quiet period after the last keystroke before a request is issued.
pub const DEBOUNCE_MS: u64 = 1000;
/// Longest input the backend accepts, in characters.
pub const MAX_TEXT_LENGTH: usize = 1000;
/// Minimum matrix strength for a drawn connection (exclusive).
pub const CONNECTION_THRESHOLD: f64 = 0.05;
/// Number of connections drawn.
pub const MAX_CONNECTIONS: usize = 12;
/// Minimum strength for a relationship list row (exclusive).
pub const RELATIONSHIP_THRESHOLD: f64 = 0.03;
/// Number of relationship list rows.
pub const MAX_RELATIONSHIPS: usize = 8;

/// Strength threshold plus top-K cut applied by a selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionLimits {
    pub threshold: f64,
    pub top_k: usize,
}

impl SelectionLimits {
    pub const fn new(threshold: f64, top_k: usize) -> Self {
        Self { threshold, top_k }
    }

    pub const fn connections() -> Self {
        Self::new(CONNECTION_THRESHOLD, MAX_CONNECTIONS)
    }

    pub const fn relationships() -> Self {
        Self::new(RELATIONSHIP_THRESHOLD, MAX_RELATIONSHIPS)
    }

    fn validate(&self, name: &str) -> VizResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(VizError::Config(format!(
                "{name}.threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.top_k == 0 {
            return Err(VizError::Config(format!("{name}.top_k must be at least 1")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default = "SelectionLimits::connections")]
    pub connections: SelectionLimits,
    #[serde(default = "SelectionLimits::relationships")]
    pub relationships: SelectionLimits,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub render: RenderStyle,
    #[serde(default)]
    pub highlight: HighlightStyle,
}

fn default_debounce_ms() -> u64 {
    DEBOUNCE_MS
}

fn default_max_text_length() -> usize {
    MAX_TEXT_LENGTH
}

impl VizConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_json_str(json: &str) -> VizResult<Self> {
        let config: VizConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub async fn load(path: impl AsRef<Path>) -> VizResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> VizResult<()> {
        self.connections.validate("connections")?;
        self.relationships.validate("relationships")?;
        if self.max_text_length == 0 {
            return Err(VizError::Config("max_text_length must be at least 1".into()));
        }
        self.layout.validate()?;
        if !(0.0..=1.0).contains(&self.highlight.dim_opacity) {
            return Err(VizError::Config(format!(
                "highlight.dim_opacity must be within [0, 1], got {}",
                self.highlight.dim_opacity
            )));
        }
        Ok(())
    }
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            max_text_length: MAX_TEXT_LENGTH,
            connections: SelectionLimits::connections(),
            relationships: SelectionLimits::relationships(),
            layout: LayoutConfig::default(),
            render: RenderStyle::default(),
            highlight: HighlightStyle::default(),
        }
    }
}
