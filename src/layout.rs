//! Circular layout engine.
//!
//! Tokens are placed clockwise on a circle starting at the top. The circle's
//! center is shifted left and down from the viewport center to leave room for
//! the legend. A second, conservative pass pulls the circle in if any node
//! would land inside the padding band.

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};
use crate::types::{NodePosition, Token, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum distance between any node and the viewport edge.
    pub padding: f64,
    /// Shift of the circle center to the left of the viewport center.
    pub legend_offset_x: f64,
    /// Shift of the circle center below the viewport center.
    pub legend_offset_y: f64,
    /// Upper bound on the circle radius regardless of viewport size.
    pub max_radius: f64,
    /// Fraction of the conservative bound used by the fallback pass.
    pub safe_radius_factor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 60.0,
            legend_offset_x: 50.0,
            legend_offset_y: 20.0,
            max_radius: 220.0,
            safe_radius_factor: 0.8,
        }
    }
}

impl LayoutConfig {
    /// Reject values that would let a node escape the padded area or turn a
    /// coordinate into NaN.
    pub fn validate(&self) -> VizResult<()> {
        let positive = [("padding", self.padding), ("max_radius", self.max_radius)];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(VizError::Config(format!(
                    "layout.{name} must be finite and positive, got {value}"
                )));
            }
        }
        let offsets = [
            ("legend_offset_x", self.legend_offset_x),
            ("legend_offset_y", self.legend_offset_y),
        ];
        for (name, value) in offsets {
            if !value.is_finite() {
                return Err(VizError::Config(format!(
                    "layout.{name} must be finite, got {value}"
                )));
            }
        }
        // At 1 or above the fallback circle touches the bound it was
        // computed from, and rounding can put a node just outside.
        if !(self.safe_radius_factor > 0.0 && self.safe_radius_factor < 1.0) {
            return Err(VizError::Config(format!(
                "layout.safe_radius_factor must be within (0, 1), got {}",
                self.safe_radius_factor
            )));
        }
        Ok(())
    }
}

/// Center and radius of the layout circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeometry {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl CircleGeometry {
    /// First-pass geometry derived from the viewport.
    pub fn for_viewport(viewport: Viewport, config: &LayoutConfig) -> VizResult<Self> {
        let Viewport { width, height } = viewport;
        let padding = config.padding;
        if !width.is_finite() || !height.is_finite() {
            return Err(VizError::Layout(format!(
                "viewport must be finite, got {width}x{height}"
            )));
        }
        if width < 2.0 * padding || height < 2.0 * padding {
            return Err(VizError::Layout(format!(
                "viewport {width}x{height} is smaller than twice the padding ({padding})"
            )));
        }

        let cx = (width / 2.0 - config.legend_offset_x).clamp(padding, width - padding);
        let cy = (height / 2.0 + config.legend_offset_y).clamp(padding, height - padding);

        let max_radius_x = (width - 2.0 * padding) / 2.0;
        let max_radius_y = (height - 2.0 * padding) / 2.0;
        let radius = max_radius_x.min(max_radius_y).min(config.max_radius);

        Ok(Self { cx, cy, radius })
    }

    /// Fallback geometry: same center, radius shrunk to a fraction of the
    /// distance from the center to the nearest padded edge.
    ///
    /// Depends only on the center, so applying it again yields the same circle.
    pub fn safe(&self, viewport: Viewport, config: &LayoutConfig) -> Self {
        let padding = config.padding;
        let bound = [
            self.cx - padding,
            viewport.width - padding - self.cx,
            self.cy - padding,
            viewport.height - padding - self.cy,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
        .max(0.0);

        Self {
            cx: self.cx,
            cy: self.cy,
            radius: bound * config.safe_radius_factor,
        }
    }

    /// Angle of slot `i` of `count`: index 0 at the top, increasing clockwise.
    pub fn angle(i: usize, count: usize) -> f64 {
        TAU * i as f64 / count as f64 - FRAC_PI_2
    }

    pub fn place(&self, tokens: &[Token]) -> Vec<NodePosition> {
        let count = tokens.len();
        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let theta = Self::angle(i, count);
                NodePosition {
                    display_index: token.display_index,
                    original_index: token.original_index,
                    x: self.cx + self.radius * theta.cos(),
                    y: self.cy + self.radius * theta.sin(),
                }
            })
            .collect()
    }
}

/// Whether every position lies within `[padding, dim - padding]` on both axes.
pub fn bounds_ok(positions: &[NodePosition], viewport: Viewport, padding: f64) -> bool {
    positions.iter().all(|p| {
        p.x >= padding
            && p.x <= viewport.width - padding
            && p.y >= padding
            && p.y <= viewport.height - padding
    })
}

/// Place `tokens` on a circle inside `viewport`.
///
/// Deterministic in `(token order, viewport)`. Fewer than two tokens is
/// rejected; callers are expected to check before laying out.
pub fn circular_layout(
    tokens: &[Token],
    viewport: Viewport,
    config: &LayoutConfig,
) -> VizResult<Vec<NodePosition>> {
    if tokens.len() < 2 {
        return Err(VizError::NotEnoughData(format!(
            "{} meaningful token(s), at least 2 are needed",
            tokens.len()
        )));
    }

    let geometry = CircleGeometry::for_viewport(viewport, config)?;
    let positions = geometry.place(tokens);
    if bounds_ok(&positions, viewport, config.padding) {
        return Ok(positions);
    }

    let safe = geometry.safe(viewport, config);
    tracing::debug!(
        radius = geometry.radius,
        safe_radius = safe.radius,
        "layout exceeded padded bounds, using safe radius"
    );
    Ok(safe.place(tokens))
}
