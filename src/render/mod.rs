//! Renderer: pure mapping from placed nodes and selected connections to
//! drawable primitives.
//!
//! Nothing here moves a node: positions come from the layout engine and are
//! copied into the primitives as-is.

pub mod palette;
mod svg;

use serde::{Deserialize, Serialize};

use crate::types::{Connection, NodePosition, Token, Viewport};

pub use palette::{strength_color, Rgb};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub node_radius: f64,
    pub special_node_radius: f64,
    pub min_stroke_width: f64,
    pub max_stroke_width: f64,
    /// Edge opacity at strength 0; rises linearly to 1 at strength 1.
    pub min_edge_opacity: f64,
    /// Control-point offset as a fraction of the chord length.
    pub curvature: f64,
    /// Gap between a node's rim and its label.
    pub label_offset: f64,
    pub font_size: f64,
    pub node_fill: Rgb,
    pub special_node_fill: Rgb,
    pub label_color: Rgb,
    pub background: Rgb,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            node_radius: 12.0,
            special_node_radius: 8.0,
            min_stroke_width: 1.0,
            max_stroke_width: 6.0,
            min_edge_opacity: 0.35,
            curvature: 0.2,
            label_offset: 8.0,
            font_size: 13.0,
            node_fill: palette::COLOR_NODE,
            special_node_fill: palette::COLOR_NODE_SPECIAL,
            label_color: palette::COLOR_LABEL,
            background: palette::COLOR_BACKGROUND,
        }
    }
}

impl RenderStyle {
    pub fn stroke_width(&self, strength: f64) -> f64 {
        self.min_stroke_width + (self.max_stroke_width - self.min_stroke_width) * unit(strength)
    }

    pub fn edge_opacity(&self, strength: f64) -> f64 {
        self.min_edge_opacity + (1.0 - self.min_edge_opacity) * unit(strength)
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Quadratic Bézier from `start` to `end` bent through `control`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadCurve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

impl QuadCurve {
    pub fn chord_length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Distance from the chord midpoint to the control point.
    pub fn bend(&self) -> f64 {
        let mid = Point::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        );
        mid.distance(self.control)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePrimitive {
    pub index: usize,
    pub from_display_index: usize,
    pub to_display_index: usize,
    pub curve: QuadCurve,
    pub strength: f64,
    pub stroke_width: f64,
    pub color: Rgb,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePrimitive {
    pub display_index: usize,
    pub center: Point,
    pub radius: f64,
    pub fill: Rgb,
    pub is_special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrimitive {
    pub display_index: usize,
    pub text: String,
    pub position: Point,
    pub anchor: TextAnchor,
}

/// Everything needed to draw one attention graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub edges: Vec<EdgePrimitive>,
    pub nodes: Vec<NodePrimitive>,
    pub labels: Vec<LabelPrimitive>,
    pub style: RenderStyle,
}

impl Scene {
    pub fn node(&self, display_index: usize) -> Option<&NodePrimitive> {
        self.nodes.iter().find(|n| n.display_index == display_index)
    }
}

fn centroid(positions: &[NodePosition]) -> Point {
    if positions.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = positions.len() as f64;
    let (sx, sy) = positions
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

fn edge_curve(from: &NodePrimitive, to: &NodePrimitive, curvature: f64) -> QuadCurve {
    let dx = to.center.x - from.center.x;
    let dy = to.center.y - from.center.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f64::EPSILON {
        return QuadCurve {
            start: from.center,
            control: from.center,
            end: to.center,
        };
    }
    let (ux, uy) = (dx / length, dy / length);

    // Trim to the node rims so arrowheads stay visible.
    let start = Point::new(from.center.x + ux * from.radius, from.center.y + uy * from.radius);
    let end = Point::new(to.center.x - ux * to.radius, to.center.y - uy * to.radius);

    // Bend to the left of the direction of travel, so A->B and B->A separate.
    let chord = start.distance(end);
    let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
    let control = Point::new(mid.x + uy * chord * curvature, mid.y - ux * chord * curvature);

    QuadCurve {
        start,
        control,
        end,
    }
}

fn label_anchor(dx: f64) -> TextAnchor {
    if dx > 1.0 {
        TextAnchor::Start
    } else if dx < -1.0 {
        TextAnchor::End
    } else {
        TextAnchor::Middle
    }
}

/// Build the drawable scene.
///
/// One edge per connection, one node and one label per position. Connections
/// whose endpoints are not placed are skipped.
pub fn render_scene(
    positions: &[NodePosition],
    connections: &[Connection],
    tokens: &[Token],
    viewport: Viewport,
    style: &RenderStyle,
) -> Scene {
    let nodes: Vec<NodePrimitive> = positions
        .iter()
        .map(|p| {
            let is_special = tokens
                .iter()
                .find(|t| t.display_index == p.display_index)
                .map(|t| t.is_special)
                .unwrap_or(false);
            NodePrimitive {
                display_index: p.display_index,
                center: Point::new(p.x, p.y),
                radius: if is_special {
                    style.special_node_radius
                } else {
                    style.node_radius
                },
                fill: if is_special {
                    style.special_node_fill
                } else {
                    style.node_fill
                },
                is_special,
            }
        })
        .collect();

    let hub = centroid(positions);
    let labels = nodes
        .iter()
        .map(|node| {
            let dx = node.center.x - hub.x;
            let dy = node.center.y - hub.y;
            let length = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
            let reach = node.radius + style.label_offset;
            LabelPrimitive {
                display_index: node.display_index,
                text: tokens
                    .iter()
                    .find(|t| t.display_index == node.display_index)
                    .map(|t| t.text.clone())
                    .unwrap_or_default(),
                position: Point::new(
                    node.center.x + dx / length * reach,
                    node.center.y + dy / length * reach,
                ),
                anchor: label_anchor(dx),
            }
        })
        .collect();

    let find = |display_index: usize| nodes.iter().find(|n| n.display_index == display_index);
    let edges = connections
        .iter()
        .filter_map(|c| {
            let from = find(c.from_display_index)?;
            let to = find(c.to_display_index)?;
            Some((c, edge_curve(from, to, style.curvature)))
        })
        .enumerate()
        .map(|(index, (c, curve))| EdgePrimitive {
            index,
            from_display_index: c.from_display_index,
            to_display_index: c.to_display_index,
            curve,
            strength: c.strength,
            stroke_width: style.stroke_width(c.strength),
            color: strength_color(c.strength),
            opacity: style.edge_opacity(c.strength),
        })
        .collect();

    Scene {
        width: viewport.width,
        height: viewport.height,
        edges,
        nodes,
        labels,
        style: style.clone(),
    }
}
