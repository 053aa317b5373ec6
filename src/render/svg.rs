//! SVG export for hosts without a DOM.

use super::palette::STRENGTH_SCALE;
use super::{Scene, TextAnchor};

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn anchor_attr(anchor: TextAnchor) -> &'static str {
    match anchor {
        TextAnchor::Start => "start",
        TextAnchor::Middle => "middle",
        TextAnchor::End => "end",
    }
}

impl Scene {
    fn draw_edges(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|edge| {
                let c = &edge.curve;
                format!(
                    r#"<path class="edge" data-index="{}" data-from="{}" data-to="{}" d="M {:.1} {:.1} Q {:.1} {:.1} {:.1} {:.1}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-opacity="{:.2}" stroke-linecap="round" marker-end="url(#arrow)"/>"#,
                    edge.index,
                    edge.from_display_index,
                    edge.to_display_index,
                    c.start.x,
                    c.start.y,
                    c.control.x,
                    c.control.y,
                    c.end.x,
                    c.end.y,
                    edge.color.to_hex(),
                    edge.stroke_width,
                    edge.opacity,
                )
            })
            .collect()
    }

    fn draw_nodes(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| {
                format!(
                    r#"<circle class="node{}" data-index="{}" cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/>"#,
                    if node.is_special { " special" } else { "" },
                    node.display_index,
                    node.center.x,
                    node.center.y,
                    node.radius,
                    node.fill.to_hex(),
                )
            })
            .collect()
    }

    fn draw_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| {
                format!(
                    r#"<text class="label" data-index="{}" x="{:.1}" y="{:.1}" text-anchor="{}" dominant-baseline="middle" font-size="{:.0}" fill="{}">{}</text>"#,
                    label.display_index,
                    label.position.x,
                    label.position.y,
                    anchor_attr(label.anchor),
                    self.style.font_size,
                    self.style.label_color.to_hex(),
                    escape(&label.text),
                )
            })
            .collect()
    }

    fn draw_legend(&self) -> String {
        let stops: Vec<String> = STRENGTH_SCALE
            .iter()
            .enumerate()
            .map(|(i, color)| {
                format!(
                    r#"<stop offset="{:.0}%" stop-color="{}"/>"#,
                    i as f64 * 100.0 / (STRENGTH_SCALE.len() - 1) as f64,
                    color.to_hex()
                )
            })
            .collect();
        let x = self.width - 140.0;
        format!(
            r#"<defs>
    <linearGradient id="strength" x1="0%" x2="100%">{}</linearGradient>
    <marker id="arrow" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="6" markerHeight="6" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="context-stroke"/></marker>
  </defs>
  <g class="legend">
    <rect x="{:.1}" y="20" width="120" height="10" fill="url(#strength)"/>
    <text x="{:.1}" y="44" font-size="11">weak</text>
    <text x="{:.1}" y="44" font-size="11" text-anchor="end">strong</text>
  </g>"#,
            stops.join(""),
            x,
            x,
            x + 120.0,
        )
    }

    /// Serialize the scene as a standalone SVG document.
    ///
    /// Edges are drawn first so nodes and labels stay on top.
    pub fn to_svg(&self) -> String {
        let body = [
            self.draw_legend(),
            format!(r#"<g class="edges">{}</g>"#, self.draw_edges().join("\n")),
            format!(r#"<g class="nodes">{}</g>"#, self.draw_nodes().join("\n")),
            format!(r#"<g class="labels">{}</g>"#, self.draw_labels().join("\n")),
        ]
        .join("\n  ");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">
  <rect width="100%" height="100%" fill="{}"/>
  {}
</svg>"#,
            self.width,
            self.height,
            self.width,
            self.height,
            self.style.background.to_hex(),
            body
        )
    }
}
