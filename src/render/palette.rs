use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Rec. 709 weighted brightness on the raw sRGB channels.
    pub fn luminance(self) -> f64 {
        0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Viridis control points, evenly spaced over [0, 1].
pub const STRENGTH_SCALE: [Rgb; 5] = [
    Rgb::new(0x44, 0x01, 0x54),
    Rgb::new(0x3b, 0x52, 0x8b),
    Rgb::new(0x21, 0x91, 0x8c),
    Rgb::new(0x5e, 0xc9, 0x62),
    Rgb::new(0xfd, 0xe7, 0x25),
];

pub const COLOR_BACKGROUND: Rgb = Rgb::new(0xff, 0xff, 0xff);
pub const COLOR_NODE: Rgb = Rgb::new(0x4a, 0x6f, 0xa5);
pub const COLOR_NODE_SPECIAL: Rgb = Rgb::new(0x9a, 0xa5, 0xb1);
pub const COLOR_LABEL: Rgb = Rgb::new(0x22, 0x2b, 0x36);

/// Perceptually ordered color for an attention strength; input is clamped to [0, 1].
pub fn strength_color(strength: f64) -> Rgb {
    let t = if strength.is_finite() {
        strength.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let segments = (STRENGTH_SCALE.len() - 1) as f64;
    let scaled = t * segments;
    let lower = (scaled.floor() as usize).min(STRENGTH_SCALE.len() - 2);
    STRENGTH_SCALE[lower].lerp(STRENGTH_SCALE[lower + 1], scaled - lower as f64)
}
