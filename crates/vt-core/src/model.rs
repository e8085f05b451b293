//! Paint and stroke style shared by curves and shapes.
//!
//! Colors blend linearly during shape tweens; image pattern fills never
//! blend and are carried over from the source shape unchanged.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`, leading `#` optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits: Vec<u8> = hex
            .trim_start_matches('#')
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        let channels: Vec<u8> = match digits.len() {
            3 | 4 => digits.iter().map(|d| d * 17).collect(),
            6 | 8 => digits.chunks(2).map(|p| p[0] * 16 + p[1]).collect(),
            _ => return None,
        };
        let unit = |i: usize| channels.get(i).map_or(1.0, |&v| f32::from(v) / 255.0);
        Some(Self::rgba(unit(0), unit(1), unit(2), unit(3)))
    }

    /// `#RRGGBB`, with an alpha pair appended when not opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = [self.r, self.g, self.b, self.a].map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
        let mut out = format!("#{r:02X}{g:02X}{b:02X}");
        if a != u8::MAX {
            out.push_str(&format!("{a:02X}"));
        }
        out
    }

    /// Component-wise linear blend. `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = t as f32;
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

// ─── Fill ────────────────────────────────────────────────────────────────

/// Shape fill: a flat color or an image pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillStyle {
    Flat(Color),
    /// Pattern fill referencing an image asset owned by the host app.
    Image { asset: ObjectId },
}

impl Default for FillStyle {
    fn default() -> Self {
        FillStyle::Flat(Color::WHITE)
    }
}

impl FillStyle {
    /// Blend two fills. Flat colors interpolate; anything involving an image
    /// keeps `self` unchanged.
    pub fn lerp(&self, other: &FillStyle, t: f64) -> FillStyle {
        match (self, other) {
            (FillStyle::Flat(a), FillStyle::Flat(b)) => FillStyle::Flat(a.lerp(b, t)),
            _ => self.clone(),
        }
    }

    pub fn image(&self) -> Option<ObjectId> {
        match self {
            FillStyle::Image { asset } => Some(*asset),
            FillStyle::Flat(_) => None,
        }
    }
}

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub line_width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            line_width: 1.0,
        }
    }
}

impl StrokeStyle {
    pub fn lerp(&self, other: &StrokeStyle, t: f64) -> StrokeStyle {
        StrokeStyle {
            color: self.color.lerp(&other.color, t),
            line_width: self.line_width + (other.line_width - self.line_width) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse_and_emit() {
        let c = Color::from_hex("#FF8000").unwrap();
        assert_eq!(c.to_hex(), "#FF8000");
        let short = Color::from_hex("f00").unwrap();
        assert_eq!(short.to_hex(), "#FF0000");
        let alpha = Color::from_hex("#00000080").unwrap();
        assert_eq!(alpha.to_hex(), "#00000080");
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn stroke_lerp_midpoint() {
        let a = StrokeStyle {
            color: Color::BLACK,
            line_width: 2.0,
        };
        let b = StrokeStyle {
            color: Color::WHITE,
            line_width: 6.0,
        };
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.line_width, 4.0);
        assert!((mid.color.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn image_fill_is_never_blended() {
        let img = FillStyle::Image {
            asset: ObjectId::intern("texture"),
        };
        let flat = FillStyle::Flat(Color::BLACK);
        assert_eq!(img.lerp(&flat, 0.7), img);
    }
}
