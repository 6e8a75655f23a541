//! Colors shared by the page model, layout helpers and templates.

use serde::{Deserialize, Serialize};

/// An RGB color with components in `0.0..=1.0`.
///
/// Opacity is carried separately on each paint operation, so a color is
/// always fully opaque on its own. Deserializes from either
/// `{ "r": .., "g": .., "b": .. }` or a `"#rrggbb"` / `"#rgb"` string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorRepr")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb { r: f64, g: f64, b: f64 },
}

impl From<ColorRepr> for Color {
    fn from(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Hex(s) => Color::hex(&s),
            ColorRepr::Rgb { r, g, b } => Color::rgb(r, g, b),
        }
    }
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Components are clamped into the unit range.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: unit(r),
            g: unit(g),
            b: unit(b),
        }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 if hex.is_ascii() => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 if hex.is_ascii() => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_six_digits() {
        let c = Color::hex("#ff8000");
        assert!((c.r - 1.0).abs() < 1e-9);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn test_hex_short_form() {
        assert_eq!(Color::hex("#fff"), Color::WHITE);
        assert_eq!(Color::hex("nonsense"), Color::BLACK);
    }

    #[test]
    fn test_hex_non_ascii_is_black() {
        assert_eq!(Color::hex("#éa"), Color::BLACK);
        let c: Color = serde_json::from_str(r##""#éa""##).unwrap();
        assert_eq!(c, Color::BLACK);
    }

    #[test]
    fn test_rgb_clamps() {
        let c = Color::rgb(1.5, -0.2, f64::NAN);
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_deserialize_both_forms() {
        let a: Color = serde_json::from_str("\"#000000\"").unwrap();
        let b: Color = serde_json::from_str(r#"{ "r": 0, "g": 0, "b": 0 }"#).unwrap();
        assert_eq!(a, b);
    }
}
