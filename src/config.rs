//! Render configuration.
//!
//! Everything a template needs beyond the caller's fields and images: font
//! roles, palette, copy, geometry and document metadata. A `RenderConfig`
//! is built once at process start (defaults, or JSON via
//! [`RenderConfig::from_json_str`]) and passed explicitly into every render
//! call. Every field has a default, so a config file only needs to name
//! what it changes.

use serde::{Deserialize, Serialize};

use crate::error::AtelierError;
use crate::font::FontKey;
use crate::layout::card::{CardChrome, CardStyle};
use crate::style::Color;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub fonts: FontTheme,
    pub palette: Palette,
    pub certificate: CertificateLayout,
    pub portfolio: PortfolioLayout,
    pub metadata: MetadataDefaults,
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AtelierError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn from_path(path: &std::path::Path) -> Result<Self, AtelierError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Which font plays which role. Families must be standard fonts or fonts
/// registered on the `FontContext` used for the render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontTheme {
    pub serif: FontKey,
    pub serif_bold: FontKey,
    /// Decorative face for subtitles.
    pub script: FontKey,
}

impl Default for FontTheme {
    fn default() -> Self {
        Self {
            serif: FontKey::regular("Times"),
            serif_bold: FontKey::bold("Times"),
            script: FontKey::italic("Times"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    /// Main text color.
    pub ink: Color,
    /// Secondary text color.
    pub muted: Color,
    /// Frames, rules and accents.
    pub gold: Color,
    pub watermark: Color,
    /// Portfolio page fill when no background texture is available.
    pub parchment: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ink: Color::hex("#2b2118"),
            muted: Color::hex("#6b5d4f"),
            gold: Color::hex("#b08d57"),
            watermark: Color::hex("#b08d57"),
            parchment: Color::hex("#f6efe3"),
        }
    }
}

/// Copy and geometry for the certificate page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub title: String,
    pub subtitle: String,
    pub intro: String,
    /// `{style}` is replaced with the style name.
    pub completion: String,
    /// `{salon}` is replaced with the salon name.
    pub salon_line: String,
    pub title_size: f64,
    pub subtitle_size: f64,
    pub body_size: f64,
    pub name_size: f64,
    pub footer_size: f64,
    /// Baseline of the title, measured down from the page top.
    pub title_top: f64,
    pub subtitle_gap: f64,
    pub rule_gap: f64,
    /// Length of the two centered horizontal rules.
    pub rule_width: f64,
    /// Fixed advance of the body cursor per line.
    pub line_height: f64,
    pub watermark_size: f64,
    pub watermark_opacity: f64,
    pub watermark_rotation: f64,
    pub illustration_box: (f64, f64),
    pub signature_box: (f64, f64),
    /// Left edge of the signature block, measured from the page's right edge.
    pub signature_block_inset: f64,
    /// Distance from the inner frame to the illustration and the lowest
    /// footer line.
    pub footer_inset: f64,
}

impl Default for CertificateLayout {
    fn default() -> Self {
        Self {
            page_width: 842.0,
            page_height: 595.0,
            margin: 24.0,
            title: "CERTIFICATE OF COMPLETION".to_string(),
            subtitle: "Style Challenge".to_string(),
            intro: "This certificate is proudly presented to".to_string(),
            completion: "for successfully completing the {style} challenge".to_string(),
            salon_line: "of {salon}".to_string(),
            title_size: 34.0,
            subtitle_size: 22.0,
            body_size: 15.0,
            name_size: 30.0,
            footer_size: 11.0,
            title_top: 100.0,
            subtitle_gap: 32.0,
            rule_gap: 22.0,
            rule_width: 360.0,
            line_height: 38.0,
            watermark_size: 220.0,
            watermark_opacity: 0.06,
            watermark_rotation: 30.0,
            illustration_box: (150.0, 110.0),
            signature_box: (170.0, 48.0),
            signature_block_inset: 260.0,
            footer_inset: 30.0,
        }
    }
}

/// Geometry for the portfolio page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Shown on the logo plate when the logo image is missing.
    pub brand_name: String,
    pub plate_size: (f64, f64),
    pub plate_padding: f64,
    pub plate_chrome: CardChrome,
    pub header_size: f64,
    pub subtitle_size: f64,
    pub salon_size: f64,
    /// Gap between the logo plate and the header baseline.
    pub header_gap: f64,
    pub line_gap: f64,
    /// Gap between the last header line and the top of the grid.
    pub grid_gap: f64,
    pub column_gap: f64,
    pub row_gap: f64,
    /// Share of the grid height given to the step row; the hero gets the rest.
    pub step_row_share: f64,
    /// Hero card width as a share of the content width.
    pub hero_width_share: f64,
    pub card: CardStyle,
}

impl Default for PortfolioLayout {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            margin: 40.0,
            brand_name: "Style Challenge".to_string(),
            plate_size: (180.0, 70.0),
            plate_padding: 10.0,
            plate_chrome: CardChrome {
                fill_opacity: 1.0,
                corner_radius: 10.0,
                ..CardChrome::default()
            },
            header_size: 26.0,
            subtitle_size: 16.0,
            salon_size: 12.0,
            header_gap: 40.0,
            line_gap: 24.0,
            grid_gap: 22.0,
            column_gap: 14.0,
            row_gap: 18.0,
            step_row_share: 0.36,
            hero_width_share: 0.8,
            card: CardStyle::default(),
        }
    }
}

/// Document information written into every PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataDefaults {
    pub author: Option<String>,
    pub creator: String,
}

impl Default for MetadataDefaults {
    fn default() -> Self {
        Self {
            author: None,
            creator: "Style Challenge".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = RenderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = RenderConfig::from_json_str(
            r##"{
                "palette": { "gold": "#000000" },
                "certificate": { "title": "DIPLOMA", "lineHeight": 40 },
                "fonts": { "script": { "family": "Great Vibes" } }
            }"##,
        )
        .unwrap();
        assert_eq!(config.palette.gold, Color::BLACK);
        assert_eq!(config.palette.ink, Palette::default().ink);
        assert_eq!(config.certificate.title, "DIPLOMA");
        assert_eq!(config.certificate.line_height, 40.0);
        assert_eq!(config.certificate.name_size, 30.0);
        assert_eq!(config.fonts.script, FontKey::regular("Great Vibes"));
    }

    #[test]
    fn test_non_ascii_short_hex_falls_back_to_black() {
        let config = RenderConfig::from_json_str(r##"{ "palette": { "gold": "#éa" } }"##).unwrap();
        assert_eq!(config.palette.gold, Color::BLACK);
    }

    #[test]
    fn test_unknown_shape_is_parse_error() {
        let err = RenderConfig::from_json_str(r#"{ "certificate": { "lineHeight": "tall" } }"#)
            .unwrap_err();
        assert!(matches!(err, AtelierError::Parse { .. }));
    }
}
