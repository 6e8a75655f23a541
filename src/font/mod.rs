//! # Font Management
//!
//! Font lookup and exact text measurement.
//!
//! The standard PDF fonts (Times, Helvetica, Courier) need no embedding and
//! are measured from their AFM advance widths. Custom TrueType/OpenType
//! faces are parsed with ttf-parser when they are registered; a face that
//! fails to parse is a fatal [`DecodeError`], because templates cannot draw
//! without their fonts.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// A font reference: family plus weight and slant.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontKey {
    pub family: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

impl FontKey {
    pub fn new(family: &str, weight: u32, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            weight,
            italic,
        }
    }

    pub fn regular(family: &str) -> Self {
        Self::new(family, 400, false)
    }

    pub fn bold(family: &str) -> Self {
        Self::new(family, 700, false)
    }

    pub fn italic(family: &str) -> Self {
        Self::new(family, 400, true)
    }

    /// Weights snap to regular (400) or bold (700).
    fn snapped(&self) -> Self {
        Self {
            family: self.family.clone(),
            weight: if self.weight >= 600 { 700 } else { 400 },
            italic: self.italic,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that is embedded in the output.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(family: &str, data: &[u8]) -> Result<Self, DecodeError> {
        let face = ttf_parser::Face::parse(data, 0).map_err(|e| DecodeError::Font {
            family: family.to_string(),
            reason: e.to_string(),
        })?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(DecodeError::Font {
                family: family.to_string(),
                reason: "units per em is zero".to_string(),
            });
        }

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                }
            }
        }

        // Unmapped characters are drawn as .notdef, so they take its advance.
        let default_advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(units_per_em);

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts Atelier has metrics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Obliques share the advance widths of their upright faces.
    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD,
            Self::TimesRoman => &metrics::TIMES_ROMAN,
            Self::TimesBold => &metrics::TIMES_BOLD,
            Self::TimesItalic => &metrics::TIMES_ITALIC,
            Self::Courier
            | Self::CourierBold
            | Self::CourierOblique
            | Self::CourierBoldOblique => &metrics::COURIER,
        }
    }
}

/// A font registry that maps font family + weight + style to font data.
pub struct FontRegistry {
    fonts: BTreeMap<FontKey, FontData>,
    fallback: FontData,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = BTreeMap::new();

        let standard_mappings = [
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Times", 400, false), StandardFont::TimesRoman),
            (("Times", 700, false), StandardFont::TimesBold),
            (("Times", 400, true), StandardFont::TimesItalic),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(FontKey::new(family, weight, italic), FontData::Standard(font));
        }

        Self {
            fonts,
            fallback: FontData::Standard(StandardFont::Helvetica),
        }
    }

    /// The registered key a request resolves to.
    ///
    /// Lookup order: exact match, snapped weight, same family upright,
    /// then Helvetica with the requested weight and slant.
    pub fn resolve_key(&self, key: &FontKey) -> FontKey {
        if self.fonts.contains_key(key) {
            return key.clone();
        }

        let snapped = key.snapped();
        if self.fonts.contains_key(&snapped) {
            return snapped;
        }

        let upright = FontKey {
            italic: false,
            ..snapped.clone()
        };
        if self.fonts.contains_key(&upright) {
            return upright;
        }

        let helvetica = FontKey {
            family: "Helvetica".to_string(),
            ..snapped
        };
        if self.fonts.contains_key(&helvetica) {
            return helvetica;
        }
        FontKey::regular("Helvetica")
    }

    /// Look up a font, falling back to Helvetica if not found.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        let resolved = self.resolve_key(key);
        self.fonts.get(&resolved).unwrap_or(&self.fallback)
    }

    /// Register a custom font. Fails if the font data cannot be parsed.
    pub fn register(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<(), DecodeError> {
        let metrics = CustomFontMetrics::from_font_data(family, &data)?;
        log::debug!(
            "registered font '{}' weight {} italic {} ({} glyphs)",
            family,
            weight,
            italic,
            metrics.glyph_ids.len()
        );
        self.fonts.insert(
            FontKey::new(family, weight, italic),
            FontData::Custom { data, metrics },
        );
        Ok(())
    }

    /// Iterate over all registered fonts in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&FontKey, &FontData)> {
        self.fonts.iter()
    }
}

/// Measurements of a run of text at a given size, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    /// Ascent minus descent.
    pub height: f64,
    pub ascent: f64,
    /// Negative: distance below the baseline.
    pub descent: f64,
}

/// Per-render font context used by layout and PDF serialization.
/// Provides text measurement with real glyph metrics.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, font: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(font) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Measure a string: advance width plus vertical extents.
    pub fn measure_text(&self, text: &str, font: &FontKey, font_size: f64) -> TextMetrics {
        let (width, ascent, descent) = match self.registry.resolve(font) {
            FontData::Standard(std_font) => {
                let m = std_font.metrics();
                (
                    m.measure_string(text, font_size, 0.0),
                    m.ascender as f64 / 1000.0 * font_size,
                    m.descender as f64 / 1000.0 * font_size,
                )
            }
            FontData::Custom { metrics: m, .. } => {
                let upem = m.units_per_em as f64;
                (
                    text.chars().map(|ch| m.char_width(ch, font_size)).sum(),
                    m.ascender as f64 / upem * font_size,
                    m.descender as f64 / upem * font_size,
                )
            }
        };
        TextMetrics {
            width,
            height: ascent - descent,
            ascent,
            descent,
        }
    }

    /// Width of a string in points.
    pub fn text_width(&self, text: &str, font: &FontKey, font_size: f64) -> f64 {
        self.measure_text(text, font, font_size).width
    }

    /// Resolve a font key to its font data.
    pub fn resolve(&self, font: &FontKey) -> &FontData {
        self.registry.resolve(font)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', &FontKey::regular("Helvetica"), 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('B', &FontKey::regular("Times"), 12.0);
        let bold = ctx.char_width('B', &FontKey::bold("Times"), 12.0);
        assert!(bold >= regular);
        let regular = ctx.text_width("Updo", &FontKey::regular("Times"), 12.0);
        let bold = ctx.text_width("Updo", &FontKey::bold("Times"), 12.0);
        assert!(bold > regular, "Bold text should be wider than regular");
    }

    #[test]
    fn test_measure_text_exact_times() {
        let ctx = FontContext::new();
        // T(611) + o(500) = 1111 units
        let m = ctx.measure_text("To", &FontKey::regular("Times"), 10.0);
        assert!((m.width - 11.11).abs() < 1e-9);
        assert!((m.ascent - 6.83).abs() < 1e-9);
        assert!((m.descent + 2.17).abs() < 1e-9);
        assert!((m.height - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let w1 = ctx.char_width('A', &FontKey::regular("Helvetica"), 12.0);
        let w2 = ctx.char_width('A', &FontKey::regular("UnknownFont"), 12.0);
        assert!((w1 - w2).abs() < 0.001);
    }

    #[test]
    fn test_font_context_weight_resolution() {
        let ctx = FontContext::new();
        let w700 = ctx.char_width('A', &FontKey::new("Times", 700, false), 12.0);
        let w800 = ctx.char_width('A', &FontKey::new("Times", 800, false), 12.0);
        assert!((w700 - w800).abs() < 0.001);
    }

    #[test]
    fn test_bold_italic_times_falls_back_to_bold_upright() {
        let registry = FontRegistry::new();
        let key = registry.resolve_key(&FontKey::new("Times", 700, true));
        assert_eq!(key, FontKey::bold("Times"));
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut registry = FontRegistry::new();
        let err = registry
            .register("Script", 400, false, vec![0, 1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, DecodeError::Font { ref family, .. } if family == "Script"));
    }

    const SCRIPT_TTF: &[u8] = include_bytes!("../../tests/fixtures/atelier-test-script.ttf");

    #[test]
    fn test_custom_metrics_from_truetype() {
        let metrics = CustomFontMetrics::from_font_data("Script", SCRIPT_TTF).unwrap();
        assert_eq!(metrics.units_per_em, 2048);
        assert_eq!(metrics.advance_widths[&'A'], 1331);
        assert_eq!(metrics.advance_widths[&' '], 512);
        assert_eq!(metrics.glyph_ids[&'a'], 28);
        // .notdef, not space
        assert_eq!(metrics.default_advance, 1434);
        assert!((metrics.char_width('\u{00E9}', 2048.0) - 1434.0).abs() < 1e-9);
        assert_eq!(metrics.ascender, 1638);
        assert_eq!(metrics.descender, -410);
    }

    #[test]
    fn test_custom_face_measured_through_context() {
        let mut ctx = FontContext::new();
        ctx.registry_mut()
            .register("Script", 400, false, SCRIPT_TTF.to_vec())
            .unwrap();
        let key = FontKey::regular("Script");
        // W(1800) + i(520) = 2320 units
        let m = ctx.measure_text("Wi", &key, 20.48);
        assert!((m.width - 23.2).abs() < 1e-9);
        assert!((m.ascent - 16.38).abs() < 1e-9);
    }

    #[test]
    fn test_font_key_deserialize_defaults() {
        let key: FontKey = serde_json::from_str(r#"{ "family": "Times" }"#).unwrap();
        assert_eq!(key, FontKey::regular("Times"));
    }
}
