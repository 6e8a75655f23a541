//! JSON render requests.
//!
//! A request bundles the text fields, one source string per image slot and
//! any custom fonts. Image sources may be data URIs, raw base64 or file
//! paths; one that cannot be read or decoded leaves its slot empty. Font
//! sources are not optional: a font that cannot be read or parsed fails the
//! whole request.
//!
//! ```json
//! {
//!   "fields": { "stylistName": "Jane Doe", "styleName": "Updo Masterclass",
//!               "date": "2025-11-09", "certificateId": "PC-001234" },
//!   "images": { "signature": "data:image/png;base64,..." },
//!   "fonts": [{ "family": "Great Vibes", "src": "./fonts/GreatVibes.ttf" }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::{AtelierError, DecodeError};
use crate::font::FontContext;
use crate::image_loader::{read_source_bytes, Asset};
use crate::template::certificate::{self, CertificateAssets, CertificateFields};
use crate::template::portfolio::{self, PortfolioAssets, PortfolioFields};

/// A custom TrueType font to register before rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    pub family: String,
    pub src: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateImages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioImages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateRequest {
    pub fields: CertificateFields,
    pub images: CertificateImages,
    pub fonts: Vec<FontEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioRequest {
    pub fields: PortfolioFields,
    pub images: PortfolioImages,
    pub fonts: Vec<FontEntry>,
}

fn resolve(src: &Option<String>) -> Asset {
    match src.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Asset::from_source(s),
        _ => Asset::Absent,
    }
}

/// A font context with the standard fonts plus every entry registered.
pub fn font_context(entries: &[FontEntry]) -> Result<FontContext, AtelierError> {
    let mut fonts = FontContext::new();
    for entry in entries {
        let data = read_source_bytes(&entry.src).map_err(|e| DecodeError::Font {
            family: entry.family.clone(),
            reason: e.to_string(),
        })?;
        fonts
            .registry_mut()
            .register(&entry.family, entry.weight, entry.italic, data)?;
    }
    Ok(fonts)
}

impl CertificateRequest {
    pub fn from_json(json: &str) -> Result<Self, AtelierError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn assets(&self) -> CertificateAssets {
        CertificateAssets {
            signature: resolve(&self.images.signature),
            illustration: resolve(&self.images.illustration),
        }
    }

    pub fn render(&self, config: &RenderConfig) -> Result<Vec<u8>, AtelierError> {
        let fonts = font_context(&self.fonts)?;
        certificate::render(&self.fields, &self.assets(), &fonts, config)
    }

    /// A filled-in request with no images, for `atelier example`.
    pub fn example() -> Self {
        Self {
            fields: CertificateFields {
                stylist_name: "Jane Doe".to_string(),
                salon_name: Some("Luxe Salon".to_string()),
                style_name: "Updo Masterclass".to_string(),
                date: "2025-11-09".to_string(),
                certificate_id: "PC-001234".to_string(),
                watermark: Some("PC".to_string()),
            },
            ..Default::default()
        }
    }
}

impl PortfolioRequest {
    pub fn from_json(json: &str) -> Result<Self, AtelierError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn assets(&self) -> PortfolioAssets {
        PortfolioAssets {
            step1: resolve(&self.images.step1),
            step2: resolve(&self.images.step2),
            step3: resolve(&self.images.step3),
            finished: resolve(&self.images.finished),
            logo: resolve(&self.images.logo),
            background: resolve(&self.images.background),
        }
    }

    pub fn render(&self, config: &RenderConfig) -> Result<Vec<u8>, AtelierError> {
        let fonts = font_context(&self.fonts)?;
        portfolio::render(&self.fields, &self.assets(), &fonts, config)
    }

    pub fn example() -> Self {
        Self {
            fields: PortfolioFields {
                stylist_name: "Jane Doe".to_string(),
                salon_name: Some("Luxe Salon".to_string()),
                challenge_title: "Updo Masterclass".to_string(),
            },
            ..Default::default()
        }
    }
}

/// Parse a certificate request and render it.
pub fn render_certificate_json(json: &str, config: &RenderConfig) -> Result<Vec<u8>, AtelierError> {
    CertificateRequest::from_json(json)?.render(config)
}

/// Parse a portfolio request and render it.
pub fn render_portfolio_json(json: &str, config: &RenderConfig) -> Result<Vec<u8>, AtelierError> {
    PortfolioRequest::from_json(json)?.render(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::tests::png_bytes;
    use base64::Engine;

    fn data_uri(bytes: &[u8]) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_parse_nested_request() {
        let req = CertificateRequest::from_json(
            r#"{
                "fields": { "stylistName": "Jane Doe", "styleName": "Bob", "date": "d", "certificateId": "1" },
                "images": { "signature": "" },
                "fonts": [{ "family": "Script", "src": "./missing.ttf", "italic": true }]
            }"#,
        )
        .unwrap();
        assert_eq!(req.fields.stylist_name, "Jane Doe");
        assert_eq!(req.fields.salon_name, None);
        assert_eq!(req.fonts[0].weight, 400);
        assert!(req.fonts[0].italic);
        assert!(!req.assets().signature.is_present());
    }

    #[test]
    fn test_image_sources_resolve_or_degrade() {
        let req = PortfolioRequest {
            images: PortfolioImages {
                step2: Some(data_uri(&png_bytes(8, 6, [10, 20, 30, 255]))),
                step3: Some("data:image/png;base64,bm90IGFuIGltYWdl".to_string()),
                ..Default::default()
            },
            ..PortfolioRequest::example()
        };
        let assets = req.assets();
        assert!(!assets.step1.is_present());
        assert!(assets.step2.is_present());
        assert!(!assets.step3.is_present());
    }

    #[test]
    fn test_unreadable_font_is_fatal() {
        let entries = vec![FontEntry {
            family: "Script".to_string(),
            src: "./definitely/not/here.ttf".to_string(),
            weight: 400,
            italic: false,
        }];
        match font_context(&entries) {
            Err(AtelierError::Decode(DecodeError::Font { family, .. })) => assert_eq!(family, "Script"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected font error"),
        }
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = render_portfolio_json("{ \"fields\": ", &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, AtelierError::Parse { .. }));
    }

    #[test]
    fn test_examples_render() {
        let config = RenderConfig::default();
        let json = serde_json::to_string(&CertificateRequest::example()).unwrap();
        let bytes = render_certificate_json(&json, &config).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let bytes = PortfolioRequest::example().render(&config).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }
}
