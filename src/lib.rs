//! # Atelier
//!
//! Certificate and portfolio PDF composition for the Style Challenge.
//!
//! Given a stylist's text fields and whatever images they uploaded, Atelier
//! lays out one fixed-size page and serializes it to PDF. Rendering is a
//! pure function of its inputs: no I/O, no globals, and identical input
//! always gives byte-identical output.
//!
//! A missing or broken image never fails a render. The slot degrades to a
//! labeled placeholder card and the rest of the page lays out as usual.
//!
//! ## Architecture
//!
//! ```text
//! Fields + Assets (or a JSON request)
//!       ↓
//!   [template] — validate, then lay out the certificate or portfolio
//!       ↓
//!   [layout]   — centering, contain/cover fits, cards and placeholders
//!       ↓
//!   [canvas]   — page model: an append-only paint list
//!       ↓
//!   [pdf]      — serialize to PDF bytes
//! ```

pub mod canvas;
pub mod config;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod pdf;
pub mod request;
pub mod style;
pub mod template;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::RenderConfig;
pub use error::{AtelierError, DecodeError};
pub use image_loader::{Asset, ImageAsset};
pub use request::{render_certificate_json, render_portfolio_json, CertificateRequest, PortfolioRequest};
pub use template::certificate::{compose as compose_certificate, CertificateAssets, CertificateFields};
pub use template::portfolio::{compose as compose_portfolio, PortfolioAssets, PortfolioFields};

use font::FontContext;

/// Render a certificate with the standard fonts and the default look.
pub fn render_certificate(
    fields: &CertificateFields,
    assets: &CertificateAssets,
) -> Result<Vec<u8>, AtelierError> {
    render_certificate_with(fields, assets, &FontContext::new(), &RenderConfig::default())
}

/// Render a certificate with caller-supplied fonts and configuration.
pub fn render_certificate_with(
    fields: &CertificateFields,
    assets: &CertificateAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Vec<u8>, AtelierError> {
    template::certificate::render(fields, assets, fonts, config)
}

/// Render a portfolio with the standard fonts and the default look.
pub fn render_portfolio(
    fields: &PortfolioFields,
    assets: &PortfolioAssets,
) -> Result<Vec<u8>, AtelierError> {
    render_portfolio_with(fields, assets, &FontContext::new(), &RenderConfig::default())
}

/// Render a portfolio with caller-supplied fonts and configuration.
pub fn render_portfolio_with(
    fields: &PortfolioFields,
    assets: &PortfolioAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Vec<u8>, AtelierError> {
    template::portfolio::render(fields, assets, fonts, config)
}
