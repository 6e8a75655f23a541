//! The landscape certificate of completion.
//!
//! Paint order, bottom to top: watermark, double frame, illustration,
//! signature image, then rules and text.
//!
//! The body is laid out on a running cursor that starts one line below the
//! first rule and moves down by a fixed `line_height` per line, so a
//! missing salon line pulls everything under it up by one line.

use serde::{Deserialize, Serialize};

use crate::canvas::{LineStyle, Page, Point, Rect, RectStyle, TextStyle};
use crate::config::RenderConfig;
use crate::error::AtelierError;
use crate::font::FontContext;
use crate::image_loader::Asset;
use crate::layout::{contain_fit, draw_centered_text, rotated_text_origin};
use crate::pdf;

use super::{metadata, optional, slug, validate_required};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateFields {
    pub stylist_name: String,
    pub salon_name: Option<String>,
    pub style_name: String,
    pub date: String,
    pub certificate_id: String,
    /// Short text (usually initials) repeated faintly behind the page.
    pub watermark: Option<String>,
}

impl CertificateFields {
    /// Download name for the rendered file, e.g. `certificate-pc-001234.pdf`.
    pub fn file_name(&self) -> String {
        format!("certificate-{}.pdf", slug(&self.certificate_id))
    }

    fn validate(&self) -> Result<(), AtelierError> {
        validate_required(&[
            ("stylistName", self.stylist_name.as_str()),
            ("styleName", self.style_name.as_str()),
            ("date", self.date.as_str()),
            ("certificateId", self.certificate_id.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct CertificateAssets {
    pub signature: Asset,
    pub illustration: Asset,
}

/// Validate `fields` and lay out the certificate page.
pub fn compose<'a>(
    fields: &CertificateFields,
    assets: &'a CertificateAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Page<'a>, AtelierError> {
    fields.validate()?;

    let layout = &config.certificate;
    let theme = &config.fonts;
    let palette = &config.palette;
    let mut page = Page::new(layout.page_width, layout.page_height).with_margin(layout.margin);
    let width = page.width;

    if let Some(mark) = optional(&fields.watermark) {
        let metrics = fonts.measure_text(mark, &theme.serif_bold, layout.watermark_size);
        let origin = rotated_text_origin(page.bounds().center(), &metrics, layout.watermark_rotation);
        let mut style = TextStyle::new(
            origin.x,
            origin.y,
            theme.serif_bold.clone(),
            layout.watermark_size,
            palette.watermark,
        );
        style.opacity = Some(layout.watermark_opacity);
        style.rotation_degrees = Some(layout.watermark_rotation);
        page.draw_text(mark, style);
    }

    let outer = page.content_box();
    let inner = outer.inset(8.0);
    for (rect, border_width) in [(outer, 2.5), (inner, 0.75)] {
        page.draw_rect(
            rect,
            RectStyle {
                border_color: Some(palette.gold),
                border_width,
                ..Default::default()
            },
        );
    }

    // Footer geometry, computed up front so images go under the text.
    let footer_base = inner.y + layout.footer_inset;
    let date_y = footer_base + layout.footer_size * 1.6;
    let name_y = date_y + layout.footer_size * 2.0;
    let block_x = width - layout.signature_block_inset;
    let printed_name = fields.stylist_name.trim();
    let name_width = fonts.text_width(printed_name, &theme.serif_bold, layout.body_size);
    let name_center = block_x + name_width / 2.0;

    if let Some(image) = assets.illustration.image() {
        let (bw, bh) = layout.illustration_box;
        let target = Rect::new(inner.x + layout.footer_inset, footer_base, bw, bh);
        let (w, h) = image.size();
        match contain_fit(w, h, target.width, target.height) {
            Some(fit) => page.draw_image(image, fit.place_in(target)),
            None => log::warn!("illustration cannot be fitted, skipping"),
        }
    }

    if let Some(image) = assets.signature.image() {
        let (bw, bh) = layout.signature_box;
        // Centered on the printed name, not on the block.
        let target = Rect::new(name_center - bw / 2.0, name_y + layout.body_size, bw, bh);
        let (w, h) = image.size();
        match contain_fit(w, h, target.width, target.height) {
            Some(fit) => page.draw_image(image, fit.place_in(target)),
            None => log::warn!("signature cannot be fitted, skipping"),
        }
    }

    // Headings
    let title_y = page.height - layout.title_top;
    draw_centered_text(
        &mut page,
        fonts,
        &layout.title,
        title_y,
        &theme.serif_bold,
        layout.title_size,
        palette.ink,
    );
    let subtitle_y = title_y - layout.subtitle_gap;
    draw_centered_text(
        &mut page,
        fonts,
        &layout.subtitle,
        subtitle_y,
        &theme.script,
        layout.subtitle_size,
        palette.gold,
    );
    let first_rule_y = subtitle_y - layout.rule_gap;
    draw_rule(&mut page, first_rule_y, layout.rule_width, config);

    // Body
    let mut cursor = first_rule_y - layout.line_height;
    draw_centered_text(
        &mut page,
        fonts,
        &layout.intro,
        cursor,
        &theme.serif,
        layout.body_size,
        palette.muted,
    );
    cursor -= layout.line_height;
    draw_centered_text(
        &mut page,
        fonts,
        &printed_name.to_uppercase(),
        cursor,
        &theme.serif_bold,
        layout.name_size,
        palette.ink,
    );
    if let Some(salon) = optional(&fields.salon_name) {
        cursor -= layout.line_height;
        draw_centered_text(
            &mut page,
            fonts,
            &layout.salon_line.replace("{salon}", salon),
            cursor,
            &theme.serif,
            layout.body_size,
            palette.muted,
        );
    }
    cursor -= layout.line_height;
    draw_centered_text(
        &mut page,
        fonts,
        &layout.completion.replace("{style}", fields.style_name.trim()),
        cursor,
        &theme.serif,
        layout.body_size,
        palette.ink,
    );
    draw_rule(&mut page, cursor - layout.rule_gap, layout.rule_width, config);

    // Signature block
    page.draw_line(LineStyle {
        from: Point::new(block_x, name_y + layout.body_size * 0.9),
        to: Point::new(block_x + name_width, name_y + layout.body_size * 0.9),
        thickness: 0.5,
        color: palette.gold,
        opacity: None,
    });
    page.draw_text(
        printed_name,
        TextStyle::new(block_x, name_y, theme.serif_bold.clone(), layout.body_size, palette.ink),
    );
    page.draw_text(
        &format!("Date: {}", fields.date.trim()),
        TextStyle::new(block_x, date_y, theme.serif.clone(), layout.footer_size, palette.muted),
    );
    page.draw_text(
        &format!("Certificate No. {}", fields.certificate_id.trim()),
        TextStyle::new(block_x, footer_base, theme.serif.clone(), layout.footer_size, palette.muted),
    );

    log::debug!(
        "composed certificate {} ({} paint ops)",
        fields.certificate_id.trim(),
        page.ops().len()
    );
    Ok(page)
}

/// Compose and serialize the certificate.
pub fn render(
    fields: &CertificateFields,
    assets: &CertificateAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Vec<u8>, AtelierError> {
    let page = compose(fields, assets, fonts, config)?;
    let info = metadata(
        format!("Certificate of Completion - {}", fields.stylist_name.trim()),
        &fields.style_name,
        config,
    );
    pdf::serialize(&page, fonts, &info)
}

fn draw_rule(page: &mut Page<'_>, y: f64, length: f64, config: &RenderConfig) {
    let x = (page.width - length) / 2.0;
    page.draw_line(LineStyle {
        from: Point::new(x, y),
        to: Point::new(x + length, y),
        thickness: 1.0,
        color: config.palette.gold,
        opacity: None,
    });
}
