//! Card recipes: drop-shadowed rounded cards, image cards with captions, and
//! placeholder cards for image slots that have nothing to show.
//!
//! A missing image never aborts a render. [`image_card`] routes an absent or
//! unusable asset to [`placeholder_card`], which keeps the slot's position
//! and label so the rest of the page lays out exactly as it would have.

use serde::{Deserialize, Serialize};

use crate::canvas::{Page, Rect, RectStyle};
use crate::font::{FontContext, FontKey};
use crate::image_loader::Asset;
use crate::style::Color;

use super::{contain_fit, draw_text_centered_in};

/// The two-layer card treatment: a soft shadow rect, then a rounded,
/// semi-opaque bordered card on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardChrome {
    /// The shadow is shifted right and down by this many points.
    pub shadow_offset: f64,
    pub shadow_color: Color,
    pub shadow_opacity: f64,
    pub corner_radius: f64,
    pub border_color: Color,
    pub border_width: f64,
    pub fill_color: Color,
    pub fill_opacity: f64,
}

impl Default for CardChrome {
    fn default() -> Self {
        Self {
            shadow_offset: 3.0,
            shadow_color: Color::BLACK,
            shadow_opacity: 0.18,
            corner_radius: 8.0,
            border_color: Color::hex("#d8c7a1"),
            border_width: 0.75,
            fill_color: Color::WHITE,
            fill_opacity: 0.92,
        }
    }
}

/// Everything an image or placeholder card needs besides its slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardStyle {
    pub chrome: CardChrome,
    /// Inner padding between the card edge and its content.
    pub padding: f64,
    /// Height of the caption strip at the bottom of image cards.
    pub caption_height: f64,
    pub caption_font: FontKey,
    pub caption_size: f64,
    pub caption_color: Color,
    pub placeholder_font: FontKey,
    pub placeholder_size: f64,
    pub placeholder_color: Color,
    /// Second line of a placeholder card, under the slot label.
    pub missing_text: String,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            chrome: CardChrome::default(),
            padding: 8.0,
            caption_height: 20.0,
            caption_font: FontKey::bold("Times"),
            caption_size: 11.0,
            caption_color: Color::hex("#3b2f2f"),
            placeholder_font: FontKey::regular("Times"),
            placeholder_size: 12.0,
            placeholder_color: Color::hex("#8a7f72"),
            missing_text: "Missing image".to_string(),
        }
    }
}

/// A named image slot placed at a fixed rect.
#[derive(Debug, Clone)]
pub struct CardSpec<'a> {
    pub label: String,
    pub rect: Rect,
    pub asset: &'a Asset,
}

/// What [`image_card`] ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardOutcome {
    /// The image was drawn at this rect.
    Image(Rect),
    Placeholder,
}

/// Draw the shadow and the card body for `rect`.
pub fn card_with_chrome(page: &mut Page<'_>, rect: Rect, chrome: &CardChrome) {
    page.draw_rect(
        rect.offset(chrome.shadow_offset, -chrome.shadow_offset),
        RectStyle {
            fill_color: Some(chrome.shadow_color),
            fill_opacity: Some(chrome.shadow_opacity),
            corner_radius: chrome.corner_radius,
            ..Default::default()
        },
    );
    page.draw_rect(
        rect,
        RectStyle {
            fill_color: Some(chrome.fill_color),
            fill_opacity: Some(chrome.fill_opacity),
            border_color: Some(chrome.border_color),
            border_width: chrome.border_width,
            corner_radius: chrome.corner_radius,
        },
    );
}

/// Card chrome plus two centered lines: the slot label and the
/// "missing" note.
pub fn placeholder_card(
    page: &mut Page<'_>,
    fonts: &FontContext,
    label: &str,
    rect: Rect,
    style: &CardStyle,
) {
    card_with_chrome(page, rect, &style.chrome);
    let center_y = rect.center().y;
    let size = style.placeholder_size;
    draw_text_centered_in(
        page,
        fonts,
        label,
        rect,
        center_y + size * 0.35,
        &style.placeholder_font,
        size,
        style.placeholder_color,
    );
    draw_text_centered_in(
        page,
        fonts,
        &style.missing_text,
        rect,
        center_y - size * 1.15,
        &style.placeholder_font,
        size * 0.85,
        style.placeholder_color,
    );
}

/// The area of an image card left for the image: the padded card minus the
/// caption strip.
pub fn image_area(rect: Rect, style: &CardStyle) -> Rect {
    Rect::new(
        rect.x + style.padding,
        rect.y + style.padding + style.caption_height,
        rect.width - 2.0 * style.padding,
        rect.height - 2.0 * style.padding - style.caption_height,
    )
}

/// Draw an image card for `spec`, or a placeholder if the slot is empty or
/// the image cannot be fitted.
pub fn image_card<'a>(
    page: &mut Page<'a>,
    fonts: &FontContext,
    spec: &CardSpec<'a>,
    style: &CardStyle,
) -> CardOutcome {
    let Some(image) = spec.asset.image() else {
        log::debug!("slot '{}' has no image, drawing placeholder", spec.label);
        placeholder_card(page, fonts, &spec.label, spec.rect, style);
        return CardOutcome::Placeholder;
    };

    let area = image_area(spec.rect, style);
    let (w, h) = image.size();
    let Some(fit) = contain_fit(w, h, area.width, area.height) else {
        log::warn!("slot '{}' image cannot be fitted, drawing placeholder", spec.label);
        placeholder_card(page, fonts, &spec.label, spec.rect, style);
        return CardOutcome::Placeholder;
    };

    card_with_chrome(page, spec.rect, &style.chrome);
    let placed = fit.place_in(area);
    page.draw_image(image, placed);

    let metrics = fonts.measure_text(&spec.label, &style.caption_font, style.caption_size);
    let baseline = spec.rect.y
        + style.padding
        + (style.caption_height - (metrics.ascent + metrics.descent)) / 2.0;
    draw_text_centered_in(
        page,
        fonts,
        &spec.label,
        spec.rect,
        baseline,
        &style.caption_font,
        style.caption_size,
        style.caption_color,
    );
    CardOutcome::Image(placed)
}
