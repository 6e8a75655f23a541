//! # Layout Algorithms
//!
//! Pure geometry on top of the page model: horizontal centering, contain
//! and cover fits for images, and centering of rotated text. The card
//! recipes that combine these live in [`card`].
//!
//! All math stays in `f64`. Nothing is rounded here; operands are only
//! formatted to fixed precision when the PDF content stream is written.

pub mod card;

use crate::canvas::{Page, Point, Rect, TextStyle};
use crate::font::{FontContext, FontKey, TextMetrics};
use crate::style::Color;

/// The x that centers `text` on a line of `line_width`.
///
/// `x = (line_width - text_width) / 2`. Text wider than the line yields a
/// negative x and overflows both sides equally.
pub fn center_x(text: &str, size: f64, font: &FontKey, line_width: f64, fonts: &FontContext) -> f64 {
    (line_width - fonts.text_width(text, font, size)) / 2.0
}

/// Draw `text` horizontally centered on the page with its baseline at `y`.
/// Returns the x it was drawn at.
pub fn draw_centered_text(
    page: &mut Page<'_>,
    fonts: &FontContext,
    text: &str,
    y: f64,
    font: &FontKey,
    size: f64,
    color: Color,
) -> f64 {
    let x = center_x(text, size, font, page.width, fonts);
    page.draw_text(text, TextStyle::new(x, y, font.clone(), size, color));
    x
}

/// Draw `text` centered horizontally within `rect`, baseline at `y`.
pub fn draw_text_centered_in(
    page: &mut Page<'_>,
    fonts: &FontContext,
    text: &str,
    rect: Rect,
    y: f64,
    font: &FontKey,
    size: f64,
    color: Color,
) -> f64 {
    let x = rect.x + center_x(text, size, font, rect.width, fonts);
    page.draw_text(text, TextStyle::new(x, y, font.clone(), size, color));
    x
}

/// Result of fitting an image into a box: the drawn size plus the offset of
/// the drawn image from the box's bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub draw_width: f64,
    pub draw_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Fit {
    /// The absolute placement of the image inside `target`.
    pub fn place_in(&self, target: Rect) -> Rect {
        Rect::new(
            target.x + self.offset_x,
            target.y + self.offset_y,
            self.draw_width,
            self.draw_height,
        )
    }
}

fn usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn fit_with_scale(asset_w: f64, asset_h: f64, target_w: f64, target_h: f64, scale: f64) -> Fit {
    let draw_width = asset_w * scale;
    let draw_height = asset_h * scale;
    Fit {
        draw_width,
        draw_height,
        offset_x: (target_w - draw_width) / 2.0,
        offset_y: (target_h - draw_height) / 2.0,
    }
}

/// Scale the asset to fit entirely inside the target, preserving aspect
/// ratio, and center it (letterbox or pillarbox).
///
/// Returns `None` when any dimension is zero, negative or not finite; such
/// an asset is treated as missing.
pub fn contain_fit(asset_w: f64, asset_h: f64, target_w: f64, target_h: f64) -> Option<Fit> {
    if !(usable(asset_w) && usable(asset_h) && usable(target_w) && usable(target_h)) {
        return None;
    }
    let scale = (target_w / asset_w).min(target_h / asset_h);
    Some(fit_with_scale(asset_w, asset_h, target_w, target_h, scale))
}

/// Scale the asset to cover the whole target, preserving aspect ratio, and
/// center it. Offsets are negative on the axis that overflows; the caller
/// clips to the target to crop.
pub fn cover_fit(asset_w: f64, asset_h: f64, target_w: f64, target_h: f64) -> Option<Fit> {
    if !(usable(asset_w) && usable(asset_h) && usable(target_w) && usable(target_h)) {
        return None;
    }
    let scale = (target_w / asset_w).max(target_h / asset_h);
    Some(fit_with_scale(asset_w, asset_h, target_w, target_h, scale))
}

/// The text origin (baseline start) that puts the visual center of text
/// with `metrics`, rotated counter-clockwise by `degrees` about its origin,
/// exactly on `center`.
pub fn rotated_text_origin(center: Point, metrics: &TextMetrics, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    // Center of the glyph box in unrotated text space.
    let local_x = metrics.width / 2.0;
    let local_y = (metrics.ascent + metrics.descent) / 2.0;
    Point::new(
        center.x - (local_x * cos - local_y * sin),
        center.y - (local_x * sin + local_y * cos),
    )
}
