//! The portrait portfolio page: background, logo plate, header, three step
//! cards and the "Finished Look" hero card.
//!
//! Whatever height is left under the header becomes the card grid. After
//! the row gap, the step row takes `step_row_share` of it and the hero card
//! takes the rest.

use serde::{Deserialize, Serialize};

use crate::canvas::{Page, Rect, RectStyle};
use crate::config::RenderConfig;
use crate::error::AtelierError;
use crate::font::FontContext;
use crate::image_loader::Asset;
use crate::layout::card::{card_with_chrome, image_card, CardSpec};
use crate::layout::{contain_fit, cover_fit, draw_centered_text, draw_text_centered_in};
use crate::pdf;

use super::{metadata, optional, slug, validate_required};

/// Labels of the four image slots, in paint order.
pub const SLOT_LABELS: [&str; 4] = ["Step 1", "Step 2", "Step 3", "Finished Look"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioFields {
    pub stylist_name: String,
    pub salon_name: Option<String>,
    pub challenge_title: String,
}

impl PortfolioFields {
    /// Download name for the rendered file, e.g. `portfolio-jane-doe.pdf`.
    pub fn file_name(&self) -> String {
        format!("portfolio-{}.pdf", slug(&self.stylist_name))
    }

    /// The page header, e.g. "Jane Doe’s Portfolio".
    pub fn header(&self) -> String {
        format!("{}\u{2019}s Portfolio", self.stylist_name.trim())
    }

    fn validate(&self) -> Result<(), AtelierError> {
        validate_required(&[
            ("stylistName", self.stylist_name.as_str()),
            ("challengeTitle", self.challenge_title.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioAssets {
    pub step1: Asset,
    pub step2: Asset,
    pub step3: Asset,
    pub finished: Asset,
    pub logo: Asset,
    pub background: Asset,
}

/// The grid rects: three step cards left to right, then the hero card.
pub fn grid_slots(content: Rect, grid_top: f64, config: &RenderConfig) -> [Rect; 4] {
    let layout = &config.portfolio;
    let usable = (grid_top - content.y - layout.row_gap).max(0.0);
    let step_h = usable * layout.step_row_share;
    let hero_h = usable - step_h;
    let step_y = grid_top - step_h;
    let step_w = (content.width - 2.0 * layout.column_gap) / 3.0;
    let step = |i: f64| Rect::new(content.x + i * (step_w + layout.column_gap), step_y, step_w, step_h);

    let hero_w = content.width * layout.hero_width_share;
    let hero = Rect::new(
        content.x + (content.width - hero_w) / 2.0,
        step_y - layout.row_gap - hero_h,
        hero_w,
        hero_h,
    );
    [step(0.0), step(1.0), step(2.0), hero]
}

/// Validate `fields` and lay out the portfolio page.
pub fn compose<'a>(
    fields: &PortfolioFields,
    assets: &'a PortfolioAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Page<'a>, AtelierError> {
    fields.validate()?;

    let layout = &config.portfolio;
    let theme = &config.fonts;
    let palette = &config.palette;
    let mut page = Page::new(layout.page_width, layout.page_height).with_margin(layout.margin);
    let bounds = page.bounds();
    let content = page.content_box();

    // Background
    let background = assets.background.image().and_then(|image| {
        let (w, h) = image.size();
        cover_fit(w, h, bounds.width, bounds.height).map(|fit| (image, fit))
    });
    match background {
        Some((image, fit)) => page.draw_image_clipped(image, fit.place_in(bounds), bounds),
        None => {
            log::debug!("no background texture, filling with parchment");
            page.draw_rect(
                bounds,
                RectStyle {
                    fill_color: Some(palette.parchment),
                    ..Default::default()
                },
            );
        }
    }

    // Logo plate
    let (plate_w, plate_h) = layout.plate_size;
    let plate = Rect::new(
        (page.width - plate_w) / 2.0,
        content.top() - plate_h,
        plate_w,
        plate_h,
    );
    card_with_chrome(&mut page, plate, &layout.plate_chrome);
    let logo_area = plate.inset(layout.plate_padding);
    let logo = assets.logo.image().and_then(|image| {
        let (w, h) = image.size();
        contain_fit(w, h, logo_area.width, logo_area.height).map(|fit| (image, fit))
    });
    match logo {
        Some((image, fit)) => page.draw_image(image, fit.place_in(logo_area)),
        None => {
            let size = layout.subtitle_size;
            draw_text_centered_in(
                &mut page,
                fonts,
                &layout.brand_name,
                plate,
                plate.center().y - size * 0.35,
                &theme.serif_bold,
                size,
                palette.ink,
            );
        }
    }

    // Header
    let mut cursor = plate.y - layout.header_gap;
    draw_centered_text(
        &mut page,
        fonts,
        &fields.header(),
        cursor,
        &theme.serif_bold,
        layout.header_size,
        palette.ink,
    );
    cursor -= layout.line_gap;
    draw_centered_text(
        &mut page,
        fonts,
        fields.challenge_title.trim(),
        cursor,
        &theme.script,
        layout.subtitle_size,
        palette.gold,
    );
    if let Some(salon) = optional(&fields.salon_name) {
        cursor -= layout.line_gap * 0.8;
        draw_centered_text(
            &mut page,
            fonts,
            salon,
            cursor,
            &theme.serif,
            layout.salon_size,
            palette.muted,
        );
    }

    // Cards
    let slots = grid_slots(content, cursor - layout.grid_gap, config);
    let slot_assets = [&assets.step1, &assets.step2, &assets.step3, &assets.finished];
    for ((label, rect), asset) in SLOT_LABELS.iter().zip(slots).zip(slot_assets) {
        let spec = CardSpec {
            label: label.to_string(),
            rect,
            asset,
        };
        image_card(&mut page, fonts, &spec, &layout.card);
    }

    log::debug!(
        "composed portfolio for {} ({} paint ops)",
        fields.stylist_name.trim(),
        page.ops().len()
    );
    Ok(page)
}

/// Compose and serialize the portfolio.
pub fn render(
    fields: &PortfolioFields,
    assets: &PortfolioAssets,
    fonts: &FontContext,
    config: &RenderConfig,
) -> Result<Vec<u8>, AtelierError> {
    let page = compose(fields, assets, fonts, config)?;
    let info = metadata(fields.header(), &fields.challenge_title, config);
    pdf::serialize(&page, fonts, &info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::tests::{jpeg_bytes, png_bytes};
    use crate::image_loader::ImageAsset;

    fn fields() -> PortfolioFields {
        PortfolioFields {
            stylist_name: "Jane Doe".to_string(),
            salon_name: Some("Luxe Salon".to_string()),
            challenge_title: "Updo Masterclass".to_string(),
        }
    }

    #[test]
    fn test_grid_shares_and_hero_centering() {
        let config = RenderConfig::default();
        let content = Rect::new(40.0, 40.0, 515.0, 762.0);
        let [s1, s2, s3, hero] = grid_slots(content, 600.0, &config);

        let usable = 600.0 - 40.0 - config.portfolio.row_gap;
        assert!((s1.height - usable * 0.36).abs() < 1e-9);
        assert!((hero.height - usable * 0.64).abs() < 1e-9);
        assert_eq!(s1.width, s2.width);
        assert_eq!(s2.width, s3.width);
        assert!((s3.right() - content.right()).abs() < 1e-9);
        assert!((s1.top() - 600.0).abs() < 1e-9);
        assert!((hero.y - content.y).abs() < 1e-9);
        assert!((hero.width - content.width * 0.8).abs() < 1e-9);
        assert!((hero.center().x - content.center().x).abs() < 1e-9);
    }

    #[test]
    fn test_all_slots_missing_gives_four_placeholders() {
        let fonts = FontContext::new();
        let config = RenderConfig::default();
        let assets = PortfolioAssets::default();
        let page = compose(&fields(), &assets, &fonts, &config).unwrap();

        for label in SLOT_LABELS {
            assert!(page.texts().any(|(t, _)| t == label), "{label}");
        }
        let missing = page.texts().filter(|(t, _)| *t == "Missing image").count();
        assert_eq!(missing, 4);
        assert_eq!(page.images().count(), 0);
        // brand name stands in for the logo
        assert!(page.texts().any(|(t, _)| t == config.portfolio.brand_name));
    }

    #[test]
    fn test_background_covers_page_with_clip() {
        let fonts = FontContext::new();
        let config = RenderConfig::default();
        let assets = PortfolioAssets {
            background: Asset::Present(ImageAsset::decode(&jpeg_bytes(100, 100)).unwrap()),
            ..Default::default()
        };
        let page = compose(&fields(), &assets, &fonts, &config).unwrap();

        let (_, placed) = page.images().next().unwrap();
        assert!(placed.width >= page.width - 1e-9);
        assert!(placed.height >= page.height - 1e-9);
        assert!(matches!(
            page.ops()[0],
            crate::canvas::PaintOp::Image { clip: Some(_), .. }
        ));
    }

    #[test]
    fn test_logo_sits_inside_plate() {
        let fonts = FontContext::new();
        let config = RenderConfig::default();
        let assets = PortfolioAssets {
            logo: Asset::Present(ImageAsset::decode(&png_bytes(400, 100, [200, 0, 0, 255])).unwrap()),
            ..Default::default()
        };
        let page = compose(&fields(), &assets, &fonts, &config).unwrap();

        let (_, logo) = page.images().next().unwrap();
        assert!((logo.center().x - page.width / 2.0).abs() < 1e-9);
        assert!(logo.top() <= page.height - config.portfolio.margin);
        assert!(!page.texts().any(|(t, _)| t == config.portfolio.brand_name));
    }

    #[test]
    fn test_header_and_salon_lines() {
        let fonts = FontContext::new();
        let config = RenderConfig::default();
        let assets = PortfolioAssets::default();
        let page = compose(&fields(), &assets, &fonts, &config).unwrap();
        let texts: Vec<&str> = page.texts().map(|(t, _)| t).collect();
        assert!(texts.contains(&"Jane Doe\u{2019}s Portfolio"));
        assert!(texts.contains(&"Updo Masterclass"));
        assert!(texts.contains(&"Luxe Salon"));
    }

    #[test]
    fn test_validation_names_both_fields() {
        let fonts = FontContext::new();
        let config = RenderConfig::default();
        let assets = PortfolioAssets::default();
        let blank = PortfolioFields::default();
        match compose(&blank, &assets, &fonts, &config) {
            Err(AtelierError::Validation { missing }) => {
                assert_eq!(missing, vec!["stylistName", "challengeTitle"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(fields().file_name(), "portfolio-jane-doe.pdf");
    }
}
