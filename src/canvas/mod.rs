//! # Page Model
//!
//! A single fixed-size page and its paint list. Coordinates are in points
//! with the origin at the bottom-left corner and y growing upward, which is
//! also PDF user space, so the serializer never has to flip anything.
//!
//! Drawing calls only append to the paint list. Z-order is insertion order:
//! whatever is drawn first ends up underneath.

use crate::font::FontKey;
use crate::image_loader::ImageAsset;
use crate::style::Color;

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. `y` is the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Negative sizes are clamped to zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Shrink by `amount` on every side.
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            self.width - 2.0 * amount,
            self.height - 2.0 * amount,
        )
    }

    /// Move by (`dx`, `dy`).
    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// A rect of the given size centered inside this one.
    pub fn centered(&self, width: f64, height: f64) -> Rect {
        Rect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Options for [`Page::draw_text`]. `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub x: f64,
    pub y: f64,
    pub font: FontKey,
    pub size: f64,
    pub color: Color,
    pub opacity: Option<f64>,
    pub rotation_degrees: Option<f64>,
}

impl TextStyle {
    pub fn new(x: f64, y: f64, font: FontKey, size: f64, color: Color) -> Self {
        Self {
            x,
            y,
            font,
            size,
            color,
            opacity: None,
            rotation_degrees: None,
        }
    }
}

/// Options for [`Page::draw_line`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub from: Point,
    pub to: Point,
    pub thickness: f64,
    pub color: Color,
    pub opacity: Option<f64>,
}

/// Options for [`Page::draw_rect`]. With neither a fill nor a border the
/// rect paints nothing but is still recorded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectStyle {
    pub fill_color: Option<Color>,
    pub fill_opacity: Option<f64>,
    pub border_color: Option<Color>,
    pub border_width: f64,
    pub corner_radius: f64,
}

/// One entry of the paint list.
#[derive(Debug, Clone)]
pub enum PaintOp<'a> {
    Text {
        text: String,
        style: TextStyle,
    },
    Line(LineStyle),
    Rect {
        rect: Rect,
        style: RectStyle,
    },
    /// The image is scaled to exactly fill `rect`. When `clip` is set,
    /// anything outside it is cut off (used for cover fits).
    Image {
        asset: &'a ImageAsset,
        rect: Rect,
        clip: Option<Rect>,
    },
}

/// A single page under construction. Images are borrowed from the caller
/// for as long as the page lives.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    ops: Vec<PaintOp<'a>>,
}

impl<'a> Page<'a> {
    /// A blank page of the given size in points.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            margin: 0.0,
            ops: Vec::new(),
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// The page area as a rect.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// The page area inside the margin.
    pub fn content_box(&self) -> Rect {
        self.bounds().inset(self.margin)
    }

    pub fn draw_text(&mut self, text: &str, style: TextStyle) {
        self.ops.push(PaintOp::Text {
            text: text.to_string(),
            style,
        });
    }

    pub fn draw_line(&mut self, style: LineStyle) {
        self.ops.push(PaintOp::Line(style));
    }

    pub fn draw_rect(&mut self, rect: Rect, style: RectStyle) {
        self.ops.push(PaintOp::Rect { rect, style });
    }

    /// Place `asset` scaled to exactly fill `rect`; no aspect correction.
    pub fn draw_image(&mut self, asset: &'a ImageAsset, rect: Rect) {
        self.ops.push(PaintOp::Image {
            asset,
            rect,
            clip: None,
        });
    }

    /// Like [`Page::draw_image`], clipped to `clip`.
    pub fn draw_image_clipped(&mut self, asset: &'a ImageAsset, rect: Rect, clip: Rect) {
        self.ops.push(PaintOp::Image {
            asset,
            rect,
            clip: Some(clip),
        });
    }

    /// The paint list in z-order.
    pub fn ops(&self) -> &[PaintOp<'a>] {
        &self.ops
    }

    /// All text ops as (text, style) pairs, in paint order.
    pub fn texts(&self) -> impl Iterator<Item = (&str, &TextStyle)> {
        self.ops.iter().filter_map(|op| match op {
            PaintOp::Text { text, style } => Some((text.as_str(), style)),
            _ => None,
        })
    }

    /// All image placements, in paint order.
    pub fn images(&self) -> impl Iterator<Item = (&'a ImageAsset, Rect)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            PaintOp::Image { asset, rect, .. } => Some((*asset, *rect)),
            _ => None,
        })
    }
}
