//! # PDF Serializer
//!
//! Flattens a [`Page`]'s paint list into a single-page PDF 1.7 file.
//!
//! This is a from-scratch writer: the subset of PDF needed for certificates
//! and portfolios (text, lines, rounded rects, images, constant opacity) is
//! small enough to emit directly.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, images, page, content stream, ...)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Determinism
//!
//! Output depends only on the paint list, the fonts and the metadata. Fonts
//! and opacity states are collected into ordered maps, images are numbered
//! in paint order, and no timestamps are written, so identical input gives
//! byte-identical files.
//!
//! ## Font Embedding
//!
//! Standard fonts use simple Type1 references with WinAnsiEncoding. Custom
//! TrueType fonts are embedded whole as CIDFontType2 with Identity-H
//! encoding: FontFile2, FontDescriptor, CIDFont, ToUnicode CMap, and the
//! root Type0 dictionary.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;
use serde::{Deserialize, Serialize};

use crate::canvas::{LineStyle, Page, PaintOp, Rect, RectStyle, TextStyle};
use crate::error::AtelierError;
use crate::font::metrics::winansi_byte;
use crate::font::{FontContext, FontData, FontKey};
use crate::image_loader::{ImageAsset, ImagePixelData, JpegColorSpace};

/// Document information written to the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

/// Serialize a page to PDF bytes.
pub fn serialize(page: &Page<'_>, fonts: &FontContext, metadata: &Metadata) -> Result<Vec<u8>, AtelierError> {
    PdfWriter::new().write(page, metadata, fonts)
}

pub struct PdfWriter;

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedding data for a custom TrueType font.
struct CustomFontEmbedData {
    /// Maps characters to glyph IDs in the embedded font.
    char_to_gid: BTreeMap<char, u16>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Resolved font key -> object id, in resource order (/F0, /F1, ...).
    font_objects: Vec<(FontKey, usize)>,
    /// Embedding data for custom fonts, keyed by resolved FontKey.
    custom_font_data: BTreeMap<FontKey, CustomFontEmbedData>,
    /// XObject ids for image ops, in paint order (/Im0, /Im1, ...).
    image_objects: Vec<usize>,
    /// Quantized opacity (0..1000) -> ExtGState object id.
    ext_gstates: BTreeMap<u16, usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write one page to a PDF byte vector.
    pub fn write(
        &self,
        page: &Page<'_>,
        metadata: &Metadata,
        font_context: &FontContext,
    ) -> Result<Vec<u8>, AtelierError> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_font_data: BTreeMap::new(),
            image_objects: Vec::new(),
            ext_gstates: BTreeMap::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, images, graphics states, content stream, page, info
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: vec![] });
        }

        self.register_fonts(&mut builder, page, font_context)?;
        self.register_images(&mut builder, page);
        self.register_ext_gstates(&mut builder, page);

        let content = self.build_content_stream(page, &builder, font_context);
        let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

        let content_obj_id = builder.objects.len();
        let mut content_data: Vec<u8> = Vec::new();
        let _ = write!(
            content_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed.len()
        );
        content_data.extend_from_slice(&compressed);
        content_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject { data: content_data });

        let page_obj_id = builder.objects.len();
        let page_dict = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Contents {} 0 R /Resources << {} >> >>",
            num(page.width),
            num(page.height),
            content_obj_id,
            self.build_resource_dict(&builder)
        );
        builder.objects.push(PdfObject {
            data: page_dict.into_bytes(),
        });

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        builder.objects[2].data =
            format!("<< /Type /Pages /Kids [{} 0 R] /Count 1 >>", page_obj_id).into_bytes();

        let info_obj_id = builder.objects.len();
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::pdf_text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", Self::pdf_text_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject {} ", Self::pdf_text_string(subject));
        }
        if let Some(ref creator) = metadata.creator {
            let _ = write!(info, "/Creator {} ", Self::pdf_text_string(creator));
        }
        let _ = write!(
            info,
            "/Producer (Atelier {}) >>",
            env!("CARGO_PKG_VERSION")
        );
        builder.objects.push(PdfObject {
            data: info.into_bytes(),
        });

        log::debug!(
            "serialized page {}x{}: {} ops, {} fonts, {} images",
            page.width,
            page.height,
            page.ops().len(),
            builder.font_objects.len(),
            builder.image_objects.len()
        );

        Ok(self.serialize(&builder, info_obj_id))
    }

    fn build_resource_dict(&self, builder: &PdfBuilder) -> String {
        let mut resources = String::new();
        let fonts = builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(resources, "/Font << {} >>", fonts);

        if !builder.image_objects.is_empty() {
            let images = builder
                .image_objects
                .iter()
                .enumerate()
                .map(|(i, obj_id)| format!("/Im{} {} 0 R", i, obj_id))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(resources, " /XObject << {} >>", images);
        }

        if !builder.ext_gstates.is_empty() {
            let states = builder
                .ext_gstates
                .iter()
                .map(|(k, obj_id)| format!("/GS{} {} 0 R", k, obj_id))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(resources, " /ExtGState << {} >>", states);
        }

        resources
    }

    /// Build the PDF content stream for the page.
    fn build_content_stream(&self, page: &Page<'_>, builder: &PdfBuilder, fonts: &FontContext) -> String {
        let mut stream = String::new();
        let mut image_counter = 0usize;

        for op in page.ops() {
            match op {
                PaintOp::Text { text, style } => {
                    self.write_text(&mut stream, text, style, builder, fonts);
                }
                PaintOp::Line(line) => self.write_line(&mut stream, line),
                PaintOp::Rect { rect, style } => self.write_rect(&mut stream, rect, style),
                PaintOp::Image { rect, clip, .. } => {
                    let idx = image_counter;
                    image_counter += 1;
                    let _ = writeln!(stream, "q");
                    if let Some(c) = clip {
                        let _ = write!(
                            stream,
                            "{:.2} {:.2} {:.2} {:.2} re\nW\nn\n",
                            num(c.x),
                            num(c.y),
                            num(c.width),
                            num(c.height)
                        );
                    }
                    let _ = write!(
                        stream,
                        "{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        num(rect.width),
                        num(rect.height),
                        num(rect.x),
                        num(rect.y),
                        idx
                    );
                }
            }
        }

        stream
    }

    fn write_gs(stream: &mut String, opacity: Option<f64>) {
        if let Some(k) = quantize_opacity(opacity) {
            let _ = writeln!(stream, "/GS{} gs", k);
        }
    }

    fn write_text(
        &self,
        stream: &mut String,
        text: &str,
        style: &TextStyle,
        builder: &PdfBuilder,
        fonts: &FontContext,
    ) {
        let key = fonts.registry().resolve_key(&style.font);
        let font_idx = builder
            .font_objects
            .iter()
            .position(|(k, _)| *k == key)
            .unwrap_or(0);

        let _ = writeln!(stream, "q");
        Self::write_gs(stream, style.opacity);
        let c = style.color;
        let _ = write!(
            stream,
            "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.2} Tf\n",
            c.r,
            c.g,
            c.b,
            font_idx,
            num(style.size)
        );

        let (sin, cos) = num(style.rotation_degrees.unwrap_or(0.0))
            .to_radians()
            .sin_cos();
        let _ = write!(
            stream,
            "{:.5} {:.5} {:.5} {:.5} {:.2} {:.2} Tm\n",
            num(cos),
            num(sin),
            num(-sin),
            num(cos),
            num(style.x),
            num(style.y)
        );

        if let Some(embed) = builder.custom_font_data.get(&key) {
            let mut hex = String::new();
            for ch in text.chars() {
                let gid = embed.char_to_gid.get(&ch).copied().unwrap_or(0);
                let _ = write!(hex, "{:04X}", gid);
            }
            let _ = write!(stream, "<{}> Tj\n", hex);
        } else {
            let _ = write!(stream, "({}) Tj\n", Self::encode_winansi(text));
        }

        let _ = write!(stream, "ET\nQ\n");
    }

    fn write_line(&self, stream: &mut String, line: &LineStyle) {
        let _ = writeln!(stream, "q");
        Self::write_gs(stream, line.opacity);
        let c = line.color;
        let _ = write!(
            stream,
            "{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
            c.r,
            c.g,
            c.b,
            num(line.thickness),
            num(line.from.x),
            num(line.from.y),
            num(line.to.x),
            num(line.to.y)
        );
    }

    fn write_rect(&self, stream: &mut String, rect: &Rect, style: &RectStyle) {
        if let Some(fill) = style.fill_color {
            let _ = writeln!(stream, "q");
            Self::write_gs(stream, style.fill_opacity);
            let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", fill.r, fill.g, fill.b);
            self.write_rect_path(stream, rect, style.corner_radius);
            let _ = write!(stream, "f\nQ\n");
        }

        if let Some(border) = style.border_color {
            if style.border_width > 0.0 {
                let _ = write!(
                    stream,
                    "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n",
                    border.r,
                    border.g,
                    border.b,
                    num(style.border_width)
                );
                self.write_rect_path(stream, rect, style.corner_radius);
                let _ = write!(stream, "S\nQ\n");
            }
        }
    }

    fn write_rect_path(&self, stream: &mut String, rect: &Rect, radius: f64) {
        let (x, y, w, h) = (num(rect.x), num(rect.y), num(rect.width), num(rect.height));
        let r = num(radius).min(w / 2.0).min(h / 2.0).max(0.0);
        if r <= 0.0 {
            let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, y, w, h);
            return;
        }

        // Cubic Bézier approximation of a quarter circle.
        let k = 0.5522847498 * r;

        let _ = writeln!(stream, "{:.2} {:.2} m", x + r, y);
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w - r, y);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w - r + k,
            y,
            x + w,
            y + r - k,
            x + w,
            y + r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w, y + h - r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w,
            y + h - r + k,
            x + w - r + k,
            y + h,
            x + w - r,
            y + h
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + r, y + h);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + r - k,
            y + h,
            x,
            y + h - r + k,
            x,
            y + h - r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x, y + r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x,
            y + r - k,
            x + r - k,
            y,
            x + r,
            y
        );
        let _ = writeln!(stream, "h");
    }

    /// Register the fonts used by text ops. Each resolved (family, weight,
    /// italic) gets one font object, in key order.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        page: &Page<'_>,
        font_context: &FontContext,
    ) -> Result<(), AtelierError> {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for (text, style) in page.texts() {
            let key = font_context.registry().resolve_key(&style.font);
            font_chars.entry(key).or_default().extend(text.chars());
        }

        // Always have at least Helvetica
        if font_chars.is_empty() {
            font_chars.insert(FontKey::regular("Helvetica"), BTreeSet::new());
        }

        for (key, used_chars) in &font_chars {
            match font_context.resolve(key) {
                FontData::Standard(std_font) => {
                    let obj_id = builder.objects.len();
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.objects.push(PdfObject {
                        data: font_dict.into_bytes(),
                    });
                    builder.font_objects.push((key.clone(), obj_id));
                }
                FontData::Custom { data, .. } => {
                    let type0_obj_id =
                        Self::write_custom_font_objects(builder, key, data, used_chars)?;
                    builder.font_objects.push((key.clone(), type0_obj_id));
                }
            }
        }

        Ok(())
    }

    /// Create one XObject per image op, in paint order.
    fn register_images(&self, builder: &mut PdfBuilder, page: &Page<'_>) {
        for (asset, _) in page.images() {
            let xobj_id = Self::write_image_xobject(builder, asset);
            builder.image_objects.push(xobj_id);
        }
    }

    /// Create one ExtGState per distinct opacity below 1.
    fn register_ext_gstates(&self, builder: &mut PdfBuilder, page: &Page<'_>) {
        let mut levels: BTreeSet<u16> = BTreeSet::new();
        for op in page.ops() {
            let opacity = match op {
                PaintOp::Text { style, .. } => style.opacity,
                PaintOp::Line(line) => line.opacity,
                PaintOp::Rect { style, .. } if style.fill_color.is_some() => style.fill_opacity,
                _ => None,
            };
            if let Some(k) = quantize_opacity(opacity) {
                levels.insert(k);
            }
        }

        for k in levels {
            let obj_id = builder.objects.len();
            let alpha = k as f64 / 1000.0;
            builder.objects.push(PdfObject {
                data: format!("<< /Type /ExtGState /ca {:.3} /CA {:.3} >>", alpha, alpha)
                    .into_bytes(),
            });
            builder.ext_gstates.insert(k, obj_id);
        }
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &ImageAsset) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let (color_space_str, decode) = match color_space {
                    JpegColorSpace::DeviceRGB => ("/DeviceRGB", ""),
                    JpegColorSpace::DeviceGray => ("/DeviceGray", ""),
                    JpegColorSpace::DeviceCMYK { adobe_inverted } => (
                        "/DeviceCMYK",
                        if *adobe_inverted {
                            " /Decode [1 0 1 0 1 0 1 0]"
                        } else {
                            ""
                        },
                    ),
                };

                let obj_id = builder.objects.len();
                let mut obj_data: Vec<u8> = Vec::new();
                let _ = write!(
                    obj_data,
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace {}{} \
                     /BitsPerComponent 8 \
                     /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space_str,
                    decode,
                    data.len()
                );
                obj_data.extend_from_slice(data);
                obj_data.extend_from_slice(b"\nendstream");
                builder.objects.push(PdfObject { data: obj_data });
                obj_id
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                // Write SMask first if alpha channel exists
                let smask_id = alpha.as_ref().map(|alpha_data| {
                    let compressed_alpha = compress_to_vec_zlib(alpha_data, 6);
                    let smask_obj_id = builder.objects.len();
                    let mut smask_data: Vec<u8> = Vec::new();
                    let _ = write!(
                        smask_data,
                        "<< /Type /XObject /Subtype /Image \
                         /Width {} /Height {} \
                         /ColorSpace /DeviceGray \
                         /BitsPerComponent 8 \
                         /Filter /FlateDecode \
                         /Length {} >>\nstream\n",
                        image.width_px,
                        image.height_px,
                        compressed_alpha.len()
                    );
                    smask_data.extend_from_slice(&compressed_alpha);
                    smask_data.extend_from_slice(b"\nendstream");
                    builder.objects.push(PdfObject { data: smask_data });
                    smask_obj_id
                });

                let compressed_rgb = compress_to_vec_zlib(rgb, 6);
                let obj_id = builder.objects.len();
                let smask_ref = smask_id
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();

                let mut obj_data: Vec<u8> = Vec::new();
                let _ = write!(
                    obj_data,
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace /DeviceRGB \
                     /BitsPerComponent 8 \
                     /Filter /FlateDecode \
                     /Length {}{} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    compressed_rgb.len(),
                    smask_ref
                );
                obj_data.extend_from_slice(&compressed_rgb);
                obj_data.extend_from_slice(b"\nendstream");
                builder.objects.push(PdfObject { data: obj_data });
                obj_id
            }
        }
    }

    /// Write the 5 CIDFont PDF objects for a custom TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: &FontKey,
        ttf_data: &[u8],
        used_chars: &BTreeSet<char>,
    ) -> Result<usize, AtelierError> {
        let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
            AtelierError::Render(format!(
                "failed to parse TTF data for font '{}': {}",
                key.family, e
            ))
        })?;

        let units_per_em = face.units_per_em().max(1);
        let ascender = face.ascender();
        let descender = face.descender();

        let char_to_gid: BTreeMap<char, u16> = used_chars
            .iter()
            .filter_map(|&ch| face.glyph_index(ch).map(|gid| (ch, gid.0)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(&key.family, key.weight, key.italic);

        // 1. FontFile2 stream
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let fontfile2_id = builder.objects.len();
        let mut fontfile2_data: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile2_data,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed_ttf.len(),
            ttf_data.len()
        );
        fontfile2_data.extend_from_slice(&compressed_ttf);
        fontfile2_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: fontfile2_data,
        });

        // 2. FontDescriptor
        let font_descriptor_id = builder.objects.len();
        let bbox = face.global_bounding_box();
        let scale = 1000.0 / units_per_em as f64;
        let cap_height = face.capital_height().unwrap_or(ascender) as f64 * scale;
        let stem_v = if key.weight >= 700 { 120 } else { 80 };
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            if key.italic { -12 } else { 0 },
            (ascender as f64 * scale) as i32,
            (descender as f64 * scale) as i32,
            cap_height as i32,
            stem_v,
            fontfile2_id,
        );
        builder.objects.push(PdfObject {
            data: font_descriptor_dict.into_bytes(),
        });

        // 3. CIDFont dictionary (DescendantFont)
        let cidfont_id = builder.objects.len();
        let w_array = Self::build_w_array(&char_to_gid, &face, units_per_em);
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale).round() as u32)
            .unwrap_or(1000);
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        builder.objects.push(PdfObject {
            data: cidfont_dict.into_bytes(),
        });

        // 4. ToUnicode CMap
        let tounicode_id = builder.objects.len();
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let mut tounicode_data: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode_data.extend_from_slice(&compressed_cmap);
        tounicode_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: tounicode_data,
        });

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0_id = builder.objects.len();
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        builder.objects.push(PdfObject {
            data: type0_dict.into_bytes(),
        });

        builder
            .custom_font_data
            .insert(key.clone(), CustomFontEmbedData { char_to_gid });

        Ok(type0_id)
    }

    /// Build the /W array for per-glyph widths in CIDFont.
    /// Format: [gid [width] gid [width] ...]
    fn build_w_array(
        char_to_gid: &BTreeMap<char, u16>,
        face: &ttf_parser::Face,
        units_per_em: u16,
    ) -> String {
        let scale = 1000.0 / units_per_em as f64;
        let gids: BTreeSet<u16> = char_to_gid.values().copied().collect();

        let mut result = String::from("[");
        for gid in gids {
            let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
            let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale).round() as u32);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap for text extraction/copy-paste support.
    fn build_tounicode_cmap(char_to_gid: &BTreeMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        gid_to_unicode.sort();
        gid_to_unicode.dedup_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // PDF limits beginbfchar to 100 entries per block
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = write!(cmap, "<{:04X}> <", gid);
                let mut units = [0u16; 2];
                let c = char::from_u32(unicode).unwrap_or('\u{FFFD}');
                for u in c.encode_utf16(&mut units) {
                    let _ = write!(cmap, "{:04X}", u);
                }
                cmap.push_str(">\n");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }

    /// Sanitize a font name for use as a PDF name object.
    /// Strips spaces and special characters, appends weight/style suffixes.
    fn sanitize_font_name(family: &str, weight: u32, italic: bool) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();

        if name.is_empty() {
            name = "CustomFont".to_string();
        }
        if weight >= 700 {
            name.push_str("-Bold");
        }
        if italic {
            name.push_str("-Italic");
        }

        name
    }

    /// Escape special characters in a PDF literal string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// A PDF text string: a literal for ASCII, UTF-16BE hex otherwise.
    fn pdf_text_string(s: &str) -> String {
        if s.is_ascii() {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    /// Encode text for a standard font as an escaped WinAnsi literal body.
    /// Characters outside WinAnsi become `?`.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::new();
        for ch in text.chars() {
            let b = winansi_byte(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

/// Non-finite numbers are written as zero, and so is negative zero.
fn num(v: f64) -> f64 {
    if v.is_finite() {
        v + 0.0
    } else {
        0.0
    }
}

/// Opacity in thousandths, or `None` when the op is fully opaque.
fn quantize_opacity(opacity: Option<f64>) -> Option<u16> {
    let o = num(opacity?).clamp(0.0, 1.0);
    let k = (o * 1000.0).round() as u16;
    if k >= 1000 {
        None
    } else {
        Some(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Point;
    use crate::image_loader::tests::png_bytes;
    use crate::style::Color;
    use miniz_oxide::inflate::decompress_to_vec_zlib;

    /// Inflate every FlateDecode stream and return the concatenated text.
    fn inflated_streams(pdf: &[u8]) -> String {
        let mut out = String::new();
        let mut rest = pdf;
        while let Some(pos) = find(rest, b"stream\n") {
            let start = pos + b"stream\n".len();
            let Some(end) = find(&rest[start..], b"\nendstream") else {
                break;
            };
            if let Ok(data) = decompress_to_vec_zlib(&rest[start..start + end]) {
                out.push_str(&String::from_utf8_lossy(&data));
            }
            rest = &rest[start + end + b"\nendstream".len()..];
        }
        out
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn text_page() -> Page<'static> {
        let mut page = Page::new(842.0, 595.0);
        page.draw_text(
            "Hello (World)",
            TextStyle::new(54.0, 500.0, FontKey::regular("Times"), 12.0, Color::BLACK),
        );
        page
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(PdfWriter::escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_pdf_text_string_unicode() {
        assert_eq!(PdfWriter::pdf_text_string("Ab"), "(Ab)");
        assert_eq!(PdfWriter::pdf_text_string("Jo’s"), "<FEFF004A006F20190073>");
    }

    #[test]
    fn test_empty_page_produces_valid_pdf() {
        let fonts = FontContext::new();
        let bytes = serialize(&Page::new(595.0, 842.0), &fonts, &Metadata::default()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        assert!(bytes.windows(4).any(|w| w == b"xref"));
        assert!(bytes.windows(7).any(|w| w == b"trailer"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/MediaBox [0 0 595.00 842.00]"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let fonts = FontContext::new();
        let metadata = Metadata {
            title: Some("Certificate - Jane Doe".to_string()),
            author: Some("Style Challenge".to_string()),
            subject: None,
            creator: None,
        };
        let bytes = serialize(&Page::new(10.0, 10.0), &fonts, &metadata).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Title (Certificate - Jane Doe)"));
        assert!(text.contains("/Author (Style Challenge)"));
        assert!(text.contains("/Producer (Atelier"));
    }

    #[test]
    fn test_text_is_escaped_in_content_stream() {
        let fonts = FontContext::new();
        let bytes = serialize(&text_page(), &fonts, &Metadata::default()).unwrap();
        let content = inflated_streams(&bytes);
        assert!(content.contains("(Hello \\(World\\)) Tj"));
        assert!(content.contains("1.00000 0.00000 0.00000 1.00000 54.00 500.00 Tm"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/BaseFont /Times-Roman"));
        assert!(!text.contains("CIDFontType2"));
    }

    #[test]
    fn test_winansi_encoding_of_curly_quote() {
        assert_eq!(PdfWriter::encode_winansi("Jo’s"), "Jo\\222s");
        assert_eq!(PdfWriter::encode_winansi("漢"), "?");
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let fonts = FontContext::new();
        let mut page = text_page();
        page.draw_text(
            "B",
            TextStyle::new(54.0, 480.0, FontKey::bold("Times"), 12.0, Color::BLACK),
        );
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/BaseFont /Times-Roman"));
        assert!(text.contains("/BaseFont /Times-Bold"));
    }

    #[test]
    fn test_opacity_creates_ext_gstate() {
        let fonts = FontContext::new();
        let mut page = Page::new(100.0, 100.0);
        let mut style = TextStyle::new(0.0, 0.0, FontKey::regular("Times"), 40.0, Color::BLACK);
        style.opacity = Some(0.06);
        style.rotation_degrees = Some(90.0);
        page.draw_text("PC", style);
        page.draw_rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            RectStyle {
                fill_color: Some(Color::WHITE),
                fill_opacity: Some(1.0),
                ..Default::default()
            },
        );
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("<< /Type /ExtGState /ca 0.060 /CA 0.060 >>"));
        assert!(text.contains("/ExtGState << /GS60"));
        let content = inflated_streams(&bytes);
        assert!(content.contains("/GS60 gs"));
        assert!(content.contains("0.00000 1.00000 -1.00000 0.00000 0.00 0.00 Tm"));
    }

    #[test]
    fn test_rounded_rect_uses_curves() {
        let fonts = FontContext::new();
        let mut page = Page::new(100.0, 100.0);
        page.draw_rect(
            Rect::new(10.0, 10.0, 50.0, 30.0),
            RectStyle {
                border_color: Some(Color::BLACK),
                border_width: 1.0,
                corner_radius: 6.0,
                ..Default::default()
            },
        );
        page.draw_line(LineStyle {
            from: Point::new(0.0, 5.0),
            to: Point::new(100.0, 5.0),
            thickness: 1.5,
            color: Color::BLACK,
            opacity: None,
        });
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let content = inflated_streams(&bytes);
        assert!(content.contains(" c\n"));
        assert!(content.contains("h\nS\nQ"));
        assert!(content.contains("0.00 5.00 m\n100.00 5.00 l\nS"));
    }

    #[test]
    fn test_images_become_xobjects_in_paint_order() {
        let fonts = FontContext::new();
        let opaque = ImageAsset::decode(&png_bytes(2, 2, [1, 2, 3, 255])).unwrap();
        let translucent = ImageAsset::decode(&png_bytes(2, 2, [1, 2, 3, 100])).unwrap();
        let mut page = Page::new(100.0, 100.0);
        page.draw_image(&opaque, Rect::new(0.0, 0.0, 20.0, 20.0));
        page.draw_image_clipped(
            &translucent,
            Rect::new(-10.0, 0.0, 120.0, 100.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/XObject << /Im0"));
        assert!(text.contains("/Im1"));
        assert!(text.contains("/SMask"));
        let content = inflated_streams(&bytes);
        assert!(content.contains("20.0000 0 0 20.0000 0.00 0.00 cm\n/Im0 Do"));
        assert!(content.contains("0.00 0.00 100.00 100.00 re\nW\nn\n120.0000 0 0 100.0000 -10.00 0.00 cm\n/Im1 Do"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let fonts = FontContext::new();
        let a = serialize(&text_page(), &fonts, &Metadata::default()).unwrap();
        let b = serialize(&text_page(), &fonts, &Metadata::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_finite_numbers_are_zeroed() {
        let fonts = FontContext::new();
        let mut page = Page::new(100.0, 100.0);
        page.draw_text(
            "x",
            TextStyle::new(f64::NAN, f64::INFINITY, FontKey::regular("Times"), 12.0, Color::BLACK),
        );
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let content = inflated_streams(&bytes);
        assert!(content.contains("0.00 0.00 Tm"));
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(PdfWriter::sanitize_font_name("Inter", 400, false), "Inter");
        assert_eq!(PdfWriter::sanitize_font_name("Great Vibes", 400, false), "GreatVibes");
        assert_eq!(PdfWriter::sanitize_font_name("Inter", 700, true), "Inter-Bold-Italic");
        assert_eq!(PdfWriter::sanitize_font_name("(  )", 400, false), "CustomFont");
    }

    #[test]
    fn test_tounicode_cmap_format() {
        let mut char_to_gid = BTreeMap::new();
        char_to_gid.insert('A', 36u16);
        char_to_gid.insert('B', 37u16);

        let cmap = PdfWriter::build_tounicode_cmap(&char_to_gid, "TestFont");

        assert!(cmap.contains("begincmap"));
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0025> <0042>"));
        assert!(cmap.contains("<0000> <FFFF>"));
    }

    const SCRIPT_TTF: &[u8] = include_bytes!("../../tests/fixtures/atelier-test-script.ttf");

    #[test]
    fn test_w_array_rounds_to_nearest() {
        let face = ttf_parser::Face::parse(SCRIPT_TTF, 0).unwrap();
        let mut char_to_gid = BTreeMap::new();
        for ch in [' ', 'A', 'a', 'b'] {
            char_to_gid.insert(ch, face.glyph_index(ch).unwrap().0);
        }
        // 512, 1331 and 1030 units on a 2048 em: 250, 649.9 and 502.9.
        assert_eq!(
            PdfWriter::build_w_array(&char_to_gid, &face, 2048),
            "[ 1 [250] 2 [650] 28 [503] 29 [503] ]"
        );
    }

    #[test]
    fn test_custom_font_text_is_glyph_ids() {
        let mut fonts = FontContext::new();
        fonts
            .registry_mut()
            .register("Script", 400, false, SCRIPT_TTF.to_vec())
            .unwrap();
        let mut page = Page::new(100.0, 100.0);
        page.draw_text(
            "Ab\u{00E9}",
            TextStyle::new(10.0, 10.0, FontKey::regular("Script"), 12.0, Color::BLACK),
        );
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/DW 700"));
        assert!(text.contains("/CIDToGIDMap /Identity"));
        // 'é' is unmapped and written as glyph 0.
        assert!(inflated_streams(&bytes).contains("<0002001D0000> Tj"));
    }

    #[test]
    fn test_adobe_cmyk_jpeg_gets_decode_array() {
        let fonts = FontContext::new();
        let image = ImageAsset {
            pixel_data: ImagePixelData::Jpeg {
                data: vec![0xFF, 0xD8, 0xFF, 0xD9],
                color_space: JpegColorSpace::DeviceCMYK {
                    adobe_inverted: true,
                },
            },
            width_px: 2,
            height_px: 2,
        };
        let mut page = Page::new(100.0, 100.0);
        page.draw_image(&image, Rect::new(0.0, 0.0, 20.0, 20.0));
        let bytes = serialize(&page, &fonts, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/ColorSpace /DeviceCMYK /Decode [1 0 1 0 1 0 1 0]"));
    }

    #[test]
    fn test_quantize_opacity() {
        assert_eq!(quantize_opacity(None), None);
        assert_eq!(quantize_opacity(Some(1.0)), None);
        assert_eq!(quantize_opacity(Some(0.92)), Some(920));
        assert_eq!(quantize_opacity(Some(-3.0)), Some(0));
    }
}
