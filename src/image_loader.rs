//! # Image Loading and Decoding
//!
//! Turns raw bytes (or a data URI / base64 / file path source) into an
//! [`ImageAsset`] ready for PDF embedding. JPEG images pass through without
//! re-encoding (the PDF spec supports DCTDecode natively). PNG and WebP
//! images are decoded to RGB pixels with a separate alpha channel for SMask
//! transparency.
//!
//! Decode failures never abort a render: [`Asset::from_bytes`] and
//! [`Asset::from_source`] log the problem and return [`Asset::Absent`], which
//! the layout layer renders as a placeholder card.

use std::io::Cursor;

use crate::error::DecodeError;

/// A decoded image with known intrinsic size.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// How an image is stored in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// JPEG passthrough.
    Photographic,
    /// Decoded pixels, optionally with transparency.
    Flat,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
    /// Four-component JPEG. Files carrying an Adobe APP14 marker store
    /// inverted CMYK and need a `/Decode` array to flip it back.
    DeviceCMYK { adobe_inverted: bool },
}

impl ImageAsset {
    pub fn encoding(&self) -> ImageEncoding {
        match self.pixel_data {
            ImagePixelData::Jpeg { .. } => ImageEncoding::Photographic,
            ImagePixelData::Decoded { .. } => ImageEncoding::Flat,
        }
    }

    /// Decode raw image bytes. Zero-sized images are rejected.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let image = decode_image_bytes(data)?;
        if image.width_px == 0 || image.height_px == 0 {
            return Err(DecodeError::ZeroDimension);
        }
        Ok(image)
    }

    /// Intrinsic size in pixels as floats, for layout math.
    pub fn size(&self) -> (f64, f64) {
        (self.width_px as f64, self.height_px as f64)
    }
}

/// An image slot that may or may not hold a usable image.
#[derive(Debug, Clone, Default)]
pub enum Asset {
    Present(ImageAsset),
    #[default]
    Absent,
}

impl Asset {
    /// Decode bytes, degrading to `Absent` when they cannot be used.
    pub fn from_bytes(data: &[u8]) -> Self {
        match ImageAsset::decode(data) {
            Ok(image) => Asset::Present(image),
            Err(e) => {
                log::warn!("image could not be decoded, using placeholder: {}", e);
                Asset::Absent
            }
        }
    }

    /// Like [`Asset::from_bytes`], treating `None` as an empty slot.
    pub fn from_optional_bytes(data: Option<&[u8]>) -> Self {
        data.map(Self::from_bytes).unwrap_or(Asset::Absent)
    }

    /// Resolve and decode a source string (see [`load_image`]).
    pub fn from_source(src: &str) -> Self {
        match load_image(src) {
            Ok(image) => Asset::Present(image),
            Err(e) => {
                log::warn!("image source could not be loaded, using placeholder: {}", e);
                Asset::Absent
            }
        }
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        match self {
            Asset::Present(image) => Some(image),
            Asset::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Asset::Present(_))
    }
}

impl From<ImageAsset> for Asset {
    fn from(image: ImageAsset) -> Self {
        Asset::Present(image)
    }
}

/// Load an image from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` — data URI
/// - File path (absolute or relative) — reads from disk
/// - Raw base64-encoded image data
pub fn load_image(src: &str) -> Result<ImageAsset, DecodeError> {
    let raw_bytes = read_source_bytes(src)?;
    ImageAsset::decode(&raw_bytes)
}

/// Resolve a source string (data URI, path, or raw base64) to bytes.
pub(crate) fn read_source_bytes(src: &str) -> Result<Vec<u8>, DecodeError> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| DecodeError::Source("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes count as paths; base64 may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return std::fs::read(src)
                .map_err(|e| DecodeError::Source(format!("failed to read '{}': {}", src, e)));
        }
        #[cfg(target_arch = "wasm32")]
        {
            return Err(DecodeError::Source(format!(
                "file paths are not supported in WASM: '{}'",
                src
            )));
        }
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Detect image format from magic bytes and decode accordingly.
fn decode_image_bytes(data: &[u8]) -> Result<ImageAsset, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::TooShort);
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) || is_webp(data) {
        decode_flat(data)
    } else {
        Err(DecodeError::UnsupportedFormat)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// JPEG: decode the whole scan to reject truncated or corrupt files, then
/// keep the original bytes for DCTDecode passthrough.
fn decode_jpeg(data: &[u8]) -> Result<ImageAsset, DecodeError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| DecodeError::Image(format!("JPEG: {}", e)))?;

    Ok(ImageAsset {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: img.width(),
        height_px: img.height(),
    })
}

/// Scan JPEG markers up to the SOF (Start of Frame) segment. The component
/// count picks the color space; an APP14 "Adobe" segment seen on the way
/// marks four-component data as inverted.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut adobe = false;
    let mut i = 2; // skip SOI marker (FF D8)
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        if marker == 0xEE && data.get(i + 4..i + 9) == Some(&b"Adobe"[..]) {
            adobe = true;
        }
        // SOF markers: C0-C3, C5-C7, C9-CB, CD-CF
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) + precision(1) + height(2) + width(2) + num_components(1)
            return match data[i + 9] {
                1 => JpegColorSpace::DeviceGray,
                4 => JpegColorSpace::DeviceCMYK {
                    adobe_inverted: adobe,
                },
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG / WebP: decode to RGBA, split into RGB + alpha.
fn decode_flat(data: &[u8]) -> Result<ImageAsset, DecodeError> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DecodeError::Image(format!("format detection: {}", e)))?;

    let img = reader
        .decode()
        .map_err(|e| DecodeError::Image(e.to_string()))?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            has_transparency = true;
        }
    }

    Ok(ImageAsset {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: if has_transparency { Some(alpha) } else { None },
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |_, _| image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
        assert!(is_webp(b"RIFF\x00\x00\x00\x00WEBPVP8 "));
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(matches!(
            load_image("data:image/png;base64"),
            Err(DecodeError::Source(_))
        ));
    }

    #[test]
    fn test_too_short_and_unsupported() {
        assert_eq!(
            ImageAsset::decode(&[0x00, 0x01]).unwrap_err(),
            DecodeError::TooShort
        );
        assert_eq!(
            ImageAsset::decode(&[0x00, 0x01, 0x02, 0x03, 0x04]).unwrap_err(),
            DecodeError::UnsupportedFormat
        );
    }

    #[test]
    fn test_decode_opaque_png_is_flat_without_alpha() {
        let loaded = ImageAsset::decode(&png_bytes(1, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        assert_eq!(loaded.encoding(), ImageEncoding::Flat);
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none(), "Fully opaque should have no alpha");
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let loaded = ImageAsset::decode(&png_bytes(1, 1, [255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_ref().unwrap(), &[128]);
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_jpeg_passthrough() {
        let bytes = jpeg_bytes(4, 2);
        let loaded = ImageAsset::decode(&bytes).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (4, 2));
        assert_eq!(loaded.encoding(), ImageEncoding::Photographic);
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, &bytes);
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_truncated_jpeg_is_absent() {
        let bytes = jpeg_bytes(64, 64);
        let sos = bytes
            .windows(2)
            .position(|w| w == [0xFFu8, 0xDA])
            .expect("encoder writes a scan");
        let truncated = &bytes[..sos + 20];
        assert!(ImageAsset::decode(truncated).is_err());
        assert!(!Asset::from_bytes(truncated).is_present());
    }

    /// SOI, optional APP14 Adobe segment, then an SOF0 header with
    /// `components` channels. Enough for the marker scan.
    fn jpeg_header(components: u8, adobe: bool) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        if adobe {
            out.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
            out.extend_from_slice(b"Adobe");
            out.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x02]);
        }
        let len = 8 + 3 * components as u16;
        out.extend_from_slice(&[0xFF, 0xC0]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&[0x08, 0x00, 0x10, 0x00, 0x10, components]);
        for c in 0..components {
            out.extend_from_slice(&[c + 1, 0x11, 0x00]);
        }
        out
    }

    #[test]
    fn test_jpeg_color_space_by_components() {
        assert_eq!(detect_jpeg_color_space(&jpeg_header(1, false)), JpegColorSpace::DeviceGray);
        assert_eq!(detect_jpeg_color_space(&jpeg_header(3, false)), JpegColorSpace::DeviceRGB);
        assert_eq!(
            detect_jpeg_color_space(&jpeg_header(4, false)),
            JpegColorSpace::DeviceCMYK {
                adobe_inverted: false
            }
        );
        assert_eq!(
            detect_jpeg_color_space(&jpeg_header(4, true)),
            JpegColorSpace::DeviceCMYK {
                adobe_inverted: true
            }
        );
    }

    #[test]
    fn test_garbage_bytes_become_absent() {
        assert!(!Asset::from_bytes(b"not an image at all").is_present());
        assert!(!Asset::from_optional_bytes(None).is_present());
    }

    #[test]
    fn test_data_uri_source() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 2, [0, 255, 0, 255]));
        let asset = Asset::from_source(&format!("data:image/png;base64,{}", b64));
        let image = asset.image().expect("data URI should decode");
        assert_eq!(image.size(), (3.0, 2.0));
    }

    #[test]
    fn test_missing_file_source_is_absent() {
        assert!(!Asset::from_source("/definitely/not/here.png").is_present());
    }
}
