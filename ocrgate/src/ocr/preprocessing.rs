use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{
    DynamicImage, GenericImageView, GrayImage, ImageError, ImageReader, Limits, Luma, Rgb,
    RgbImage,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::OcrConfig;

#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The bytes are not a decodable image. Callers report this as a client error.
    #[error("not a valid image: {0}")]
    InvalidImage(String),

    #[error("image normalization failed: {0}")]
    Internal(String),
}

/// Color layouts a normalized image can have. Neither carries alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalColor {
    Gray,
    Rgb,
}

/// JPEG bytes that satisfy the submission constraints.
///
/// Only [`normalize_image`] builds one, so holding a value means the bytes decode as
/// JPEG, carry no alpha channel and fit within the configured maximum dimension.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    color: CanonicalColor,
}

impl NormalizedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Reader positioned at the start of the encoded image.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color(&self) -> CanonicalColor {
        self.color
    }
}

/// Normalize uploaded image bytes for the Read API.
///
/// 1. Decodes any format the `image` crate recognizes, within the configured decode limits
/// 2. Composites transparent pixels over white, converts other layouts to RGB
/// 3. Downscales with Lanczos3 so the longer side is at most `max_image_dimension`
/// 4. Re-encodes as JPEG in memory
pub fn normalize_image(
    bytes: &[u8],
    config: &OcrConfig,
) -> std::result::Result<NormalizedImage, NormalizeError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| NormalizeError::InvalidImage(format!("failed to read image: {e}")))?;
    reader.limits(decode_limits(config));
    let format = reader.format();

    let img = reader.decode().map_err(classify_decode_error)?;

    let (width, height) = img.dimensions();
    info!(
        format = ?format,
        color = ?img.color(),
        width,
        height,
        "Decoded uploaded image"
    );

    let img = flatten_color(img);
    let img = downscale_to_fit(img, config.max_image_dimension);

    let color = match img {
        DynamicImage::ImageLuma8(_) => CanonicalColor::Gray,
        DynamicImage::ImageRgb8(_) => CanonicalColor::Rgb,
        ref other => {
            return Err(NormalizeError::Internal(format!(
                "unexpected color type after flattening: {:?}",
                other.color()
            )))
        }
    };

    let (width, height) = img.dimensions();
    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, config.jpeg_quality);
    img.write_with_encoder(encoder)
        .map_err(|e| NormalizeError::Internal(format!("failed to encode JPEG: {e}")))?;

    info!(
        width,
        height,
        bytes = output.len(),
        "Image normalized to JPEG"
    );

    Ok(NormalizedImage {
        bytes: output,
        width,
        height,
        color,
    })
}

/// Caps canvas size and decoder allocations. A small compressed upload can
/// otherwise expand into hundreds of megabytes of pixels.
fn decode_limits(config: &OcrConfig) -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(config.max_decode_dimension);
    limits.max_image_height = Some(config.max_decode_dimension);
    limits.max_alloc = Some(config.max_decode_pixels.saturating_mul(4));
    limits
}

fn classify_decode_error(err: ImageError) -> NormalizeError {
    match err {
        ImageError::Encoding(_) | ImageError::Parameter(_) => {
            NormalizeError::Internal(format!("failed to decode image: {err}"))
        }
        // Unsupported, Decoding, Limits and truncated-stream IO errors all come from the input.
        _ => NormalizeError::InvalidImage(err.to_string()),
    }
}

/// Reduce the image to 8-bit gray or RGB without alpha.
///
/// Alpha is composited over an opaque white background rather than dropped, so
/// transparent regions read as paper instead of whatever color the hidden pixels had.
fn flatten_color(img: DynamicImage) -> DynamicImage {
    let color = img.color();

    if color.has_alpha() {
        debug!(color = ?color, "Compositing alpha channel over white");
        return if color.has_color() {
            DynamicImage::ImageRgb8(composite_rgba_over_white(&img))
        } else {
            DynamicImage::ImageLuma8(composite_luma_alpha_over_white(&img))
        };
    }

    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        other => {
            debug!(color = ?other.color(), "Converting image to RGB");
            DynamicImage::ImageRgb8(other.to_rgb8())
        }
    }
}

fn blend_over_white(channel: u8, alpha: u8) -> u8 {
    let c = u32::from(channel);
    let a = u32::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

fn composite_rgba_over_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        Rgb([
            blend_over_white(p[0], p[3]),
            blend_over_white(p[1], p[3]),
            blend_over_white(p[2], p[3]),
        ])
    })
}

fn composite_luma_alpha_over_white(img: &DynamicImage) -> GrayImage {
    let la = img.to_luma_alpha8();
    GrayImage::from_fn(la.width(), la.height(), |x, y| {
        let p = la.get_pixel(x, y);
        Luma([blend_over_white(p[0], p[1])])
    })
}

/// Target size with the longer side clamped to `max_dim`, or `None` if it already fits.
fn scaled_dimensions(width: u32, height: u32, max_dim: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dim {
        return None;
    }

    let scale = |side: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max_dim) + u64::from(longest) / 2)
            / u64::from(longest);
        (scaled as u32).max(1)
    };

    if width >= height {
        Some((max_dim, scale(height)))
    } else {
        Some((scale(width), max_dim))
    }
}

fn downscale_to_fit(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    match scaled_dimensions(width, height, max_dim) {
        Some((new_width, new_height)) => {
            info!(
                from = %format!("{width}x{height}"),
                to = %format!("{new_width}x{new_height}"),
                "Downscaling image"
            );
            img.resize_exact(new_width, new_height, FilterType::Lanczos3)
        }
        None => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, LumaA, Rgba, RgbaImage};

    fn create_test_config() -> OcrConfig {
        OcrConfig::default()
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut Cursor::new(&mut output), format).unwrap();
        output
    }

    fn decode_jpeg(normalized: &NormalizedImage) -> DynamicImage {
        image::load_from_memory_with_format(normalized.as_bytes(), ImageFormat::Jpeg)
            .expect("normalized output should decode as JPEG")
    }

    #[test]
    fn test_png_rgb_is_reencoded_as_jpeg() {
        let png = encode(&DynamicImage::new_rgb8(120, 80), ImageFormat::Png);
        let normalized = normalize_image(&png, &create_test_config()).unwrap();

        assert_eq!(
            image::guess_format(normalized.as_bytes()).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(normalized.dimensions(), (120, 80));
        assert_eq!(normalized.color(), CanonicalColor::Rgb);
    }

    #[test]
    fn test_transparent_background_becomes_white() {
        let mut rgba = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0]));
        for x in 24..40 {
            for y in 24..40 {
                rgba.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let png = encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

        let normalized = normalize_image(&png, &create_test_config()).unwrap();
        let decoded = decode_jpeg(&normalized);

        assert!(!decoded.color().has_alpha());
        let rgb = decoded.to_rgb8();
        let corner = rgb.get_pixel(2, 2);
        assert!(
            corner.0.iter().all(|&c| c >= 245),
            "transparent corner should render white, got {corner:?}"
        );
        let center = rgb.get_pixel(32, 32);
        assert!(
            center.0.iter().all(|&c| c <= 10),
            "opaque center should stay black, got {center:?}"
        );
    }

    #[test]
    fn test_gray_alpha_composites_to_gray() {
        let la = image::ImageBuffer::from_pixel(32, 32, LumaA([0u8, 0u8]));
        let png = encode(&DynamicImage::ImageLumaA8(la), ImageFormat::Png);

        let normalized = normalize_image(&png, &create_test_config()).unwrap();
        assert_eq!(normalized.color(), CanonicalColor::Gray);
        let decoded = decode_jpeg(&normalized).to_luma8();
        assert!(decoded.get_pixel(16, 16)[0] >= 245);
    }

    #[test]
    fn test_grayscale_stays_grayscale() {
        let png = encode(&DynamicImage::new_luma8(50, 40), ImageFormat::Png);
        let normalized = normalize_image(&png, &create_test_config()).unwrap();
        assert_eq!(normalized.color(), CanonicalColor::Gray);
        assert_eq!(decode_jpeg(&normalized).color(), image::ColorType::L8);
    }

    #[test]
    fn test_sixteen_bit_image_converted_to_rgb() {
        let png = encode(&DynamicImage::new_luma16(30, 30), ImageFormat::Png);
        let normalized = normalize_image(&png, &create_test_config()).unwrap();
        assert_eq!(normalized.color(), CanonicalColor::Rgb);
    }

    #[test]
    fn test_canvas_wider_than_decode_limit_is_invalid_image() {
        let png = encode(&DynamicImage::new_luma8(12_000, 4), ImageFormat::Png);
        let result = normalize_image(&png, &create_test_config());
        assert!(matches!(result, Err(NormalizeError::InvalidImage(_))));
    }

    #[test]
    fn test_canvas_over_pixel_budget_is_invalid_image() {
        let config = OcrConfig {
            max_decode_pixels: 100_000,
            ..create_test_config()
        };
        let png = encode(&DynamicImage::new_rgba8(1000, 1000), ImageFormat::Png);
        let result = normalize_image(&png, &config);
        assert!(matches!(result, Err(NormalizeError::InvalidImage(_))));

        let small = encode(&DynamicImage::new_rgba8(100, 100), ImageFormat::Png);
        assert!(normalize_image(&small, &config).is_ok());
    }

    #[test]
    fn test_small_canonical_image_keeps_dimensions() {
        let jpeg = encode(&DynamicImage::new_rgb8(640, 480), ImageFormat::Jpeg);
        let once = normalize_image(&jpeg, &create_test_config()).unwrap();
        let twice = normalize_image(once.as_bytes(), &create_test_config()).unwrap();

        assert_eq!(once.dimensions(), (640, 480));
        assert_eq!(twice.dimensions(), (640, 480));
        assert_eq!(once.color(), twice.color());
    }

    #[test]
    fn test_wide_image_downscaled_to_exact_bound() {
        let png = encode(&DynamicImage::new_rgb8(3000, 1500), ImageFormat::Png);
        let normalized = normalize_image(&png, &create_test_config()).unwrap();

        assert_eq!(normalized.dimensions(), (2000, 1000));
        assert_eq!(decode_jpeg(&normalized).dimensions(), (2000, 1000));
    }

    #[test]
    fn test_tall_image_downscaled_preserving_aspect_ratio() {
        let config = OcrConfig {
            max_image_dimension: 500,
            ..create_test_config()
        };
        let png = encode(&DynamicImage::new_rgb8(300, 1000), ImageFormat::Png);
        let normalized = normalize_image(&png, &config).unwrap();
        assert_eq!(normalized.dimensions(), (150, 500));
    }

    #[test]
    fn test_image_at_threshold_is_not_resized() {
        let config = OcrConfig {
            max_image_dimension: 200,
            ..create_test_config()
        };
        let png = encode(&DynamicImage::new_rgb8(200, 120), ImageFormat::Png);
        let normalized = normalize_image(&png, &config).unwrap();
        assert_eq!(normalized.dimensions(), (200, 120));
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(3000, 1500, 2000), Some((2000, 1000)));
        assert_eq!(scaled_dimensions(1500, 3000, 2000), Some((1000, 2000)));
        assert_eq!(scaled_dimensions(2000, 2000, 2000), None);
        assert_eq!(scaled_dimensions(5000, 1, 2000), Some((2000, 1)));
        assert_eq!(scaled_dimensions(2001, 2001, 2000), Some((2000, 2000)));
    }

    #[test]
    fn test_blend_over_white() {
        assert_eq!(blend_over_white(0, 0), 255);
        assert_eq!(blend_over_white(0, 255), 0);
        assert_eq!(blend_over_white(200, 255), 200);
        assert_eq!(blend_over_white(0, 128), 127);
    }

    #[test]
    fn test_garbage_bytes_are_invalid_image() {
        let result = normalize_image(b"definitely not an image", &create_test_config());
        assert!(matches!(result, Err(NormalizeError::InvalidImage(_))));
    }

    #[test]
    fn test_empty_bytes_are_invalid_image() {
        let result = normalize_image(&[], &create_test_config());
        assert!(matches!(result, Err(NormalizeError::InvalidImage(_))));
    }

    #[test]
    fn test_truncated_png_is_invalid_image() {
        let png = encode(&DynamicImage::new_rgb8(100, 100), ImageFormat::Png);
        let truncated = &png[..png.len() / 2];
        let result = normalize_image(truncated, &create_test_config());
        assert!(matches!(result, Err(NormalizeError::InvalidImage(_))));
    }

    #[test]
    fn test_reader_starts_at_beginning() {
        use std::io::Read;

        let png = encode(&DynamicImage::new_rgb8(10, 10), ImageFormat::Png);
        let normalized = normalize_image(&png, &create_test_config()).unwrap();
        let expected = normalized.as_bytes().to_vec();

        let mut reader = normalized.into_reader();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, expected);
    }
}
