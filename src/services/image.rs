//! Image compression pipeline
//!
//! Uploaded images are decoded, scaled down to fit a square bound and
//! re-encoded as JPEG before they are stored. Everything here is pure and
//! synchronous; callers on the async runtime run it on the blocking pool.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::Serialize;

use crate::config::ImageConfig;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Invalid compression options: {0}")]
    InvalidOptions(String),
}

/// Compression parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    /// Bound on both width and height, in pixels
    pub max_dimension: u32,
    /// JPEG quality in `0.0..=1.0`
    pub quality: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            quality: 0.7,
        }
    }
}

impl From<&ImageConfig> for CompressOptions {
    fn from(config: &ImageConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            quality: config.quality,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A file ready for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Output of [`compress`]
#[derive(Debug, Clone)]
pub struct Compressed {
    pub file: UploadFile,
    pub dimensions: Dimensions,
}

/// Largest size within `max` on both axes keeping the aspect ratio.
///
/// Images already inside the bound keep their size. No side ends up zero.
pub fn fit_within(width: u32, height: u32, max: u32) -> Dimensions {
    if width <= max && height <= max {
        return Dimensions { width, height };
    }

    let scale = f64::min(max as f64 / width as f64, max as f64 / height as f64);
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    Dimensions {
        width: scaled(width),
        height: scaled(height),
    }
}

/// Map `0.0..=1.0` onto the encoder's `1..=100`
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Decode, downscale and re-encode an image as JPEG.
///
/// The returned file keeps `name` as given.
pub fn compress(
    bytes: &[u8],
    name: &str,
    options: &CompressOptions,
) -> Result<Compressed, ImageError> {
    if options.max_dimension == 0 {
        return Err(ImageError::InvalidOptions(
            "max_dimension must be positive".to_string(),
        ));
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

    let target = fit_within(decoded.width(), decoded.height(), options.max_dimension);
    let resized = if target.width == decoded.width() && target.height == decoded.height() {
        decoded
    } else {
        decoded.resize_exact(target.width, target.height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, jpeg_quality(options.quality))
        .encode_image(&rgb)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    tracing::debug!(
        "Compressed {} to {}x{} ({} -> {} bytes)",
        name,
        target.width,
        target.height,
        bytes.len(),
        encoded.len()
    );

    Ok(Compressed {
        file: UploadFile {
            name: name.to_string(),
            content_type: JPEG_CONTENT_TYPE.to_string(),
            bytes: encoded,
        },
        dimensions: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Deterministic noise; compresses poorly as PNG
    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let h = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(2_246_822_519))
                .wrapping_mul(3_266_489_917);
            Rgb([(h >> 24) as u8, (h >> 16) as u8, (h >> 8) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let png = noise_png(2000, 1000);
        let result = compress(&png, "look.png", &CompressOptions::default()).unwrap();

        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 1920,
                height: 960
            }
        );
        assert_eq!(result.file.name, "look.png");
        assert_eq!(result.file.content_type, "image/jpeg");
        assert!(result.file.bytes.len() < png.len());

        let reread = image::load_from_memory(&result.file.bytes).unwrap();
        assert_eq!((reread.width(), reread.height()), (1920, 960));
        assert_eq!(
            image::guess_format(&result.file.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_small_image_keeps_size() {
        let png = noise_png(640, 480);
        let result = compress(&png, "small.png", &CompressOptions::default()).unwrap();
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_portrait_bound_by_height() {
        let png = noise_png(300, 900);
        let options = CompressOptions {
            max_dimension: 300,
            quality: 0.5,
        };
        let result = compress(&png, "tall.png", &options).unwrap();
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 100,
                height: 300
            }
        );
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        let err = compress(b"definitely not an image", "x.jpg", &CompressOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_zero_bound_rejected() {
        let options = CompressOptions {
            max_dimension: 0,
            quality: 0.7,
        };
        let err = compress(&noise_png(4, 4), "x.png", &options).unwrap_err();
        assert!(matches!(err, ImageError::InvalidOptions(_)));
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.5), 100);
    }

    #[test]
    fn test_extreme_aspect_never_zero() {
        assert_eq!(
            fit_within(10_000, 2, 1920),
            Dimensions {
                width: 1920,
                height: 1
            }
        );
    }

    proptest! {
        #[test]
        fn property_fit_within_bounds(w in 1u32..8000, h in 1u32..8000, max in 1u32..4000) {
            let d = fit_within(w, h, max);
            prop_assert!(d.width >= 1 && d.height >= 1);
            prop_assert!(d.width <= max && d.height <= max);
            prop_assert!(d.width <= w && d.height <= h);
            if w <= max && h <= max {
                prop_assert_eq!(d, Dimensions { width: w, height: h });
            } else {
                prop_assert!(d.width == max || d.height == max);
            }
        }
    }
}
