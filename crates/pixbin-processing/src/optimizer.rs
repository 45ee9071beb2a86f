//! Format-aware image optimization.
//!
//! Optimization is a best-effort enhancement, not a correctness requirement:
//! any decode or encode failure falls back to the original bytes, and output
//! that would be larger than the input is discarded. The public API is
//! therefore infallible.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView};
use pixbin_core::constants::LOSSY_QUALITY;
use pixbin_core::ImageFormat;

/// Result of an optimization pass.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
    /// True when the stored bytes differ from the input (re-encoded smaller).
    pub optimized: bool,
}

/// Single-pass image optimizer.
///
/// Lossy raster formats (JPEG, WebP) are re-encoded at a fixed quality target,
/// preserving their format. PNG is re-encoded losslessly with adaptive
/// filtering. SVG passes through untouched, and so does GIF: re-encoding a GIF
/// through a still-image pipeline would drop animation frames.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    quality: u8,
}

impl Default for ImageOptimizer {
    fn default() -> Self {
        Self::new(LOSSY_QUALITY)
    }
}

impl ImageOptimizer {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Optimize `data` according to its verified format.
    ///
    /// Output size is guaranteed `<= data.len()`: a larger or failed re-encode
    /// returns the original buffer with `optimized = false`.
    pub fn optimize(&self, data: Vec<u8>, format: ImageFormat) -> OptimizedImage {
        if matches!(format, ImageFormat::Svg | ImageFormat::Gif) {
            return OptimizedImage {
                bytes: Bytes::from(data),
                format,
                optimized: false,
            };
        }

        let original_size = data.len();
        match self.reencode(&data, format) {
            Ok(reencoded) if reencoded.len() < original_size => {
                tracing::debug!(
                    format = ?format,
                    original_bytes = original_size,
                    optimized_bytes = reencoded.len(),
                    "Image optimized"
                );
                OptimizedImage {
                    bytes: Bytes::from(reencoded),
                    format,
                    optimized: true,
                }
            }
            Ok(reencoded) => {
                tracing::debug!(
                    format = ?format,
                    original_bytes = original_size,
                    reencoded_bytes = reencoded.len(),
                    "Re-encoded output not smaller, keeping original"
                );
                OptimizedImage {
                    bytes: Bytes::from(data),
                    format,
                    optimized: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    format = ?format,
                    "Optimization skipped, keeping original bytes"
                );
                OptimizedImage {
                    bytes: Bytes::from(data),
                    format,
                    optimized: false,
                }
            }
        }
    }

    fn reencode(&self, data: &[u8], format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let img = image::load_from_memory_with_format(data, to_image_format(format)?)?;

        match format {
            ImageFormat::Jpeg => self.encode_jpeg(&img),
            ImageFormat::WebP => self.encode_webp(&img),
            ImageFormat::Png => encode_png(&img),
            ImageFormat::Gif | ImageFormat::Svg => {
                anyhow::bail!("format {:?} is pass-through", format)
            }
        }
    }

    /// Re-encode to JPEG using mozjpeg (progressive, optimized coding).
    fn encode_jpeg(&self, img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(self.quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(jpeg_data)
    }

    /// Re-encode to lossy WebP.
    fn encode_webp(&self, img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(self.quality as f32);

        Ok(webp_data.to_vec())
    }
}

/// Lossless PNG re-encode with adaptive filtering and default compression.
fn encode_png(img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buffer,
        CompressionType::Default,
        FilterType::Adaptive,
    );
    img.write_with_encoder(encoder)?;

    Ok(buffer)
}

fn to_image_format(format: ImageFormat) -> anyhow::Result<image::ImageFormat> {
    match format {
        ImageFormat::Jpeg => Ok(image::ImageFormat::Jpeg),
        ImageFormat::Png => Ok(image::ImageFormat::Png),
        ImageFormat::Gif => Ok(image::ImageFormat::Gif),
        ImageFormat::WebP => Ok(image::ImageFormat::WebP),
        ImageFormat::Svg => anyhow::bail!("svg has no raster decoder"),
    }
}
