//! Image format model.
//!
//! The allowlist of accepted upload formats: common raster formats plus SVG.
//! Magic-byte verification against these formats lives in `pixbin-processing`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Svg,
}

impl ImageFormat {
    /// All formats the service accepts.
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::WebP,
        ImageFormat::Svg,
    ];

    /// Resolve a declared MIME type to a format. Parameters are stripped and
    /// matching is case-insensitive ("image/PNG; charset=utf-8" -> Png).
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let normalized = content_type
            .split(';')
            .next()
            .map(|s| s.trim())
            .unwrap_or(content_type)
            .to_lowercase();

        match normalized.as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::WebP),
            "image/svg+xml" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Svg => "svg",
        }
    }

    /// Vector formats are exempt from magic-byte sniffing and raster
    /// re-encoding.
    pub fn is_vector(self) -> bool {
        matches!(self, ImageFormat::Svg)
    }

    /// MIME types of every accepted format, for error messages.
    pub fn allowed_mime_types() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.mime_type()).collect()
    }
}
