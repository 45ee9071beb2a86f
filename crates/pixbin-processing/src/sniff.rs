//! Magic-byte signatures for the accepted raster formats.

use pixbin_core::ImageFormat;

const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87A_SIGNATURE: &[u8] = b"GIF87a";
const GIF89A_SIGNATURE: &[u8] = b"GIF89a";

/// Check whether the buffer's first bytes match the signature of the given
/// format family. Vector formats have no binary signature and always match.
pub fn matches_signature(format: ImageFormat, data: &[u8]) -> bool {
    match format {
        ImageFormat::Jpeg => data.starts_with(JPEG_SIGNATURE),
        ImageFormat::Png => data.starts_with(PNG_SIGNATURE),
        ImageFormat::Gif => {
            data.starts_with(GIF87A_SIGNATURE) || data.starts_with(GIF89A_SIGNATURE)
        }
        // RIFF container: "RIFF" <4-byte size> "WEBP"
        ImageFormat::WebP => {
            data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
        }
        ImageFormat::Svg => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_signature() {
        assert!(matches_signature(
            ImageFormat::Jpeg,
            &[0xFF, 0xD8, 0xFF, 0xE0, 0x00]
        ));
        assert!(!matches_signature(ImageFormat::Jpeg, PNG_SIGNATURE));
    }

    #[test]
    fn test_png_signature() {
        assert!(matches_signature(ImageFormat::Png, PNG_SIGNATURE));
        assert!(!matches_signature(ImageFormat::Png, &[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn test_gif_signature_both_versions() {
        assert!(matches_signature(ImageFormat::Gif, b"GIF87a..."));
        assert!(matches_signature(ImageFormat::Gif, b"GIF89a..."));
        assert!(!matches_signature(ImageFormat::Gif, b"GIF90a..."));
    }

    #[test]
    fn test_webp_signature_requires_riff_and_webp_tags() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        buf.extend_from_slice(b"WEBP");
        assert!(matches_signature(ImageFormat::WebP, &buf));

        // "RIFF" alone is not enough (could be a WAV file)
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        wav.extend_from_slice(b"WAVE");
        assert!(!matches_signature(ImageFormat::WebP, &wav));
    }

    #[test]
    fn test_truncated_buffers_do_not_match() {
        assert!(!matches_signature(ImageFormat::Png, &[0x89, 0x50]));
        assert!(!matches_signature(ImageFormat::WebP, b"RIFF"));
        assert!(!matches_signature(ImageFormat::Jpeg, &[]));
    }

    #[test]
    fn test_svg_is_exempt() {
        assert!(matches_signature(ImageFormat::Svg, b"<svg></svg>"));
        assert!(matches_signature(ImageFormat::Svg, &[]));
    }
}
