//! Object-key generation for stored uploads.
//!
//! Keys must be globally collision-resistant under concurrent requests:
//! a millisecond timestamp, a random token, and a sanitized fragment of the
//! original filename. The original name alone is never trusted as a key.

use crate::constants::UPLOAD_KEY_PREFIX;
use crate::format::ImageFormat;
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

const RANDOM_TOKEN_LEN: usize = 8;
const NAME_FRAGMENT_MAX_LEN: usize = 40;
const MAX_FILENAME_LENGTH: usize = 255;

/// Sanitize a client-supplied filename for use in logs, metadata, and key
/// fragments. Strips any path components, replaces characters outside
/// `[A-Za-z0-9._-]`, trims leading and trailing dots and underscores, and
/// falls back to "file" for degenerate input.
pub fn sanitize_filename(filename: &str) -> String {
    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // ".." segments collapse to underscores above; trimming rejects anything
    // that still looks like traversal or is effectively empty.
    let trimmed = sanitized.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        return "file".to_string();
    }

    trimmed.to_string()
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Generate a storage key for an upload: `uploads/{millis}-{token}-{stem}.{ext}`.
///
/// The extension comes from the validated format, not the client filename, so a
/// JPEG declared and verified as JPEG is stored as `.jpg` regardless of what
/// the client named it.
pub fn generate_object_key(original_filename: &str, format: ImageFormat) -> String {
    let sanitized = sanitize_filename(original_filename);
    let stem = std::path::Path::new(&sanitized)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");

    let fragment: String = stem.chars().take(NAME_FRAGMENT_MAX_LEN).collect();
    let fragment = if fragment.is_empty() {
        "file".to_string()
    } else {
        fragment.to_lowercase()
    };

    format!(
        "{}/{}-{}-{}.{}",
        UPLOAD_KEY_PREFIX,
        Utc::now().timestamp_millis(),
        random_token(),
        fragment,
        format.extension()
    )
}
