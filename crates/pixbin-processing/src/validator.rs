//! Upload candidate validation.
//!
//! Two independent checks, both of which must pass before any expensive work
//! happens: a size check and a declared-vs-actual format check. The format
//! check defends against disguised payloads: a file declared as `image/png`
//! whose bytes carry a JPEG signature is rejected, even if its name and MIME
//! type look plausible.

use pixbin_core::ImageFormat;

use crate::sniff;

/// Validation errors for upload candidates
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedFormat {
        content_type: String,
        allowed: Vec<&'static str>,
    },

    #[error("Content does not match declared type {declared}")]
    ContentMismatch { declared: &'static str },
}

/// Upload candidate validator.
///
/// Stateless apart from the configured size limit; safe to share across
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: usize,
}

impl ImageValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// Validate size
    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate the declared MIME type against the allowlist.
    pub fn validate_content_type(&self, content_type: &str) -> Result<ImageFormat, ValidationError> {
        ImageFormat::from_mime(content_type).ok_or_else(|| ValidationError::UnsupportedFormat {
            content_type: content_type.to_string(),
            allowed: ImageFormat::allowed_mime_types(),
        })
    }

    /// Validate that the buffer's leading bytes match the declared format's
    /// signature. Vector formats are exempt.
    pub fn validate_signature(
        &self,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        if !sniff::matches_signature(format, data) {
            return Err(ValidationError::ContentMismatch {
                declared: format.mime_type(),
            });
        }
        Ok(())
    }

    /// Run all checks and return the verified format.
    pub fn validate(
        &self,
        content_type: &str,
        data: &[u8],
    ) -> Result<ImageFormat, ValidationError> {
        self.validate_size(data.len())?;
        let format = self.validate_content_type(content_type)?;
        self.validate_signature(format, data)?;
        Ok(format)
    }
}
