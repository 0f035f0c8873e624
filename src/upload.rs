//! Validation of user-supplied reference images.

use crate::error::{ImagistError, Result};
use crate::types::{ImageFormat, ReferenceImage};
use base64::Engine;
use std::path::Path;

/// Maximum accepted reference image size: 5 MiB.
pub const MAX_REFERENCE_BYTES: u64 = 5 * 1024 * 1024;

/// A validated upload, ready to be attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Base64-encoded image bytes.
    pub data: String,
    /// MIME type established from the image's magic bytes.
    pub mime_type: String,
    /// Original size in bytes.
    pub size_bytes: u64,
}

impl UploadedImage {
    /// Returns a data URL suitable for previewing the upload.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Converts into the request-side reference image form.
    pub fn to_reference(&self) -> ReferenceImage {
        ReferenceImage {
            data: self.data.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Validates raw image bytes as a reference upload.
///
/// Rejects anything over [`MAX_REFERENCE_BYTES`] and anything whose magic
/// bytes do not identify a supported format (PNG, JPEG, WebP). On success
/// the payload is base64-encoded and paired with its MIME type.
pub fn validate_upload(bytes: &[u8]) -> Result<UploadedImage> {
    let size_bytes = bytes.len() as u64;
    if size_bytes > MAX_REFERENCE_BYTES {
        return Err(ImagistError::UploadTooLarge {
            size_bytes,
            limit_bytes: MAX_REFERENCE_BYTES,
        });
    }

    let format = ImageFormat::from_magic_bytes(bytes).ok_or_else(|| {
        ImagistError::UploadUnreadable("not a recognizable PNG, JPEG, or WebP image".into())
    })?;

    Ok(UploadedImage {
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type: format.mime_type().to_string(),
        size_bytes,
    })
}

/// Reads and validates a reference image from disk.
///
/// The size check runs against file metadata before the read, so an
/// oversized file is rejected without loading it.
pub fn read_reference(path: impl AsRef<Path>) -> Result<UploadedImage> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_REFERENCE_BYTES {
        return Err(ImagistError::UploadTooLarge {
            size_bytes: metadata.len(),
            limit_bytes: MAX_REFERENCE_BYTES,
        });
    }

    let bytes = std::fs::read(path)?;
    validate_upload(&bytes)
}
