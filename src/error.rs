//! Error types for image generation.

/// Errors that can occur while validating input or talking to the image API.
#[derive(Debug, thiserror::Error)]
pub enum ImagistError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Reference image exceeds the upload size limit.
    #[error("reference image is {size_bytes} bytes, limit is {limit_bytes}")]
    UploadTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Reference image could not be parsed as a supported image.
    #[error("could not read reference image: {0}")]
    UploadUnreadable(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImagistError {
    /// Returns true if the failure is a missing or rejected credential,
    /// which no amount of resubmitting will fix.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Returns true for local upload validation failures that never
    /// reached the network.
    pub fn is_upload(&self) -> bool {
        matches!(self, Self::UploadTooLarge { .. } | Self::UploadUnreadable(_))
    }
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, ImagistError>;

/// Strips HTML noise from provider error bodies so they are fit to show
/// a user. Some gateways answer JSON endpoints with HTML error pages.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with('<') {
        return "the service returned an unreadable error page".to_string();
    }
    const MAX_LEN: usize = 300;
    if trimmed.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}
