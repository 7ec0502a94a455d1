//! Error types for linkqr operations

use thiserror::Error;

/// Result type alias using linkqr's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when either form field is left empty.
pub const MISSING_INPUT_MESSAGE: &str = "Please enter both URL and Business Name.";

/// Main error type for linkqr operations
#[derive(Error, Debug)]
pub enum Error {
    /// URL or label was empty at submission time
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    /// QR code encoding failed
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// Serializing the rendered raster to PNG failed
    #[error("Failed to serialize QR image: {0}")]
    Serialization(String),

    /// QR code decoding failed while verifying a rendered symbol
    #[error("Failed to decode QR code: {0}")]
    QrDecode(String),

    /// No QR code found in the rendered image
    #[error("No QR code found in image")]
    NoQrCodeFound,

    /// Rendered symbol decoded to different content than was submitted
    #[error("Rendered QR code decodes to {decoded:?}, expected {expected:?}")]
    VerificationMismatch {
        /// Submitted target
        expected: String,
        /// What the decoder read back
        decoded: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is a user-input warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::MissingInput)
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(e: qrcode::types::QrError) -> Self {
        Error::QrEncode(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<minijinja::Error> for Error {
    fn from(e: minijinja::Error) -> Self {
        Error::Other(format!("Template error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_the_only_warning() {
        assert!(Error::MissingInput.is_warning());
        assert!(!Error::QrEncode("data too long".into()).is_warning());
        assert!(!Error::Serialization("broken pipe".into()).is_warning());
    }

    #[test]
    fn missing_input_message() {
        assert_eq!(
            Error::MissingInput.to_string(),
            "Please enter both URL and Business Name."
        );
    }

    #[test]
    fn qr_error_converts_to_encode_error() {
        let err: Error = qrcode::types::QrError::DataTooLong.into();
        assert!(matches!(err, Error::QrEncode(_)));
        assert!(err.to_string().starts_with("Failed to encode QR code:"));
    }
}
