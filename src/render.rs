//! Request handling: validate a submission, encode it, and package the PNG
//!
//! [`handle_request`] is the whole pipeline. It holds no state between calls;
//! every invocation owns its raster and buffer and drops them when the caller
//! is done with the returned [`RenderedOutput`].

use crate::error::{Error, Result};
use crate::qr::{QrDecoder, QrEncoder};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Suffix appended to the label to build the download file name.
pub const FILE_SUFFIX: &str = "_qrcode.png";

/// Content type of the rendered buffer.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// The eight-byte signature every PNG file starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// What the user typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    /// Target to encode
    pub url: String,
    /// Business/product/service name used for the caption and file name
    pub label: String,
}

impl Submission {
    /// Build a submission from its two fields.
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }

    /// Both fields must be non-empty. Whitespace counts as input.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() || self.label.is_empty() {
            return Err(Error::MissingInput);
        }
        Ok(())
    }
}

/// Metadata about the symbol that was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    /// Symbol version the encoder settled on
    pub version: i16,
    /// Modules per side, quiet zone excluded
    pub modules: usize,
    /// Pixels per side of the PNG
    pub pixels: u32,
}

/// Everything needed to show and offer the QR code for one submission.
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    /// Caption shown under the inline image
    pub caption: String,
    /// Suggested name for the downloaded file
    pub file_name: String,
    /// Complete PNG file
    pub png: Bytes,
    /// Symbol metadata
    pub symbol: SymbolInfo,
}

/// Caption shown with the inline image.
pub fn caption(label: &str) -> String {
    format!("QR Code for {label}")
}

/// Suggested download file name. The label is used verbatim.
pub fn download_file_name(label: &str) -> String {
    format!("{label}{FILE_SUFFIX}")
}

/// Serialize a raster to an in-memory PNG buffer, readable from byte zero.
pub fn serialize_png(image: &RgbImage) -> Result<Bytes> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Run one submission through validate, encode, serialize and package.
pub fn handle_request(encoder: &QrEncoder, submission: &Submission) -> Result<RenderedOutput> {
    submission.validate()?;

    let symbol = encoder.encode(&submission.url)?;
    if encoder.settings().verify {
        QrDecoder::new().verify(&symbol.image, &submission.url)?;
    }

    let png = serialize_png(&symbol.image)?;

    Ok(RenderedOutput {
        caption: caption(&submission.label),
        file_name: download_file_name(&submission.label),
        symbol: SymbolInfo {
            version: symbol.version,
            modules: symbol.modules,
            pixels: symbol.image.width(),
        },
        png,
    })
}
