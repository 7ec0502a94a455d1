//! QR code decoder using rqrr, used to read back rendered symbols

use crate::error::{Error, Result};
use image::{DynamicImage, GrayImage, RgbImage};

/// QR code decoder
#[derive(Debug, Default)]
pub struct QrDecoder {}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {}
    }

    /// Decode the text of the first QR code found in an RGB raster
    pub fn decode_rgb(&self, img: &RgbImage) -> Result<String> {
        let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();
        self.decode_gray(gray)
    }

    /// Decode the text of the first QR code found in a grayscale raster
    pub fn decode_gray(&self, img: GrayImage) -> Result<String> {
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();

        let grid = grids.first().ok_or(Error::NoQrCodeFound)?;

        let (meta, content) = grid
            .decode()
            .map_err(|e| Error::QrDecode(format!("Decode failed: {:?}", e)))?;

        tracing::trace!(
            "Decoded QR: version={:?}, ecc_level={:?}, length={}",
            meta.version,
            meta.ecc_level,
            content.len()
        );

        Ok(content)
    }

    /// Decode `img` and require it to carry exactly `expected`
    pub fn verify(&self, img: &RgbImage, expected: &str) -> Result<()> {
        let decoded = self.decode_rgb(img)?;
        if decoded == expected {
            Ok(())
        } else {
            Err(Error::VerificationMismatch {
                expected: expected.to_string(),
                decoded,
            })
        }
    }
}
