//! QR code encoder

use crate::error::{Error, Result};
use crate::qr::{MAX_IMAGE_SIDE, MAX_VERSION, QrSettings};
use image::{GrayImage, Luma, RgbImage};
use qrcode::bits::Bits;
use qrcode::types::QrError;
use qrcode::{QrCode, Version};

/// A rendered symbol together with the parameters the encoder settled on.
#[derive(Debug, Clone)]
pub struct EncodedSymbol {
    /// Framed two-color raster, quiet zone included
    pub image: RgbImage,
    /// Symbol version actually used
    pub version: i16,
    /// Modules per side, quiet zone excluded
    pub modules: usize,
}

/// QR code encoder
#[derive(Debug, Clone, Default)]
pub struct QrEncoder {
    settings: QrSettings,
}

impl QrEncoder {
    /// Create an encoder with the fixed defaults (version 1, level L, 10 px modules, 4 module border)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with explicit settings.
    ///
    /// Settings are not validated here; out-of-range values surface as
    /// [`Error::QrEncode`] from [`QrEncoder::encode`]. Use
    /// `QrOptions::to_settings` to reject them up front.
    pub fn with_settings(settings: QrSettings) -> Self {
        Self { settings }
    }

    /// Settings this encoder was built with
    pub fn settings(&self) -> &QrSettings {
        &self.settings
    }

    /// Encode a string into a framed QR raster
    pub fn encode(&self, data: &str) -> Result<EncodedSymbol> {
        let code = self.build_code(data.as_bytes())?;
        let version = match code.version() {
            Version::Normal(v) | Version::Micro(v) => v,
        };
        let modules = code.width();

        let scale = self.settings.scale.max(1);
        let side = framed_side(modules, self.settings.border, scale).ok_or_else(|| {
            Error::QrEncode(format!(
                "{modules} modules with a {} module border at {scale} px exceed {MAX_IMAGE_SIDE} px",
                self.settings.border
            ))
        })?;
        let symbol = code
            .render::<Luma<u8>>()
            .quiet_zone(false)
            .module_dimensions(scale, scale)
            .dark_color(Luma([0]))
            .light_color(Luma([255]))
            .build();

        tracing::debug!(
            version,
            modules,
            ec_level = ?self.settings.ec_level,
            bytes = data.len(),
            "Encoded QR symbol"
        );

        Ok(EncodedSymbol {
            image: self.frame(&symbol, side),
            version,
            modules,
        })
    }

    /// Build the matrix at the smallest version that is both large enough for
    /// the data and no smaller than the configured minimum.
    fn build_code(&self, data: &[u8]) -> Result<QrCode> {
        let ec_level = self.settings.ec_level;
        let min_version = self.settings.min_version;
        if !(1..=MAX_VERSION).contains(&min_version) {
            return Err(Error::QrEncode(format!(
                "minimum version {min_version} out of range, expected 1-{MAX_VERSION}"
            )));
        }

        if data.is_ascii() {
            let code = QrCode::with_error_correction_level(data, ec_level)?;
            return match code.version() {
                Version::Normal(v) if v < min_version => Ok(QrCode::with_version(
                    data,
                    Version::Normal(min_version),
                    ec_level,
                )?),
                _ => Ok(code),
            };
        }

        // The optimizing segmenter reads some UTF-8 byte pairs as Shift JIS kanji,
        // so non-ASCII text is always encoded in byte mode.
        for v in min_version..=MAX_VERSION {
            let mut bits = Bits::new(Version::Normal(v));
            let pushed = bits
                .push_byte_data(data)
                .and_then(|()| bits.push_terminator(ec_level));
            match pushed {
                Ok(()) => return Ok(QrCode::with_bits(bits, ec_level)?),
                Err(QrError::DataTooLong) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(QrError::DataTooLong.into())
    }

    /// Surround the bare symbol with the quiet zone and apply the configured colors.
    /// `side` comes from [`framed_side`], so the offsets below cannot overflow.
    fn frame(&self, symbol: &GrayImage, side: u32) -> RgbImage {
        let (width, height) = symbol.dimensions();
        let offset = (side - width) / 2;
        let QrSettings {
            foreground,
            background,
            ..
        } = self.settings;

        RgbImage::from_fn(side, side, |x, y| {
            let inside = x >= offset && y >= offset && x < offset + width && y < offset + height;
            if inside && symbol.get_pixel(x - offset, y - offset)[0] < 128 {
                foreground
            } else {
                background
            }
        })
    }
}

/// Pixels per side of the framed raster, or `None` past [`MAX_IMAGE_SIDE`].
fn framed_side(modules: usize, border: u32, scale: u32) -> Option<u32> {
    let modules = u32::try_from(modules).ok()?;
    let side = border
        .checked_mul(2)?
        .checked_add(modules)?
        .checked_mul(scale)?;
    (side <= MAX_IMAGE_SIDE).then_some(side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use qrcode::EcLevel;

    #[test]
    fn test_encode_string() {
        let encoder = QrEncoder::new();
        let result = encoder.encode("https://example.com");
        assert!(result.is_ok());
    }

    #[test]
    fn short_input_uses_version_one() {
        let symbol = QrEncoder::new().encode("hi").unwrap();
        assert_eq!(symbol.version, 1);
        assert_eq!(symbol.modules, 21);
    }

    #[test]
    fn image_side_includes_quiet_zone() {
        let symbol = QrEncoder::new().encode("https://example.com").unwrap();
        let expected = ((symbol.modules as u32) + 2 * 4) * 10;
        assert_eq!(symbol.image.dimensions(), (expected, expected));
    }

    #[test]
    fn quiet_zone_is_background() {
        let symbol = QrEncoder::new().encode("https://example.com").unwrap();
        let white = Rgb([255, 255, 255]);
        for i in 0..40 {
            assert_eq!(*symbol.image.get_pixel(i, i), white);
            assert_eq!(*symbol.image.get_pixel(i, 0), white);
        }
        // Top-left finder pattern starts right after the quiet zone.
        assert_eq!(*symbol.image.get_pixel(40, 40), Rgb([0, 0, 0]));
    }

    #[test]
    fn nineteen_byte_url_needs_version_two() {
        // Version 1 at level L holds 17 bytes.
        let symbol = QrEncoder::new().encode("https://example.com").unwrap();
        assert_eq!(symbol.version, 2);
        assert_eq!(symbol.modules, 25);
    }

    #[test]
    fn long_input_grows_past_minimum_version() {
        let data = "https://example.com/".to_string() + &"a".repeat(200);
        let symbol = QrEncoder::new().encode(&data).unwrap();
        assert!(symbol.version > 1);
        assert_eq!(symbol.modules, (17 + 4 * symbol.version) as usize);
    }

    #[test]
    fn minimum_version_is_honoured() {
        let encoder = QrEncoder::with_settings(QrSettings {
            min_version: 5,
            ..QrSettings::default()
        });
        let symbol = encoder.encode("hi").unwrap();
        assert_eq!(symbol.version, 5);
        assert_eq!(symbol.modules, 37);
    }

    #[test]
    fn oversized_input_is_an_encode_error() {
        let data = "a".repeat(3000);
        let err = QrEncoder::new().encode(&data).unwrap_err();
        assert!(matches!(err, crate::Error::QrEncode(_)));
    }

    #[test]
    fn custom_colors_and_geometry() {
        let encoder = QrEncoder::with_settings(QrSettings {
            ec_level: EcLevel::H,
            scale: 3,
            border: 2,
            foreground: Rgb([10, 20, 30]),
            background: Rgb([250, 240, 230]),
            ..QrSettings::default()
        });
        let symbol = encoder.encode("color").unwrap();
        let side = (symbol.modules as u32 + 4) * 3;
        assert_eq!(symbol.image.dimensions(), (side, side));
        assert_eq!(*symbol.image.get_pixel(0, 0), Rgb([250, 240, 230]));
        assert_eq!(*symbol.image.get_pixel(6, 6), Rgb([10, 20, 30]));
    }

    #[test]
    fn huge_border_is_an_encode_error() {
        let encoder = QrEncoder::with_settings(QrSettings {
            border: u32::MAX / 4,
            ..QrSettings::default()
        });
        let err = encoder.encode("https://example.com").unwrap_err();
        assert!(matches!(err, crate::Error::QrEncode(_)));
    }

    #[test]
    fn oversized_canvas_is_an_encode_error() {
        let encoder = QrEncoder::with_settings(QrSettings {
            scale: 100_000,
            ..QrSettings::default()
        });
        let err = encoder.encode("hi").unwrap_err();
        assert!(matches!(err, crate::Error::QrEncode(_)));
    }

    #[test]
    fn framed_side_bounds() {
        assert_eq!(framed_side(25, 4, 10), Some(330));
        assert_eq!(framed_side(177, 4, 10), Some(1850));
        assert_eq!(framed_side(21, u32::MAX, 1), None);
        assert_eq!(framed_side(21, 0, MAX_IMAGE_SIDE), None);
    }

    #[test]
    fn out_of_range_minimum_version_is_rejected() {
        for min_version in [0, -3, MAX_VERSION + 1] {
            let encoder = QrEncoder::with_settings(QrSettings {
                min_version,
                ..QrSettings::default()
            });
            for data in ["hi", "café"] {
                let err = encoder.encode(data).unwrap_err();
                assert!(err.to_string().contains("minimum version"), "{err}");
            }
        }
    }

    #[test]
    fn non_ascii_round_trips_in_byte_mode() {
        use crate::qr::QrDecoder;

        let original = "https://例え.jp/ページ?q=カフェ";
        let symbol = QrEncoder::new().encode(original).unwrap();
        assert_eq!(QrDecoder::new().decode_rgb(&symbol.image).unwrap(), original);
    }

    #[test]
    fn non_ascii_honours_minimum_version() {
        let encoder = QrEncoder::with_settings(QrSettings {
            min_version: 4,
            ..QrSettings::default()
        });
        assert_eq!(encoder.encode("café").unwrap().version, 4);
    }

    #[test]
    fn test_round_trip() {
        use crate::qr::QrDecoder;

        let encoder = QrEncoder::new();
        let decoder = QrDecoder::new();

        let original = "https://example.com/landing?ref=qr";
        let symbol = encoder.encode(original).unwrap();
        let decoded = decoder.decode_rgb(&symbol.image).unwrap();

        assert_eq!(decoded, original);
    }
}
