//! QR code encoding and verification
//!
//! Matrix construction is delegated to the `qrcode` crate; this module fixes
//! the parameters handed to it and turns the resulting symbol into a framed,
//! two-color raster. The decoder exists only to read a rendered symbol back
//! when verification is enabled.

mod decoder;
mod encoder;

pub use decoder::QrDecoder;
pub use encoder::{EncodedSymbol, QrEncoder};

use image::Rgb;
use qrcode::EcLevel;

/// Highest symbol version defined by the QR standard.
pub const MAX_VERSION: i16 = 40;

/// Largest accepted module size in pixels.
pub const MAX_SCALE: u32 = 50;

/// Widest accepted quiet zone in modules.
pub const MAX_BORDER: u32 = 40;

/// Largest side of a rendered raster in pixels.
pub const MAX_IMAGE_SIDE: u32 = 4096;

/// Parameters handed to the encoder on every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrSettings {
    /// Smallest symbol version to use; larger versions are picked when the data does not fit
    pub min_version: i16,
    /// Error correction level
    pub ec_level: EcLevel,
    /// Pixels per module
    pub scale: u32,
    /// Quiet-zone width in modules
    pub border: u32,
    /// Color of dark modules
    pub foreground: Rgb<u8>,
    /// Color of light modules and the quiet zone
    pub background: Rgb<u8>,
    /// Decode each rendered symbol and compare it with the input
    pub verify: bool,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            min_version: 1,
            ec_level: EcLevel::L,
            scale: 10,
            border: 4,
            foreground: Rgb([0, 0, 0]),
            background: Rgb([255, 255, 255]),
            verify: false,
        }
    }
}

/// Parse an error correction level name (`L`, `M`, `Q`, `H`, case-insensitive).
pub fn parse_ec_level(value: &str) -> Option<EcLevel> {
    match value.trim().to_ascii_uppercase().as_str() {
        "L" | "LOW" => Some(EcLevel::L),
        "M" | "MEDIUM" => Some(EcLevel::M),
        "Q" | "QUARTILE" => Some(EcLevel::Q),
        "H" | "HIGH" => Some(EcLevel::H),
        _ => None,
    }
}

/// Single-letter name of an error correction level.
pub fn ec_level_name(level: EcLevel) -> &'static str {
    match level {
        EcLevel::L => "L",
        EcLevel::M => "M",
        EcLevel::Q => "Q",
        EcLevel::H => "H",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_configuration() {
        let settings = QrSettings::default();
        assert_eq!(settings.min_version, 1);
        assert_eq!(settings.ec_level, EcLevel::L);
        assert_eq!(settings.scale, 10);
        assert_eq!(settings.border, 4);
        assert_eq!(settings.foreground, Rgb([0, 0, 0]));
        assert_eq!(settings.background, Rgb([255, 255, 255]));
        assert!(!settings.verify);
    }

    #[test]
    fn ec_level_names_round_trip() {
        for level in [EcLevel::L, EcLevel::M, EcLevel::Q, EcLevel::H] {
            assert_eq!(parse_ec_level(ec_level_name(level)), Some(level));
        }
        assert_eq!(parse_ec_level(" quartile "), Some(EcLevel::Q));
        assert_eq!(parse_ec_level("x"), None);
    }
}
