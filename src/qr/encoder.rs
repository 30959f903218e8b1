//! QR code encoder

use crate::error::{Error, Result};
use crate::qr::{EccLevel, QrMatrix};
use qrcode::{Color, QrCode, Version};

/// QR code encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder {
    /// Error correction level
    ecc_level: EccLevel,
}

impl QrEncoder {
    /// Create a new QR encoder with default settings (Low ECC)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new QR encoder with a specific error correction level
    pub fn with_ecc_level(ecc_level: EccLevel) -> Self {
        Self { ecc_level }
    }

    /// Encode a string into a module matrix.
    ///
    /// The smallest symbol version that holds `data` at the configured level
    /// is chosen automatically.
    pub fn encode(&self, data: &str) -> Result<QrMatrix> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), self.ecc_level.into())
            .map_err(|e| {
                Error::QrEncode(format!(
                    "{} bytes at error-correction level {}: {e}",
                    data.len(),
                    self.ecc_level
                ))
            })?;

        let version = match code.version() {
            Version::Normal(v) | Version::Micro(v) => v,
        };
        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();

        tracing::debug!(
            version,
            width,
            ecc = %self.ecc_level,
            bytes = data.len(),
            "encoded QR code"
        );

        QrMatrix::from_modules(width, modules, version, self.ecc_level)
            .ok_or_else(|| Error::QrEncode(format!("encoder produced a malformed {width}x{width} grid")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_data_uses_version_1() {
        let matrix = QrEncoder::new().encode("abc").unwrap();
        assert_eq!(matrix.version(), 1);
        assert_eq!(matrix.width(), 21);
        // Finder pattern corner is always dark.
        assert!(matrix.is_dark(0, 0));
        assert!(matrix.is_dark(20, 0));
        assert!(matrix.is_dark(0, 20));
    }

    #[test]
    fn test_version_grows_with_data() {
        let encoder = QrEncoder::new();
        let small = encoder.encode("v1.2.3").unwrap();
        let large = encoder.encode(&"BATCH-0001;".repeat(20)).unwrap();
        assert!(large.version() > small.version());
        assert_eq!(large.width(), 17 + 4 * large.version() as usize);
    }

    #[test]
    fn test_higher_ecc_needs_larger_symbol() {
        let data = "rev=C;batch=2024-117;serial=00042";
        let low = QrEncoder::with_ecc_level(EccLevel::L).encode(data).unwrap();
        let high = QrEncoder::with_ecc_level(EccLevel::H).encode(data).unwrap();
        assert!(high.version() > low.version());
        assert_eq!(high.ecc(), EccLevel::H);
    }

    #[test]
    fn test_empty_data_encodes() {
        let matrix = QrEncoder::new().encode("").unwrap();
        assert_eq!(matrix.version(), 1);
    }

    #[test]
    fn test_oversized_data_fails() {
        let data = "x".repeat(4000);
        let result = QrEncoder::with_ecc_level(EccLevel::H).encode(&data);
        match result {
            Err(Error::QrEncode(message)) => {
                assert!(message.contains("4000 bytes"), "{message}");
                assert!(message.contains("level H"), "{message}");
            }
            other => panic!("expected QrEncode error, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip() {
        use crate::qr::QrDecoder;

        let decoder = QrDecoder::new();
        for (i, len) in [1usize, 17, 64, 150, 300].into_iter().enumerate() {
            let original: String = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-./:"
                .chars()
                .cycle()
                .skip(i)
                .take(len)
                .collect();
            let matrix = QrEncoder::new().encode(&original).unwrap();
            let decoded = decoder.decode(&matrix.to_image(4, 4)).unwrap();
            assert_eq!(decoded, original, "round trip failed for {len} chars");
        }
    }

    #[test]
    fn test_round_trip_utf8() {
        use crate::qr::QrDecoder;

        let original = "Größe: 5 µm ✓";
        let matrix = QrEncoder::with_ecc_level(EccLevel::M).encode(original).unwrap();
        let decoded = QrDecoder::new().decode(&matrix.to_image(4, 4)).unwrap();
        assert_eq!(decoded, original);
    }
}
