//! QR code decoder using rqrr

use crate::error::{Error, Result};
use crate::qr::QrMatrix;
use image::GrayImage;

/// Pixels per module when rasterising a matrix for verification
const VERIFY_SCALE: u32 = 4;

/// Light margin in modules around the rasterised symbol
const VERIFY_QUIET_ZONE: u32 = 4;

/// QR code decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder {}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {}
    }

    /// Decode the first QR code found in a grayscale image
    pub fn decode(&self, img: &GrayImage) -> Result<String> {
        let mut prepared = rqrr::PreparedImage::prepare(img.clone());

        let grids = prepared.detect_grids();

        // Take the first detected QR code
        let grid = grids
            .first()
            .ok_or_else(|| Error::QrVerify("no QR code found in rendered image".to_string()))?;

        match grid.decode() {
            Ok((meta, content)) => {
                tracing::debug!(
                    "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                    meta.version,
                    meta.ecc_level,
                    content.len()
                );
                Ok(content)
            }
            Err(e) => Err(Error::QrVerify(format!("decode failed: {:?}", e))),
        }
    }

    /// Render `matrix` and check that it decodes to exactly `expected`.
    pub fn verify(&self, matrix: &QrMatrix, expected: &str) -> Result<()> {
        let image = matrix.to_image(VERIFY_SCALE, VERIFY_QUIET_ZONE);
        let decoded = self.decode(&image)?;
        if decoded != expected {
            return Err(Error::QrVerify(format!(
                "decoded {:?}, expected {:?}",
                decoded, expected
            )));
        }
        tracing::debug!(bytes = expected.len(), "QR self-check passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::{EccLevel, QrEncoder};

    #[test]
    fn test_blank_image_has_no_code() {
        let blank = GrayImage::from_pixel(64, 64, image::Luma([255]));
        assert!(matches!(
            QrDecoder::new().decode(&blank),
            Err(Error::QrVerify(_))
        ));
    }

    #[test]
    fn test_verify_accepts_matching_data() {
        let matrix = QrEncoder::with_ecc_level(EccLevel::Q).encode("LOT-7731").unwrap();
        QrDecoder::new().verify(&matrix, "LOT-7731").unwrap();
    }

    #[test]
    fn test_verify_rejects_other_data() {
        let matrix = QrEncoder::new().encode("LOT-7731").unwrap();
        assert!(matches!(
            QrDecoder::new().verify(&matrix, "LOT-7732"),
            Err(Error::QrVerify(_))
        ));
    }

    #[test]
    fn test_verify_with_quiet_zone_matrix() {
        let matrix = QrEncoder::new().encode("https://example.com/b/42").unwrap().with_border(2);
        QrDecoder::new().verify(&matrix, "https://example.com/b/42").unwrap();
    }
}
