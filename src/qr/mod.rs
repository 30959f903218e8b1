//! QR code encoding and verification
//!
//! The encoder turns caller data into a [`QrMatrix`], a plain grid of dark and
//! light modules that the embedder draws onto the board. The decoder is only
//! used to prove that a rendered matrix still reads back as the input.

mod decoder;
mod encoder;

pub use decoder::QrDecoder;
pub use encoder::QrEncoder;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error-correction level, trading capacity for damage tolerance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EccLevel {
    /// Recovers ~7% damage
    #[default]
    #[serde(alias = "l", alias = "low")]
    L,
    /// Recovers ~15% damage
    #[serde(alias = "m", alias = "medium")]
    M,
    /// Recovers ~25% damage
    #[serde(alias = "q", alias = "quartile")]
    Q,
    /// Recovers ~30% damage
    #[serde(alias = "h", alias = "high")]
    H,
}

impl From<EccLevel> for qrcode::EcLevel {
    fn from(level: EccLevel) -> Self {
        match level {
            EccLevel::L => qrcode::EcLevel::L,
            EccLevel::M => qrcode::EcLevel::M,
            EccLevel::Q => qrcode::EcLevel::Q,
            EccLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl fmt::Display for EccLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EccLevel::L => "L",
            EccLevel::M => "M",
            EccLevel::Q => "Q",
            EccLevel::H => "H",
        };
        f.write_str(name)
    }
}

impl FromStr for EccLevel {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::L),
            "m" | "medium" => Ok(Self::M),
            "q" | "quartile" => Ok(Self::Q),
            "h" | "high" => Ok(Self::H),
            _ => Err(format!(
                "Unsupported error-correction level '{value}', expected L, M, Q or H"
            )),
        }
    }
}

/// Square grid of QR modules, row-major, `true` = dark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
    version: i16,
    ecc: EccLevel,
}

impl QrMatrix {
    /// Build a matrix from row-major module colours.
    ///
    /// Returns `None` when `modules` is not a `width` x `width` grid.
    pub fn from_modules(width: usize, modules: Vec<bool>, version: i16, ecc: EccLevel) -> Option<Self> {
        (width > 0 && modules.len() == width * width).then_some(Self {
            width,
            modules,
            version,
            ecc,
        })
    }

    /// Modules per side
    pub fn width(&self) -> usize {
        self.width
    }

    /// QR symbol version (1-40)
    pub fn version(&self) -> i16 {
        self.version
    }

    /// Error-correction level the symbol was encoded with
    pub fn ecc(&self) -> EccLevel {
        self.ecc
    }

    /// Whether the module at column `x`, row `y` is dark
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }

    /// Number of dark modules
    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|&&m| m).count()
    }

    /// Copy of the matrix surrounded by `border` light modules on every side.
    pub fn with_border(&self, border: usize) -> Self {
        if border == 0 {
            return self.clone();
        }
        let width = self.width + 2 * border;
        let mut modules = vec![false; width * width];
        for y in 0..self.width {
            for x in 0..self.width {
                modules[(y + border) * width + x + border] = self.is_dark(x, y);
            }
        }
        Self {
            width,
            modules,
            version: self.version,
            ecc: self.ecc,
        }
    }

    /// Maximal runs of dark modules in row `y`, as column ranges.
    pub fn dark_runs(&self, y: usize) -> Vec<std::ops::Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for x in 0..self.width {
            match (self.is_dark(x, y), start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push(s..x);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..self.width);
        }
        runs
    }

    /// Rasterise to a grayscale image with `scale` pixels per module and a
    /// `quiet` module light margin, suitable for an image decoder.
    pub fn to_image(&self, scale: u32, quiet: u32) -> GrayImage {
        let scale = scale.max(1);
        let side = (self.width as u32 + 2 * quiet) * scale;
        GrayImage::from_fn(side, side, |px, py| {
            let mx = (px / scale) as i64 - quiet as i64;
            let my = (py / scale) as i64 - quiet as i64;
            let dark = mx >= 0 && my >= 0 && self.is_dark(mx as usize, my as usize);
            Luma([if dark { 0 } else { 255 }])
        })
    }
}
