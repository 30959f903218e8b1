//! Rendering the result of an insertion for people and for CI tooling

use crate::geometry::Point;
use crate::qr::EccLevel;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// One QR code placed over one textbox
#[derive(Debug, Clone, Serialize)]
pub struct PlacedQr {
    /// Identifier of the replaced textbox
    pub identifier: String,
    /// Layer the shapes were drawn on
    pub layer: String,
    /// Textbox midpoint in mm
    pub center: Point,
    /// Textbox width in mm, reported as its size
    pub textbox_size: f64,
    /// Symbol extent in mm along the textbox's width and height
    pub qr_size: (f64, f64),
    /// Module pitch in mm along the textbox's width and height
    pub module_pitch: (f64, f64),
    /// Modules per side, quiet zone included
    pub modules: usize,
    /// Rotation in degrees
    pub rotation: f64,
    /// Whether columns were flipped for a back-side layer
    pub mirrored: bool,
    /// Number of board shapes emitted
    pub shapes: usize,
}

/// Everything one run of the tool did
#[derive(Debug, Clone, Serialize)]
pub struct InsertionReport {
    /// Board that was read
    pub input: PathBuf,
    /// Board that was (or would have been) written
    pub output: PathBuf,
    /// False for a dry run
    pub written: bool,
    /// Encoded data
    pub data: String,
    /// QR symbol version
    pub version: i16,
    /// Error-correction level used
    pub ecc: EccLevel,
    /// Whether the symbol was decoded back before writing
    pub verified: bool,
    /// Placements in board order
    pub placed: Vec<PlacedQr>,
}

impl InsertionReport {
    /// Structured JSON representation suitable for downstream consumers
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Human-readable lines for terminal presentation
    pub fn human_lines(&self) -> Vec<String> {
        let mut human = Vec::new();
        for qr in &self.placed {
            human.push(format!(
                "Found textbox '{}' at location: X = {:.2} mm, Y = {:.2} mm, Size = {:.2} mm",
                qr.identifier, qr.center.x, qr.center.y, qr.textbox_size
            ));
            human.push(format!(
                "  QR version {} ({}), {} modules, {:.3} x {:.3} mm on {}{}",
                self.version,
                self.ecc,
                qr.modules,
                qr.qr_size.0,
                qr.qr_size.1,
                qr.layer,
                if qr.mirrored { " (mirrored)" } else { "" }
            ));
        }

        let count = self.placed.len();
        let replacements = if count == 1 {
            String::new()
        } else {
            format!(" {count} replacements made.")
        };
        if self.written {
            human.push(format!(
                "QR code added successfully.{replacements} Saved to '{}'.",
                self.output.display()
            ));
        } else {
            human.push(format!(
                "Dry run:{replacements} '{}' was not written.",
                self.output.display()
            ));
        }
        human
    }
}
