//! The locate → encode → place → embed pipeline.

use crate::board::Board;
use crate::config::KicadQrConfig;
use crate::embed::{Embedder, is_back_layer};
use crate::error::Result;
use crate::output::PlacedQr;
use crate::placement::{FitMode, Placement};
use crate::qr::{EccLevel, QrDecoder, QrEncoder, QrMatrix};
use crate::sexpr::PatchSet;

/// Knobs for one insertion
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Error-correction level
    pub ecc: EccLevel,
    /// Light modules around the symbol
    pub border: usize,
    /// Scaling policy for non-square boxes
    pub fit: FitMode,
    /// Merge horizontal runs into single shapes
    pub merge_runs: bool,
    /// Decode the symbol before editing the board
    pub verify: bool,
    /// Draw on this layer instead of the textbox's
    pub layer: Option<String>,
    /// Leave the placeholder in place
    pub keep_textbox: bool,
    /// Replace every matching textbox, not just the first
    pub replace_all: bool,
}

impl From<&KicadQrConfig> for InsertOptions {
    fn from(config: &KicadQrConfig) -> Self {
        Self {
            ecc: config.qr.ecc,
            border: config.qr.border,
            fit: config.qr.fit,
            merge_runs: config.qr.merge_runs,
            verify: config.qr.verify,
            layer: config.placement.layer.clone(),
            keep_textbox: config.placement.keep_textbox,
            replace_all: false,
        }
    }
}

/// Pending edits produced by [`QrInserter::prepare`]
#[derive(Debug, Clone)]
pub struct Insertion {
    /// Patches to apply to the board text
    pub patches: PatchSet,
    /// The encoded symbol (without quiet zone)
    pub matrix: QrMatrix,
    /// One entry per replaced textbox
    pub placed: Vec<PlacedQr>,
}

/// Places a QR code over named textboxes
#[derive(Debug, Clone)]
pub struct QrInserter {
    options: InsertOptions,
}

impl QrInserter {
    /// Inserter using `options`
    pub fn new(options: InsertOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &InsertOptions {
        &self.options
    }

    /// Compute the edits that overlay `data` onto the textbox(es) named
    /// `identifier`. The board itself is not modified.
    pub fn prepare(&self, board: &Board, identifier: &str, data: &str) -> Result<Insertion> {
        let textboxes = if self.options.replace_all {
            board.find_textboxes(identifier)?
        } else {
            vec![board.find_textbox(identifier)?]
        };

        let matrix = QrEncoder::with_ecc_level(self.options.ecc).encode(data)?;
        if self.options.verify {
            QrDecoder::new().verify(&matrix, data)?;
        }
        let padded = matrix.with_border(self.options.border);

        let mut patches = PatchSet::new();
        let mut placed = Vec::with_capacity(textboxes.len());
        for textbox in &textboxes {
            if !textbox.is_square() {
                tracing::warn!(
                    identifier,
                    width = textbox.width(),
                    height = textbox.height(),
                    fit = %self.options.fit,
                    "textbox is not square"
                );
            }

            let layer = self
                .options
                .layer
                .clone()
                .unwrap_or_else(|| textbox.layer.clone());
            let mirror = is_back_layer(&layer);
            let placement = Placement::fit(textbox, padded.width(), self.options.fit, mirror)?;

            let embedder = Embedder::new(layer, self.options.merge_runs, board.version());
            let shapes = embedder.shapes(&padded, &placement);
            embedder.queue(board, textbox, &shapes, self.options.keep_textbox, &mut patches);

            tracing::info!(
                identifier,
                layer = embedder.layer(),
                x = placement.center.x,
                y = placement.center.y,
                pitch = placement.pitch_u,
                shapes = shapes.len(),
                "placed QR code"
            );

            placed.push(PlacedQr {
                identifier: identifier.to_string(),
                layer: embedder.layer().to_string(),
                center: placement.center,
                textbox_size: textbox.width(),
                qr_size: placement.size(),
                module_pitch: (placement.pitch_u, placement.pitch_v),
                modules: placement.modules,
                rotation: placement.rotation_degrees(),
                mirrored: mirror,
                shapes: shapes.len(),
            });
        }

        Ok(Insertion {
            patches,
            matrix,
            placed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sexpr::Sexpr;

    const BOARD: &str = r#"(kicad_pcb
	(version 20240108)
	(gr_line (start 0 0) (end 50 0) (layer "Edge.Cuts") (uuid "edge-1"))
	(gr_text_box "SERIAL"
		(start 10 10)
		(end 20 20)
		(layer "F.SilkS")
		(uuid "tb-front")
	)
	(gr_text_box "SERIAL"
		(start 30 10)
		(end 50 20)
		(layer "B.SilkS")
		(uuid "tb-back")
	)
)
"#;

    fn shapes_in(text: &str) -> Vec<Sexpr> {
        let board = crate::sexpr::parse(text).unwrap();
        board.children("gr_rect").cloned().collect()
    }

    #[test]
    fn test_prepare_first_match_only() {
        let board = Board::from_source(BOARD).unwrap();
        let insertion = QrInserter::new(InsertOptions::default())
            .prepare(&board, "SERIAL", "abc")
            .unwrap();
        assert_eq!(insertion.placed.len(), 1);
        assert_eq!(insertion.placed[0].layer, "F.SilkS");
        assert!(!insertion.placed[0].mirrored);

        let out = insertion.patches.apply(board.source()).unwrap();
        assert_eq!(out.matches("(gr_text_box").count(), 1);
        let rects = shapes_in(&out);
        assert_eq!(rects.len(), insertion.matrix.dark_count());
        assert!(out.contains("(uuid \"edge-1\")"));
    }

    #[test]
    fn test_shapes_stay_inside_textbox() {
        let board = Board::from_source(BOARD).unwrap();
        let insertion = QrInserter::new(InsertOptions::default())
            .prepare(&board, "SERIAL", "batch 42")
            .unwrap();
        let out = insertion.patches.apply(board.source()).unwrap();
        for rect in shapes_in(&out) {
            for key in ["start", "end"] {
                let x = rect.child_value(key, 1).and_then(Sexpr::as_number).unwrap();
                let y = rect.child_value(key, 2).and_then(Sexpr::as_number).unwrap();
                assert!((10.0..=20.0).contains(&x), "x {x} outside box");
                assert!((10.0..=20.0).contains(&y), "y {y} outside box");
            }
        }
    }

    #[test]
    fn test_replace_all_handles_back_side() {
        let board = Board::from_source(BOARD).unwrap();
        let options = InsertOptions {
            replace_all: true,
            merge_runs: true,
            ..InsertOptions::default()
        };
        let insertion = QrInserter::new(options)
            .prepare(&board, "SERIAL", "abc")
            .unwrap();
        assert_eq!(insertion.placed.len(), 2);
        let back = &insertion.placed[1];
        assert_eq!(back.layer, "B.SilkS");
        assert!(back.mirrored);
        // Contain fit on a 20 x 10 box gives a 10 mm symbol.
        assert!((back.qr_size.0 - 10.0).abs() < 1e-9);
        assert_eq!(back.center.x, 40.0);

        let out = insertion.patches.apply(board.source()).unwrap();
        assert_eq!(out.matches("(gr_text_box").count(), 0);
        assert!(out.contains("(layer \"B.SilkS\")"));
    }

    #[test]
    fn test_layer_override_and_border() {
        let board = Board::from_source(BOARD).unwrap();
        let options = InsertOptions {
            layer: Some("F.Cu".to_string()),
            border: 2,
            keep_textbox: true,
            ..InsertOptions::default()
        };
        let insertion = QrInserter::new(options)
            .prepare(&board, "SERIAL", "abc")
            .unwrap();
        let placed = &insertion.placed[0];
        assert_eq!(placed.layer, "F.Cu");
        assert_eq!(placed.modules, insertion.matrix.width() + 4);

        let out = insertion.patches.apply(board.source()).unwrap();
        assert_eq!(out.matches("(gr_text_box").count(), 2);
    }

    #[test]
    fn test_verify_runs_before_edit() {
        let board = Board::from_source(BOARD).unwrap();
        let options = InsertOptions {
            verify: true,
            ..InsertOptions::default()
        };
        let insertion = QrInserter::new(options)
            .prepare(&board, "SERIAL", "https://example.com/trace/0001")
            .unwrap();
        assert!(!insertion.patches.is_empty());
    }

    #[test]
    fn test_missing_identifier() {
        let board = Board::from_source(BOARD).unwrap();
        let result = QrInserter::new(InsertOptions::default()).prepare(&board, "LOT", "abc");
        assert!(matches!(result, Err(Error::TextboxNotFound(id)) if id == "LOT"));
    }
}
