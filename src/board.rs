//! KiCad board documents (`.kicad_pcb`).
//!
//! A [`Board`] keeps the original file text next to its parsed tree. Reads go
//! through the tree; writes are expressed as a [`PatchSet`] against the text
//! and streamed to disk by [`Board::save`].

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::sexpr::{self, PatchSet, Sexpr, Span};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Textboxes whose sides differ by more than this (mm) are reported as non-square.
const SQUARE_TOLERANCE_MM: f64 = 0.001;

/// A loaded KiCad PCB
#[derive(Debug, Clone)]
pub struct Board {
    path: Option<PathBuf>,
    source: String,
    root: Sexpr,
}

impl Board {
    /// Read and parse a board file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {e}", path.display()),
            ))
        })?;
        let mut board = Self::from_source(source)?;
        board.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            bytes = board.source.len(),
            version = ?board.version(),
            "loaded board"
        );
        Ok(board)
    }

    /// Parse board text that did not come from a file.
    pub fn from_source(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = sexpr::parse(&source)?;
        match root.tag() {
            Some("kicad_pcb") => {}
            Some(other) => {
                return Err(Error::InvalidBoard(format!(
                    "expected a (kicad_pcb ...) document, found ({other} ...)"
                )));
            }
            None => {
                return Err(Error::InvalidBoard(
                    "expected a (kicad_pcb ...) document".to_string(),
                ));
            }
        }
        Ok(Self {
            path: None,
            source,
            root,
        })
    }

    /// Path the board was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Original document text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// File format version, e.g. `20240108` for KiCad 8
    pub fn version(&self) -> Option<u64> {
        self.root
            .child_value("version", 1)
            .and_then(Sexpr::as_number)
            .map(|v| v as u64)
    }

    /// All top-level `gr_text_box` nodes in file order
    fn textbox_nodes(&self) -> impl Iterator<Item = &Sexpr> {
        self.root.children("gr_text_box")
    }

    /// Text of every textbox on the board, in file order
    pub fn textbox_texts(&self) -> Vec<&str> {
        self.textbox_nodes().filter_map(textbox_text).collect()
    }

    /// First textbox whose text equals `identifier`.
    pub fn find_textbox(&self, identifier: &str) -> Result<Textbox> {
        self.textbox_nodes()
            .find(|node| textbox_text(node) == Some(identifier))
            .map(Textbox::from_node)
            .unwrap_or_else(|| Err(Error::TextboxNotFound(identifier.to_string())))
    }

    /// Every textbox whose text equals `identifier`, in file order.
    pub fn find_textboxes(&self, identifier: &str) -> Result<Vec<Textbox>> {
        let found = self
            .textbox_nodes()
            .filter(|node| textbox_text(node) == Some(identifier))
            .map(Textbox::from_node)
            .collect::<Result<Vec<_>>>()?;
        if found.is_empty() {
            return Err(Error::TextboxNotFound(identifier.to_string()));
        }
        Ok(found)
    }

    /// Spans to delete so that no `(group ... (members ...))` still lists `uuid`.
    ///
    /// Each span also covers the whitespace in front of the member string.
    pub fn group_member_spans(&self, uuid: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        for group in self.root.children("group") {
            for members in group.children("members") {
                let Some(items) = members.as_list() else {
                    continue;
                };
                for pair in items.windows(2) {
                    if pair[1].as_str() == Some(uuid) {
                        spans.push(Span::new(pair[0].span.end, pair[1].span.end));
                    }
                }
            }
        }
        spans
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indent_at(&self, offset: usize) -> &str {
        let line_start = self.source[..offset]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = &self.source[line_start..offset];
        let indent_len = prefix.len() - prefix.trim_start().len();
        &prefix[..indent_len]
    }

    /// Write the document with `patches` applied to `path`.
    ///
    /// The file is replaced atomically, so a failure leaves whatever was at
    /// `path` untouched.
    pub fn save(&self, patches: &PatchSet, path: &Path) -> Result<()> {
        let mut rendered = Vec::with_capacity(self.source.len() + patches.len() * 256);
        patches.write_to(&self.source, &mut rendered)?;

        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite).write(|f| {
            f.write_all(&rendered)?;
            f.flush()
        })?;
        tracing::debug!(
            path = %path.display(),
            bytes = rendered.len(),
            patches = patches.len(),
            "saved board"
        );
        Ok(())
    }
}

fn textbox_text(node: &Sexpr) -> Option<&str> {
    // KiCad 7 may write a bare `locked` flag before the text.
    node.as_list()?.iter().skip(1).find_map(Sexpr::as_str)
}

/// A `gr_text_box` placeholder and its geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Textbox {
    /// Text content, used as the lookup identifier
    pub text: String,
    /// Corners in drawing order: top-left, top-right, bottom-right, bottom-left
    /// of the unrotated box
    pub corners: [Point; 4],
    /// Rotation in degrees as written by KiCad, if any
    pub angle: Option<f64>,
    /// Layer name such as `F.SilkS`
    pub layer: String,
    /// Item uuid (`tstamp` on older boards)
    pub uuid: Option<String>,
    /// Source span of the whole `(gr_text_box ...)` list
    #[serde(skip)]
    pub span: Span,
}

impl Textbox {
    /// Extract geometry from a parsed `(gr_text_box ...)` node.
    pub fn from_node(node: &Sexpr) -> Result<Self> {
        let text = textbox_text(node)
            .ok_or_else(|| Error::InvalidBoard("gr_text_box without text".to_string()))?
            .to_string();

        let corners = if let Some(pts) = node.child("pts") {
            let points: Vec<Point> = pts.children("xy").filter_map(xy_point).collect();
            <[Point; 4]>::try_from(points).map_err(|points| {
                Error::InvalidBoard(format!(
                    "textbox '{text}' has {} corner points, expected 4",
                    points.len()
                ))
            })?
        } else {
            let start = node.child("start").and_then(xy_point);
            let end = node.child("end").and_then(xy_point);
            let (Some(start), Some(end)) = (start, end) else {
                return Err(Error::InvalidBoard(format!(
                    "textbox '{text}' has neither (pts ...) nor (start ...)/(end ...)"
                )));
            };
            let (x0, x1) = (start.x.min(end.x), start.x.max(end.x));
            let (y0, y1) = (start.y.min(end.y), start.y.max(end.y));
            [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ]
        };

        let layer = node
            .child_value("layer", 1)
            .and_then(Sexpr::as_text)
            .ok_or_else(|| Error::InvalidBoard(format!("textbox '{text}' has no layer")))?
            .to_string();

        let uuid = node
            .child_value("uuid", 1)
            .or_else(|| node.child_value("tstamp", 1))
            .and_then(Sexpr::as_text)
            .map(str::to_string);

        let angle = node.child_value("angle", 1).and_then(Sexpr::as_number);

        let textbox = Self {
            text,
            corners,
            angle,
            layer,
            uuid,
            span: node.span,
        };
        if textbox.width() <= 0.0 || textbox.height() <= 0.0 {
            return Err(Error::InvalidBoard(format!(
                "textbox '{}' has zero area",
                textbox.text
            )));
        }
        Ok(textbox)
    }

    /// Midpoint of the box
    pub fn center(&self) -> Point {
        Point::centroid(&self.corners)
    }

    /// Length of the top edge
    pub fn width(&self) -> f64 {
        (self.corners[1] - self.corners[0]).length()
    }

    /// Length of the right edge
    pub fn height(&self) -> f64 {
        (self.corners[2] - self.corners[1]).length()
    }

    /// Whether width and height agree to within a micrometre
    pub fn is_square(&self) -> bool {
        (self.width() - self.height()).abs() <= SQUARE_TOLERANCE_MM
    }

    /// Axis-aligned bounds as `(min, max)`, covering rotated boxes too
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min = Point::new(min.x.min(c.x), min.y.min(c.y));
            max = Point::new(max.x.max(c.x), max.y.max(c.y));
        }
        (min, max)
    }
}

fn xy_point(node: &Sexpr) -> Option<Point> {
    let items = node.as_list()?;
    Some(Point::new(items.get(1)?.as_number()?, items.get(2)?.as_number()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb
	(version 20240108)
	(generator "pcbnew")
	(gr_text_box "OTHER"
		(start 0 0)
		(end 5 5)
		(layer "F.SilkS")
		(uuid "00000000-0000-0000-0000-000000000001")
	)
	(gr_text_box "QR"
		(start 120 60)
		(end 100 40)
		(layer "B.SilkS")
		(uuid "00000000-0000-0000-0000-000000000002")
	)
	(gr_text_box locked "ROT"
		(pts
			(xy 10 0) (xy 20 10) (xy 10 20) (xy 0 10)
		)
		(angle 315)
		(layer F.Fab)
		(tstamp 00000000-0000-0000-0000-000000000003)
	)
	(group "traceability"
		(uuid "00000000-0000-0000-0000-0000000000aa")
		(members "00000000-0000-0000-0000-000000000001" "00000000-0000-0000-0000-000000000002")
	)
)
"#;

    #[test]
    fn test_rejects_non_board() {
        assert!(matches!(
            Board::from_source("(kicad_sch (version 1))"),
            Err(Error::InvalidBoard(_))
        ));
        assert!(matches!(Board::from_source("(kicad_pcb"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_version_and_texts() {
        let board = Board::from_source(BOARD).unwrap();
        assert_eq!(board.version(), Some(20240108));
        assert_eq!(board.textbox_texts(), vec!["OTHER", "QR", "ROT"]);
    }

    #[test]
    fn test_find_textbox_normalizes_corners() {
        let board = Board::from_source(BOARD).unwrap();
        let tb = board.find_textbox("QR").unwrap();
        assert_eq!(tb.layer, "B.SilkS");
        assert_eq!(tb.corners[0], Point::new(100.0, 40.0));
        assert_eq!(tb.corners[2], Point::new(120.0, 60.0));
        assert_eq!(tb.center(), Point::new(110.0, 50.0));
        assert_eq!(tb.width(), 20.0);
        assert!(tb.is_square());
        assert_eq!(&BOARD[tb.span.start..tb.span.start + 16], "(gr_text_box \"QR");
    }

    #[test]
    fn test_rotated_textbox() {
        let board = Board::from_source(BOARD).unwrap();
        let tb = board.find_textbox("ROT").unwrap();
        assert_eq!(tb.layer, "F.Fab");
        assert_eq!(tb.angle, Some(315.0));
        assert_eq!(tb.uuid.as_deref(), Some("00000000-0000-0000-0000-000000000003"));
        assert_eq!(tb.center(), Point::new(10.0, 10.0));
        assert!((tb.width() - 200f64.sqrt()).abs() < 1e-9);
        assert_eq!(tb.bounds(), (Point::new(0.0, 0.0), Point::new(20.0, 20.0)));
    }

    #[test]
    fn test_not_found() {
        let board = Board::from_source(BOARD).unwrap();
        assert!(matches!(
            board.find_textbox("qr"),
            Err(Error::TextboxNotFound(id)) if id == "qr"
        ));
        assert!(matches!(
            board.find_textboxes("MISSING"),
            Err(Error::TextboxNotFound(_))
        ));
    }

    #[test]
    fn test_first_match_wins_and_all_matches() {
        let source = r#"(kicad_pcb
  (gr_text_box "ID" (start 0 0) (end 1 1) (layer "F.SilkS"))
  (gr_text_box "ID" (start 5 5) (end 7 7) (layer "F.SilkS"))
)"#;
        let board = Board::from_source(source).unwrap();
        assert_eq!(board.find_textbox("ID").unwrap().width(), 1.0);
        let all = board.find_textboxes("ID").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].width(), 2.0);
    }

    #[test]
    fn test_malformed_match_is_reported() {
        let source = r#"(kicad_pcb (gr_text_box "ID" (start 0 0) (layer "F.SilkS")))"#;
        let board = Board::from_source(source).unwrap();
        assert!(matches!(board.find_textbox("ID"), Err(Error::InvalidBoard(_))));
    }

    #[test]
    fn test_group_member_spans() {
        let board = Board::from_source(BOARD).unwrap();
        let spans = board.group_member_spans("00000000-0000-0000-0000-000000000002");
        assert_eq!(spans.len(), 1);
        let mut patches = PatchSet::new();
        patches.remove(spans[0]);
        let patched = patches.apply(board.source()).unwrap();
        assert!(patched.contains("(members \"00000000-0000-0000-0000-000000000001\")"));
    }

    #[test]
    fn test_indent_at() {
        let board = Board::from_source(BOARD).unwrap();
        let tb = board.find_textbox("OTHER").unwrap();
        assert_eq!(board.indent_at(tb.span.start), "\t");
    }

    #[test]
    fn test_save_applies_patches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.kicad_pcb");
        let board = Board::from_source("(kicad_pcb (version 20240108))\n").unwrap();
        let mut patches = PatchSet::new();
        patches.insert(29, " (generator \"test\")");
        board.save(&patches, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "(kicad_pcb (version 20240108) (generator \"test\"))\n"
        );
    }
}
