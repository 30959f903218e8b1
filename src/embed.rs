//! Drawing a placed QR matrix as native board graphics.

use crate::board::{Board, Textbox};
use crate::geometry::Point;
use crate::placement::Placement;
use crate::qr::QrMatrix;
use crate::sexpr::{self, PatchSet, Sexpr};
use uuid::Uuid;

/// First board file version that writes `(uuid ...)` instead of `(tstamp ...)`.
const UUID_KEYWORD_VERSION: u64 = 20231007;

/// Turns dark modules into filled shapes on one layer
#[derive(Debug, Clone)]
pub struct Embedder {
    layer: String,
    merge_runs: bool,
    id_keyword: &'static str,
}

impl Embedder {
    /// Embedder drawing on `layer` for a board of the given file version.
    pub fn new(layer: impl Into<String>, merge_runs: bool, board_version: Option<u64>) -> Self {
        let id_keyword = match board_version {
            Some(v) if v < UUID_KEYWORD_VERSION => "tstamp",
            _ => "uuid",
        };
        Self {
            layer: layer.into(),
            merge_runs,
            id_keyword,
        }
    }

    /// Layer the shapes are drawn on
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// One filled shape per dark module (or per dark run when merging).
    pub fn shapes(&self, matrix: &QrMatrix, placement: &Placement) -> Vec<Sexpr> {
        let axis_aligned = placement.is_axis_aligned();
        let mut shapes = Vec::with_capacity(matrix.dark_count());
        for row in 0..matrix.width() {
            for run in matrix.dark_runs(row) {
                let cells: Vec<_> = if self.merge_runs {
                    vec![run]
                } else {
                    run.map(|col| col..col + 1).collect()
                };
                for cols in cells {
                    let corners = placement.run_corners(row, cols);
                    shapes.push(if axis_aligned {
                        self.rect(&corners)
                    } else {
                        self.poly(&corners)
                    });
                }
            }
        }
        shapes
    }

    /// Queue the edits that put `shapes` where `textbox` is.
    ///
    /// With `keep_textbox` the shapes are inserted after the textbox; otherwise
    /// they take its place and any group membership of the textbox is dropped.
    pub fn queue(
        &self,
        board: &Board,
        textbox: &Textbox,
        shapes: &[Sexpr],
        keep_textbox: bool,
        patches: &mut PatchSet,
    ) {
        let indent = match board.indent_at(textbox.span.start) {
            "" => "\t",
            indent => indent,
        };
        // Textboxes are top-level items, so their indent is exactly one level.
        let unit = if indent.contains('\t') { "\t" } else { indent };
        let separator = format!("\n{indent}");
        let rendered = shapes
            .iter()
            .map(|shape| sexpr::render(shape, indent, unit))
            .collect::<Vec<_>>()
            .join(&separator);

        if keep_textbox {
            patches.insert(textbox.span.end, format!("{separator}{rendered}"));
            return;
        }

        patches.replace(textbox.span, rendered);
        if let Some(uuid) = &textbox.uuid {
            for span in board.group_member_spans(uuid) {
                tracing::debug!(uuid = %uuid, "dropping removed textbox from its group");
                patches.remove(span);
            }
        }
    }

    fn rect(&self, corners: &[Point; 4]) -> Sexpr {
        let (mut min, mut max) = (corners[0], corners[0]);
        for c in &corners[1..] {
            min = Point::new(min.x.min(c.x), min.y.min(c.y));
            max = Point::new(max.x.max(c.x), max.y.max(c.y));
        }
        self.shape("gr_rect", vec![xy_node("start", min), xy_node("end", max)])
    }

    fn poly(&self, corners: &[Point; 4]) -> Sexpr {
        let pts = Sexpr::node("pts", corners.iter().map(|&p| xy_node("xy", p)));
        self.shape("gr_poly", vec![pts])
    }

    fn shape(&self, tag: &str, mut items: Vec<Sexpr>) -> Sexpr {
        items.extend([
            Sexpr::node(
                "stroke",
                [
                    Sexpr::node("width", [Sexpr::number(0.0)]),
                    Sexpr::node("type", [Sexpr::symbol("solid")]),
                ],
            ),
            Sexpr::node("fill", [Sexpr::symbol("solid")]),
            Sexpr::node("layer", [Sexpr::string(self.layer.as_str())]),
            Sexpr::node(self.id_keyword, [Sexpr::string(Uuid::new_v4().to_string())]),
        ]);
        Sexpr::node(tag, items)
    }
}

fn xy_node(tag: &str, p: Point) -> Sexpr {
    Sexpr::node(tag, [Sexpr::number(p.x), Sexpr::number(p.y)])
}

/// Whether `layer` is on the back of the board (`B.Cu`, `B.SilkS`, ...)
pub fn is_back_layer(layer: &str) -> bool {
    layer.starts_with("B.")
}
