//! Mapping a QR module grid onto a textbox.

use crate::board::Textbox;
use crate::error::{Error, Result};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the square symbol is scaled into a possibly non-square box
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Uniform scale by the shorter side; the code stays inside the box
    #[default]
    Contain,
    /// Independent scale per axis; the code fills the box exactly
    Stretch,
    /// Uniform scale by the mean of both sides
    Average,
}

impl FitMode {
    /// Lower-case name used on the command line and in config files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Stretch => "stretch",
            Self::Average => "average",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "stretch" => Ok(Self::Stretch),
            "average" => Ok(Self::Average),
            _ => Err(format!(
                "Unsupported fit mode '{value}', expected contain, stretch or average"
            )),
        }
    }
}

/// Transform from module grid coordinates to board coordinates.
///
/// Column `c`, row `r` of the grid occupies the parallelogram spanned from
/// `origin + u * c * pitch_u + v * r * pitch_v` along `u` and `v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Midpoint of the symbol (the textbox midpoint)
    pub center: Point,
    /// Unit vector along the textbox's top edge
    pub u: Point,
    /// Unit vector along the textbox's side edge
    pub v: Point,
    /// Module size along `u` in mm
    pub pitch_u: f64,
    /// Module size along `v` in mm
    pub pitch_v: f64,
    /// Modules per side, quiet zone included
    pub modules: usize,
    /// Flip columns so the code reads correctly from the back of the board
    pub mirror: bool,
}

impl Placement {
    /// Fit a `modules` x `modules` grid onto `textbox`.
    pub fn fit(textbox: &Textbox, modules: usize, fit: FitMode, mirror: bool) -> Result<Self> {
        if modules == 0 {
            return Err(Error::Other("cannot place an empty module grid".to_string()));
        }
        let [p0, p1, p2, _] = textbox.corners;
        let degenerate =
            || Error::InvalidBoard(format!("textbox '{}' has a zero-length edge", textbox.text));
        let u = (p1 - p0).normalized().ok_or_else(degenerate)?;
        let v = (p2 - p1).normalized().ok_or_else(degenerate)?;

        let (width, height) = (textbox.width(), textbox.height());
        let n = modules as f64;
        let (pitch_u, pitch_v) = match fit {
            FitMode::Contain => {
                let side = width.min(height) / n;
                (side, side)
            }
            FitMode::Stretch => (width / n, height / n),
            FitMode::Average => {
                let side = (width + height) / 2.0 / n;
                (side, side)
            }
        };

        Ok(Self {
            center: textbox.center(),
            u,
            v,
            pitch_u,
            pitch_v,
            modules,
            mirror,
        })
    }

    /// Overall symbol size along `u` and `v`
    pub fn size(&self) -> (f64, f64) {
        let n = self.modules as f64;
        (self.pitch_u * n, self.pitch_v * n)
    }

    /// Corner of the symbol at grid position (0, 0)
    pub fn origin(&self) -> Point {
        let (w, h) = self.size();
        self.center - self.u * (w / 2.0) - self.v * (h / 2.0)
    }

    fn grid_point(&self, col: f64, row: f64) -> Point {
        self.origin() + self.u * (col * self.pitch_u) + self.v * (row * self.pitch_v)
    }

    /// Corners of the run of modules `cols` (end exclusive) in `row`.
    ///
    /// Returned in drawing order starting at the run's top-left corner.
    pub fn run_corners(&self, row: usize, cols: std::ops::Range<usize>) -> [Point; 4] {
        let (c0, c1) = if self.mirror {
            (self.modules - cols.end, self.modules - cols.start)
        } else {
            (cols.start, cols.end)
        };
        let (c0, c1, r0, r1) = (c0 as f64, c1 as f64, row as f64, (row + 1) as f64);
        [
            self.grid_point(c0, r0),
            self.grid_point(c1, r0),
            self.grid_point(c1, r1),
            self.grid_point(c0, r1),
        ]
    }

    /// Whether the symbol's edges run parallel to the board axes
    pub fn is_axis_aligned(&self) -> bool {
        const EPS: f64 = 1e-9;
        (self.u.y.abs() < EPS && self.v.x.abs() < EPS)
            || (self.u.x.abs() < EPS && self.v.y.abs() < EPS)
    }

    /// Rotation of the symbol in KiCad's convention (degrees, counter-clockwise on screen)
    pub fn rotation_degrees(&self) -> f64 {
        let degrees = (-self.u.y).atan2(self.u.x).to_degrees();
        let normalized = degrees.rem_euclid(360.0);
        if (normalized - 360.0).abs() < 1e-9 {
            0.0
        } else {
            normalized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::Span;

    fn textbox(corners: [Point; 4]) -> Textbox {
        Textbox {
            text: "QR".to_string(),
            corners,
            angle: None,
            layer: "F.SilkS".to_string(),
            uuid: None,
            span: Span::default(),
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Textbox {
        textbox([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_square_box_fills_exactly() {
        let p = Placement::fit(&rect(100.0, 40.0, 121.0, 61.0), 21, FitMode::Contain, false).unwrap();
        assert!((p.pitch_u - 1.0).abs() < 1e-12);
        assert!(p.is_axis_aligned());
        assert!(approx(p.origin(), Point::new(100.0, 40.0)));
        let first = p.run_corners(0, 0..1);
        assert!(approx(first[0], Point::new(100.0, 40.0)));
        assert!(approx(first[2], Point::new(101.0, 41.0)));
        let last = p.run_corners(20, 20..21);
        assert!(approx(last[2], Point::new(121.0, 61.0)));
    }

    #[test]
    fn test_fit_modes_on_wide_box() {
        let tb = rect(0.0, 0.0, 30.0, 10.0);
        let contain = Placement::fit(&tb, 10, FitMode::Contain, false).unwrap();
        assert_eq!(contain.size(), (10.0, 10.0));
        assert!(approx(contain.origin(), Point::new(10.0, 0.0)));

        let stretch = Placement::fit(&tb, 10, FitMode::Stretch, false).unwrap();
        assert_eq!(stretch.size(), (30.0, 10.0));
        assert!(approx(stretch.origin(), Point::new(0.0, 0.0)));

        let average = Placement::fit(&tb, 10, FitMode::Average, false).unwrap();
        assert_eq!(average.size(), (20.0, 20.0));
        assert!(approx(average.origin(), Point::new(5.0, -5.0)));
    }

    #[test]
    fn test_mirror_flips_columns() {
        let p = Placement::fit(&rect(0.0, 0.0, 10.0, 10.0), 10, FitMode::Contain, true).unwrap();
        let corners = p.run_corners(0, 0..2);
        assert!(approx(corners[0], Point::new(8.0, 0.0)));
        assert!(approx(corners[1], Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_rotated_box_follows_axes() {
        // 10 mm square rotated 90 degrees counter-clockwise on screen.
        let tb = textbox([
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        let p = Placement::fit(&tb, 5, FitMode::Contain, false).unwrap();
        assert!(p.is_axis_aligned());
        assert!((p.rotation_degrees() - 90.0).abs() < 1e-9);
        let first = p.run_corners(0, 0..1);
        assert!(approx(first[0], Point::new(0.0, 10.0)));
        assert!(approx(first[1], Point::new(0.0, 8.0)));
        assert!(approx(first[2], Point::new(2.0, 8.0)));
    }

    #[test]
    fn test_unrotated_angle_is_zero() {
        let p = Placement::fit(&rect(0.0, 0.0, 4.0, 4.0), 4, FitMode::Contain, false).unwrap();
        assert_eq!(p.rotation_degrees(), 0.0);
    }

    #[test]
    fn test_fit_mode_parse() {
        assert_eq!("Stretch".parse::<FitMode>(), Ok(FitMode::Stretch));
        assert_eq!(FitMode::default(), FitMode::Contain);
        assert!("cover".parse::<FitMode>().is_err());
    }
}
