//! Plane geometry in board millimetres (x right, y down, as KiCad draws).

use serde::Serialize;
use std::ops::{Add, Mul, Sub};

/// A point or vector on the board
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    /// Horizontal coordinate in mm
    pub x: f64,
    /// Vertical coordinate in mm (grows downward)
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length when used as a vector
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        (len > f64::EPSILON).then(|| Self::new(self.x / len, self.y / len))
    }

    /// Midpoint of a set of points
    pub fn centroid(points: &[Point]) -> Self {
        let n = points.len().max(1) as f64;
        let sum = points.iter().fold(Point::default(), |acc, p| acc + *p);
        Self::new(sum.x / n, sum.y / n)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}
