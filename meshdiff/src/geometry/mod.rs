//! Basic geometry primitives shared by the mesh builders.

mod point3;

pub use point3::Point3;

/// Representation of a 2D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point3> for Point {
    fn from(p: Point3) -> Self {
        Point::new(p.x, p.y)
    }
}

/// Twice the signed area of the triangle `a`, `b`, `c` projected onto the XY
/// plane. Positive when the vertices are counter-clockwise.
pub fn orient2d(a: Point3, b: Point3, c: Point3) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Signed area of a simple polygon using the shoelace formula.
///
/// The result is positive for counter-clockwise vertex order and negative for
/// clockwise order.
pub fn signed_polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum * 0.5
}
