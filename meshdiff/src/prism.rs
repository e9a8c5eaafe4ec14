//! Axis-aligned box used to clip the difference to the requested limits.

use crate::geometry::Point3;
use crate::limits::Range;
use crate::mesh::Mesh;

/// Two triangles per face, listed with inward winding and flipped when the
/// mesh is built.
const FACES: [[usize; 3]; 12] = [
    [0, 1, 2],
    [1, 3, 2],
    [0, 6, 4],
    [0, 2, 6],
    [1, 5, 3],
    [3, 5, 7],
    [1, 0, 5],
    [0, 4, 5],
    [2, 3, 6],
    [3, 7, 6],
    [4, 6, 7],
    [4, 7, 5],
];

/// Builds the closed prism spanning `x`, `y` and `z`.
///
/// Corner `i` takes the maximum of X when bit 0 of `i` is set, of Y for bit 1
/// and of Z for bit 2. Triangles are wound so that normals point outward.
pub fn bounding_prism([x, y, z]: [Range; 3]) -> Mesh {
    let vertices = (0..8)
        .map(|i| {
            Point3::new(
                if i & 1 == 0 { x.min } else { x.max },
                if i & 2 == 0 { y.min } else { y.max },
                if i & 4 == 0 { z.min } else { z.max },
            )
        })
        .collect();
    let triangles = FACES.iter().map(|&[a, b, c]| [a, c, b]).collect();
    Mesh::new(vertices, triangles)
}
