//! Writer for the ASCII OFF format exchanged with the external engines.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::mesh::Mesh;

/// Writes `mesh` in OFF format to any writer.
///
/// The layout is fixed: the `OFF` token, a `V T 0` count line, one
/// `x y z` line per vertex with six decimals and one `3 a b c` line per
/// triangle.
pub fn write_off_to<W: Write>(mut out: W, mesh: &Mesh) -> io::Result<()> {
    writeln!(out, "OFF")?;
    writeln!(out, "{} {} 0", mesh.vertices.len(), mesh.triangles.len())?;
    for v in &mesh.vertices {
        writeln!(out, "{:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    for t in &mesh.triangles {
        writeln!(out, "3 {} {} {}", t[0], t[1], t[2])?;
    }
    out.flush()
}

/// Writes `mesh` to an OFF file at `path`, replacing any existing file.
pub fn write_off(path: impl AsRef<Path>, mesh: &Mesh) -> io::Result<()> {
    let file = File::create(path)?;
    write_off_to(BufWriter::new(file), mesh)
}
