//! Reader for `x;y;z` point cloud text files.

use std::path::Path;

use super::read_lines;
use crate::geometry::Point3;
use crate::outcome::{codes, ErrorClass, PipelineError, PipelineResult};
use crate::sanitize::POINT_CLOUD_ARG;

/// Reads a point cloud with one `x;y;z` point per line.
///
/// Blank lines and lines starting with `#` are skipped. Every other line
/// must hold exactly three finite numbers.
pub fn read_point_cloud(path: impl AsRef<Path>) -> PipelineResult<Vec<Point3>> {
    let path = path.as_ref();
    let unreadable = |detail: String| {
        PipelineError::new(
            ErrorClass::Validation,
            codes::POINT_CLOUD_UNREADABLE,
            format!("Could not read point cloud file {}: {}", path.display(), detail),
        )
        .at(POINT_CLOUD_ARG)
    };
    let lines = read_lines(path).map_err(|e| unreadable(e.to_string()))?;
    let mut points = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() != 3 {
            return Err(PipelineError::argument(
                POINT_CLOUD_ARG,
                codes::POINT_CLOUD_COLUMNS,
                format!(
                    "Point cloud must have 3 columns, but line {} has {}",
                    idx + 1,
                    fields.len()
                ),
            ));
        }
        let mut coords = [0.0; 3];
        for (c, field) in coords.iter_mut().zip(&fields) {
            *c = field
                .trim()
                .parse::<f64>()
                .map_err(|e| unreadable(format!("line {}: {}", idx + 1, e)))?;
            if !c.is_finite() {
                return Err(unreadable(format!("line {}: non-finite coordinate", idx + 1)));
            }
        }
        points.push(Point3::new(coords[0], coords[1], coords[2]));
    }
    if points.is_empty() {
        return Err(PipelineError::new(
            ErrorClass::Validation,
            codes::POINT_CLOUD_EMPTY,
            format!("Incorrect or empty point cloud file {}", path.display()),
        )
        .at(POINT_CLOUD_ARG));
    }
    Ok(points)
}
