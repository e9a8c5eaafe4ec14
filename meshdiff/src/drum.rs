//! Closed "drum" solids synthesized from survey point clouds.
//!
//! The top of the drum is the Delaunay surface of the cloud. Its boundary is
//! copied below the lowest point of the cloud to form a flat base, and a
//! ribbon of side triangles joins the two loops.

use std::collections::{HashMap, HashSet};

use crate::geometry::{orient2d, signed_polygon_area, Point, Point3};
use crate::limits::Range;
use crate::mesh::Mesh;
use crate::outcome::{codes, PipelineError, PipelineResult};

/// Delaunay triangulation of the XY projection of `points`.
///
/// Triangles are returned counter-clockwise in XY together with the
/// triangulation's unmatched edges. Returns `None` when no triangle can be
/// formed (fewer than three points or all points collinear).
fn triangulate(points: &[Point3]) -> Option<(Vec<[usize; 3]>, Vec<(usize, usize)>)> {
    if points.len() < 3 {
        return None;
    }
    let coords: Vec<delaunator::Point> = points
        .iter()
        .map(|p| delaunator::Point { x: p.x, y: p.y })
        .collect();
    let triangulation = delaunator::triangulate(&coords);
    if triangulation.triangles.is_empty() {
        return None;
    }
    let triangles = triangulation
        .triangles
        .chunks(3)
        .map(|c| {
            if orient2d(points[c[0]], points[c[1]], points[c[2]]) < 0.0 {
                [c[0], c[2], c[1]]
            } else {
                [c[0], c[1], c[2]]
            }
        })
        .collect();
    let edges = triangulation
        .halfedges
        .iter()
        .enumerate()
        .filter(|(_, &opposite)| opposite == delaunator::EMPTY)
        .map(|(e, _)| {
            (
                triangulation.triangles[e],
                triangulation.triangles[delaunator::next_halfedge(e)],
            )
        })
        .collect();
    Some((triangles, edges))
}

fn top_triangulation_failed() -> PipelineError {
    PipelineError::geometry(
        codes::TOP_TRIANGULATION_FAILED,
        "Error trying to generate a mesh from the point cloud: Delaunay triangulation of the point cloud failed",
    )
}

fn boundary_not_simple() -> PipelineError {
    PipelineError::geometry(
        codes::BOUNDARY_NOT_SIMPLE,
        "could not get ordered border for delaunay triangulation",
    )
}

/// Chains unordered boundary edges into a single closed cycle.
///
/// Returns the vertices of the cycle in walk order, starting with the first
/// edge. Every edge is consumed exactly once. Fails when the edges do not
/// form one simple cycle: disjoint loops, a vertex touched by more than two
/// edges, or an open chain.
pub fn order_boundary(edges: &[(usize, usize)]) -> PipelineResult<Vec<usize>> {
    let Some(&(start, second)) = edges.first() else {
        return Err(boundary_not_simple());
    };
    if edges.len() < 3 || start == second {
        return Err(boundary_not_simple());
    }

    let mut incident: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &(a, b)) in edges.iter().enumerate() {
        incident.entry(a).or_default().push(i);
        incident.entry(b).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    used[0] = true;
    let mut visited: HashSet<usize> = HashSet::from([start, second]);
    let mut ordered = Vec::with_capacity(edges.len());
    ordered.push(start);
    ordered.push(second);
    let mut current = second;

    while ordered.len() < edges.len() {
        let mut candidates = incident[&current].iter().copied().filter(|&e| !used[e]);
        let (Some(edge), None) = (candidates.next(), candidates.next()) else {
            return Err(boundary_not_simple());
        };
        used[edge] = true;
        let (a, b) = edges[edge];
        let next = if a == current { b } else { a };
        if !visited.insert(next) {
            return Err(boundary_not_simple());
        }
        ordered.push(next);
        current = next;
    }

    // the one edge left over must close the loop
    let mut remaining = (0..edges.len()).filter(|&e| !used[e]);
    match (remaining.next(), remaining.next()) {
        (Some(e), None) if edges[e] == (current, start) || edges[e] == (start, current) => {
            Ok(ordered)
        }
        _ => Err(boundary_not_simple()),
    }
}

/// Keeps the points whose elevation lies inside `depth`, or every point when
/// no depth range is given.
pub fn cull_by_depth(points: &[Point3], depth: Option<Range>) -> Vec<Point3> {
    match depth {
        Some(range) => points.iter().copied().filter(|p| range.contains(p.z)).collect(),
        None => points.to_vec(),
    }
}

/// Builds a closed drum from `points`.
///
/// The base lies `zsub` below the lowest point. Top vertices keep their
/// indices; the base loop vertices are appended after them. The mesh is
/// wound outward: the top faces up, the base faces down and the ribbon faces
/// away from the cloud.
pub fn drum_from_points(points: &[Point3], zsub: f64) -> PipelineResult<Mesh> {
    let (top, edges) = triangulate(points).ok_or_else(top_triangulation_failed)?;
    let mut ring = order_boundary(&edges)?;
    let outline: Vec<Point> = ring.iter().map(|&i| points[i].into()).collect();
    if signed_polygon_area(&outline) < 0.0 {
        ring.reverse();
    }

    let base_z = points.iter().map(|p| p.z).fold(f64::INFINITY, f64::min) - zsub;
    let base: Vec<Point3> = ring.iter().map(|&i| points[i].with_z(base_z)).collect();
    let offset = points.len();
    let n = ring.len();
    log::debug!(
        "drum: {} top triangles, {} boundary vertices, base at z={}",
        top.len(),
        n,
        base_z
    );

    let mut triangles = Vec::with_capacity(top.len() + 2 * n + n);
    triangles.extend(top);
    for i in 0..n {
        let j = (i + 1) % n;
        triangles.push([ring[i], offset + i, ring[j]]);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        triangles.push([ring[j], offset + i, offset + j]);
    }

    let (bottom, _) = triangulate(&base).ok_or_else(|| {
        PipelineError::geometry(
            codes::BASE_TRIANGULATION_FAILED,
            "Error trying to generate a mesh from the point cloud: Delaunay triangulation of the base failed",
        )
    })?;
    // base faces downward
    triangles.extend(bottom.into_iter().map(|[a, b, c]| [offset + a, offset + c, offset + b]));

    let mut vertices = points.to_vec();
    vertices.extend(base);
    Ok(Mesh::new(vertices, triangles))
}

/// Culls `cloud` to `depth` and builds the drum from the retained points.
pub fn drum_from_cloud(cloud: &[Point3], depth: Option<Range>, zsub: f64) -> PipelineResult<Mesh> {
    let retained = cull_by_depth(cloud, depth);
    if retained.len() < cloud.len() {
        log::info!(
            "depth cull kept {} of {} points",
            retained.len(),
            cloud.len()
        );
    }
    drum_from_points(&retained, zsub)
}
