use geo::{Coord, CoordsIter, LineString, MultiPolygon};

use crate::error::GeometryError;

/// Structural sanity check run before any area or intersection math:
/// non-empty, every ring closed with at least 4 coordinates, every coordinate
/// finite, and no ring crossing or touching itself. Rings are checked one at a
/// time; a hole touching its shell is accepted.
pub fn check_geometry(geometry: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if geometry.0.is_empty() { return Err(GeometryError::Empty) }

    for polygon in &geometry.0 {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for (ring, line) in rings.enumerate() {
            let len = line.0.len();
            if len < 4 { return Err(GeometryError::ShortRing { ring, len }) }
        }
    }

    if let Some(c) = geometry.coords_iter().find(|c| !(c.x.is_finite() && c.y.is_finite())) {
        return Err(GeometryError::NonFinite { x: c.x, y: c.y });
    }

    for polygon in &geometry.0 {
        let mut rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        if let Some(ring) = rings.position(self_intersects) {
            return Err(GeometryError::SelfIntersection { ring });
        }
    }

    Ok(())
}

/// Whether two non-adjacent edges of a closed ring meet.
///
/// Edges are swept in order of their left end, so only edges whose x-ranges
/// overlap are compared.
fn self_intersects(ring: &LineString<f64>) -> bool {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    coords.dedup();
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last { coords.push(first) }
    }

    let edges: Vec<(Coord<f64>, Coord<f64>)> = coords.windows(2).map(|w| (w[0], w[1])).collect();
    let n = edges.len();
    if n < 3 { return false }

    let adjacent = |i: usize, j: usize| i.abs_diff(j) == 1 || i.abs_diff(j) == n - 1;
    let min_x = |(a, b): (Coord<f64>, Coord<f64>)| a.x.min(b.x);
    let max_x = |(a, b): (Coord<f64>, Coord<f64>)| a.x.max(b.x);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| min_x(edges[i]).total_cmp(&min_x(edges[j])));

    for (k, &i) in order.iter().enumerate() {
        let right = max_x(edges[i]);
        for &j in &order[k + 1..] {
            if min_x(edges[j]) > right { break }
            if !adjacent(i, j) && edges_meet(edges[i], edges[j]) { return true }
        }
    }
    false
}

fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `c` lies within the bounding box of `a`-`b`; only meaningful when collinear.
fn within(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> bool {
    c.x >= a.x.min(b.x) && c.x <= a.x.max(b.x) && c.y >= a.y.min(b.y) && c.y <= a.y.max(b.y)
}

fn edges_meet((p1, p2): (Coord<f64>, Coord<f64>), (q1, q2): (Coord<f64>, Coord<f64>)) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    let straddles = |a: f64, b: f64| (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
    if straddles(d1, d2) && straddles(d3, d4) { return true }

    (d1 == 0.0 && within(q1, q2, p1))
        || (d2 == 0.0 && within(q1, q2, p2))
        || (d3 == 0.0 && within(p1, p2, q1))
        || (d4 == 0.0 && within(p1, p2, q2))
}
