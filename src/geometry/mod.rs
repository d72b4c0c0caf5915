//! Geometry codec: polygon rings from labeled rasters and back.
//!
//! This is the one place in the crate where pixel/polygon conventions are
//! decided, so they are spelled out here and nowhere else:
//!
//! - Connected components use **4-connectivity**.
//! - Rings run along the cracks of the pixel grid, so every vertex is an
//!   integer grid point and the pixel `(x, y)` is the unit square
//!   `[x, x+1) x [y, y+1)`. The component interior is kept on the left of
//!   the travel direction; holes come out with the opposite orientation.
//! - Rasterization uses even-odd fill and samples **pixel centers**
//!   `(x + 0.5, y + 0.5)`, filling the half-open span `[enter, exit)` on
//!   each scanline.
//!
//! With these conventions `rasterize(extract(mask, label))` reproduces
//! `mask == label` exactly: ring edges lie on integer coordinates and
//! sample points on half-integers, so no sample ever lands on a boundary.

use crate::error::CocomaskError;
use crate::mask::Mask;

/// A closed polygon ring in pixel coordinate space.
///
/// The closing edge from the last point back to the first is implicit.
#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    points: Vec<(f64, f64)>,
}

impl Ring {
    /// Creates a ring from a list of `(x, y)` points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Parses a ring from the flat COCO form `[x1, y1, x2, y2, ...]`.
    ///
    /// Returns an error for odd-length input or fewer than 3 points.
    pub fn from_flat(flat: &[f64]) -> Result<Self, CocomaskError> {
        if flat.len() % 2 != 0 {
            return Err(CocomaskError::Geometry(format!(
                "flat ring has odd length {}",
                flat.len()
            )));
        }
        let points: Vec<(f64, f64)> = flat.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        if points.len() < 3 {
            return Err(CocomaskError::Geometry(format!(
                "ring has {} point(s), need at least 3",
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// Serializes the ring into the flat COCO form.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.points.len() * 2);
        for &(x, y) in &self.points {
            flat.push(x);
            flat.push(y);
        }
        flat
    }

    /// The ring's vertices.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the ring has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed shoelace sum. Outer rings produced by [`extract`]
    /// have a negative sign; holes are positive.
    fn shoelace2(&self) -> f64 {
        let n = self.points.len();
        let mut acc = 0.0;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            acc += x0 * y1 - x1 * y0;
        }
        acc
    }
}

/// Extracts the polygon rings of every connected component carrying
/// `label` in `mask`.
///
/// Multiple blobs and interior holes all land in the returned list; under
/// even-odd fill the holes carve themselves back out. Rings are emitted
/// in raster scan order of their components and simplified to remove
/// collinear vertices (lossless).
///
/// # Errors
/// [`CocomaskError::EmptyInstance`] if `label` never occurs in `mask`.
pub fn extract(mask: &Mask, label: u32) -> Result<Vec<Ring>, CocomaskError> {
    extract_filtered(mask, label, 0)
}

/// [`extract`] with a minimum component size: connected components with
/// fewer than `min_area` pixels are dropped. `min_area = 0` keeps
/// everything (the lossless default).
pub fn extract_filtered(
    mask: &Mask,
    label: u32,
    min_area: usize,
) -> Result<Vec<Ring>, CocomaskError> {
    if !mask.contains_label(label) {
        return Err(CocomaskError::EmptyInstance { label });
    }

    let w = mask.width() as usize;
    let h = mask.height() as usize;
    let inside = |x: i64, y: i64| -> bool {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && mask.get(x as u32, y as u32) == label
    };

    // Component labeling, 4-connected, raster scan order.
    let mut component = vec![0u32; w * h];
    let mut next_component = 0u32;
    let mut component_sizes: Vec<usize> = Vec::new();
    let mut queue: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if mask.get(x as u32, y as u32) != label || component[y * w + x] != 0 {
                continue;
            }
            next_component += 1;
            let id = next_component;
            let mut size = 0usize;
            queue.clear();
            queue.push((x, y));
            component[y * w + x] = id;
            while let Some((cx, cy)) = queue.pop() {
                size += 1;
                let neighbors = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < w
                        && ny < h
                        && mask.get(nx as u32, ny as u32) == label
                        && component[ny * w + nx] == 0
                    {
                        component[ny * w + nx] = id;
                        queue.push((nx, ny));
                    }
                }
            }
            component_sizes.push(size);
        }
    }

    let mut rings = Vec::new();
    for id in 1..=next_component {
        if component_sizes[(id - 1) as usize] < min_area {
            continue;
        }
        let in_comp = |x: i64, y: i64| -> bool {
            inside(x, y) && component[y as usize * w + x as usize] == id
        };
        rings.extend(trace_component(&in_comp, w, h));
    }
    Ok(rings)
}

/// Directed boundary edges of one component, assembled into closed rings.
///
/// Every side of an inside pixel whose 4-neighbor is outside contributes
/// one unit-length directed edge with the interior on the left. Edges are
/// chained into loops; at a saddle vertex (two diagonal inside pixels)
/// the walk pivots around the interior pixel corner, which keeps the
/// outer ring and a touching hole ring separate and each ring simple.
fn trace_component<F: Fn(i64, i64) -> bool>(in_comp: &F, w: usize, h: usize) -> Vec<Ring> {
    type Point = (i64, i64);
    // (start, end) directed edges, in raster scan order.
    let mut edges: Vec<(Point, Point)> = Vec::new();
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            if !in_comp(x, y) {
                continue;
            }
            if !in_comp(x, y - 1) {
                edges.push(((x + 1, y), (x, y))); // top, traveling -x
            }
            if !in_comp(x, y + 1) {
                edges.push(((x, y + 1), (x + 1, y + 1))); // bottom, traveling +x
            }
            if !in_comp(x - 1, y) {
                edges.push(((x, y), (x, y + 1))); // left, traveling +y
            }
            if !in_comp(x + 1, y) {
                edges.push(((x + 1, y + 1), (x + 1, y))); // right, traveling -y
            }
        }
    }

    use std::collections::HashMap;
    let mut outgoing: HashMap<Point, Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(*start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut loop_points: Vec<Point> = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            let (start, end) = edges[current];
            loop_points.push(start);
            if end == edges[first].0 {
                break;
            }
            let dir = (end.0 - start.0, end.1 - start.1);
            // Tightest pivot around the interior first: right turn, then
            // straight, then left.
            let preferences = [(-dir.1, dir.0), dir, (dir.1, -dir.0)];
            let candidates = outgoing.get(&end).expect("boundary edges form closed loops");
            let mut next = None;
            'pref: for want in preferences {
                for &i in candidates {
                    if used[i] {
                        continue;
                    }
                    let (s, e) = edges[i];
                    if (e.0 - s.0, e.1 - s.1) == want {
                        next = Some(i);
                        break 'pref;
                    }
                }
            }
            current = next.expect("boundary edges form closed loops");
        }
        rings.push(simplify_rectilinear(loop_points));
    }
    rings
}

/// Drops collinear vertices from a closed rectilinear loop.
fn simplify_rectilinear(points: Vec<(i64, i64)>) -> Ring {
    let n = points.len();
    let mut kept = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let din = (cur.0 - prev.0, cur.1 - prev.1);
        let dout = (next.0 - cur.0, next.1 - cur.1);
        // Unit axis-aligned steps: same direction means collinear.
        if din != dout {
            kept.push((cur.0 as f64, cur.1 as f64));
        }
    }
    Ring::new(kept)
}

/// Rasterizes polygon rings into a `width * height` binary grid
/// (row-major, 1 inside) under even-odd fill.
///
/// # Errors
/// [`CocomaskError::Geometry`] for rings with fewer than 3 points,
/// non-finite coordinates, or a scanline with an odd crossing count
/// (an unclosed or otherwise degenerate ring).
pub fn rasterize(rings: &[Ring], width: u32, height: u32) -> Result<Vec<u8>, CocomaskError> {
    for ring in rings {
        if ring.len() < 3 {
            return Err(CocomaskError::Geometry(format!(
                "ring has {} point(s), need at least 3",
                ring.len()
            )));
        }
        if ring.points.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(CocomaskError::Geometry(
                "ring contains non-finite coordinates".to_string(),
            ));
        }
    }

    let w = width as usize;
    let h = height as usize;
    let mut grid = vec![0u8; w * h];
    let mut crossings: Vec<f64> = Vec::new();

    for y in 0..h {
        let yc = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            let n = ring.points.len();
            for i in 0..n {
                let (x0, y0) = ring.points[i];
                let (x1, y1) = ring.points[(i + 1) % n];
                // Half-open straddle test so vertices are counted once.
                if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                    let t = (yc - y0) / (y1 - y0);
                    crossings.push(x0 + t * (x1 - x0));
                }
            }
        }
        if crossings.len() % 2 != 0 {
            return Err(CocomaskError::Geometry(format!(
                "odd crossing count on scanline {y}"
            )));
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).expect("finite crossings"));
        for pair in crossings.chunks_exact(2) {
            let (enter, exit) = (pair[0], pair[1]);
            // Pixel center x + 0.5 lies in [enter, exit).
            let start = ((enter - 0.5).ceil().max(0.0)) as usize;
            let end = ((exit - 0.5).ceil().clamp(0.0, w as f64)) as usize;
            for x in start..end {
                grid[y * w + x] = 1;
            }
        }
    }
    Ok(grid)
}

/// Net polygon area of a set of rings under even-odd semantics:
/// the shoelace sums of holes cancel against their outer rings.
pub fn polygon_area(rings: &[Ring]) -> f64 {
    let sum: f64 = rings.iter().map(Ring::shoelace2).sum();
    sum.abs() / 2.0
}

/// Tight axis-aligned bounding box over all ring vertices, as COCO
/// `[x, y, w, h]`. Empty input yields all zeros.
pub fn bbox(rings: &[Ring]) -> [f64; 4] {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for ring in rings {
        for &(x, y) in &ring.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x {
        return [0.0, 0.0, 0.0, 0.0];
    }
    [min_x, min_y, max_x - min_x, max_y - min_y]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_of(mask: &Mask, label: u32) -> Vec<u8> {
        mask.data()
            .iter()
            .map(|&v| if v == label { 1 } else { 0 })
            .collect()
    }

    #[test]
    fn test_extract_missing_label_fails() {
        let mask = Mask::from_vec(2, 2, vec![1, 1, 0, 0]);
        let err = extract(&mask, 7).unwrap_err();
        assert!(matches!(err, CocomaskError::EmptyInstance { label: 7 }));
    }

    #[test]
    fn test_single_pixel_roundtrip() {
        let mask = Mask::from_vec(3, 3, vec![0, 0, 0, 0, 1, 0, 0, 0, 0]);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
        let grid = rasterize(&rings, 3, 3).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(polygon_area(&rings), 1.0);
    }

    #[test]
    fn test_rectangle_simplifies_to_four_corners() {
        // 4x2 block of label 1 inside a 6x4 mask.
        let mut data = vec![0u32; 24];
        for y in 1..3 {
            for x in 1..5 {
                data[y * 6 + x] = 1;
            }
        }
        let mask = Mask::from_vec(6, 4, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4, "collinear crack vertices must be removed");
        assert_eq!(bbox(&rings), [1.0, 1.0, 4.0, 2.0]);
        assert_eq!(polygon_area(&rings), 8.0);
        let grid = rasterize(&rings, 6, 4).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
    }

    #[test]
    fn test_l_shape_roundtrip() {
        // L-shaped component exercises concave corners.
        let data = vec![
            1, 0, 0, //
            1, 0, 0, //
            1, 1, 1, //
        ];
        let mask = Mask::from_vec(3, 3, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 1);
        let grid = rasterize(&rings, 3, 3).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(polygon_area(&rings), 5.0);
    }

    #[test]
    fn test_annulus_hole_preserved() {
        // 5x5 ring of label 1 with a background hole in the middle.
        let mut data = vec![0u32; 49];
        for y in 1..6 {
            for x in 1..6 {
                data[y * 7 + x] = 1;
            }
        }
        data[3 * 7 + 3] = 0; // the hole
        let mask = Mask::from_vec(7, 7, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 2, "outer ring plus hole ring");
        let grid = rasterize(&rings, 7, 7).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(grid[3 * 7 + 3], 0, "hole stays background");
        assert_eq!(polygon_area(&rings), 24.0);
    }

    #[test]
    fn test_two_blobs_one_label() {
        let data = vec![
            1, 1, 0, 0, 0, //
            1, 1, 0, 0, 0, //
            0, 0, 0, 1, 1, //
            0, 0, 0, 1, 1, //
        ];
        let mask = Mask::from_vec(5, 4, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 2);
        let grid = rasterize(&rings, 5, 4).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(polygon_area(&rings), 8.0);
        assert_eq!(bbox(&rings), [0.0, 0.0, 5.0, 4.0]);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_components() {
        // 4-connectivity: diagonal neighbors do not join.
        let data = vec![
            1, 0, //
            0, 1, //
        ];
        let mask = Mask::from_vec(2, 2, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 2);
        let grid = rasterize(&rings, 2, 2).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
    }

    #[test]
    fn test_zigzag_component_roundtrip() {
        let data = vec![
            1, 1, 0, //
            0, 1, 0, //
            0, 1, 1, //
        ];
        let mask = Mask::from_vec(3, 3, data);
        let rings = extract(&mask, 1).unwrap();
        let grid = rasterize(&rings, 3, 3).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(polygon_area(&rings), 5.0);
    }

    #[test]
    fn test_saddle_vertex_keeps_rings_separate() {
        // The hole touches the outside diagonally at the saddle corner
        // (2, 1); the walk must not fuse the two rings there.
        let data = vec![
            1, 1, 0, //
            1, 0, 1, //
            1, 1, 1, //
        ];
        let mask = Mask::from_vec(3, 3, data);
        let rings = extract(&mask, 1).unwrap();
        assert_eq!(rings.len(), 2, "outer ring plus hole ring");
        let grid = rasterize(&rings, 3, 3).unwrap();
        assert_eq!(grid, binary_of(&mask, 1));
        assert_eq!(polygon_area(&rings), 7.0);
    }

    #[test]
    fn test_extract_filtered_drops_small_components() {
        let data = vec![
            1, 1, 0, 1, //
            1, 1, 0, 0, //
        ];
        let mask = Mask::from_vec(4, 2, data);
        let rings = extract_filtered(&mask, 1, 2).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(polygon_area(&rings), 4.0);
    }

    #[test]
    fn test_rasterize_rejects_short_ring() {
        let ring = Ring::new(vec![(0.0, 0.0), (1.0, 1.0)]);
        let err = rasterize(&[ring], 4, 4).unwrap_err();
        assert!(matches!(err, CocomaskError::Geometry(_)));
    }

    #[test]
    fn test_rasterize_rejects_non_finite() {
        let ring = Ring::new(vec![(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0)]);
        let err = rasterize(&[ring], 4, 4).unwrap_err();
        assert!(matches!(err, CocomaskError::Geometry(_)));
    }

    #[test]
    fn test_flat_ring_roundtrip() {
        let ring = Ring::from_flat(&[0.0, 0.0, 4.0, 0.0, 4.0, 2.0, 0.0, 2.0]).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.to_flat(), vec![0.0, 0.0, 4.0, 0.0, 4.0, 2.0, 0.0, 2.0]);
        assert!(Ring::from_flat(&[0.0, 0.0, 1.0]).is_err());
        assert!(Ring::from_flat(&[0.0, 0.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_rasterize_fractional_polygon_boundary_rule() {
        // Square [1.25, 3.75)^2: centers 1.5, 2.5, 3.5 are inside per the
        // half-open rule.
        let ring = Ring::from_flat(&[1.25, 1.25, 3.75, 1.25, 3.75, 3.75, 1.25, 3.75]).unwrap();
        let grid = rasterize(&[ring], 5, 5).unwrap();
        let filled: usize = grid.iter().map(|&v| v as usize).sum();
        assert_eq!(filled, 9);
        assert_eq!(grid[2 * 5 + 2], 1);
        assert_eq!(grid[0], 0);
    }
}
