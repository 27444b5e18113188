//! Integer grid to polygon conversion.
//!
//! Boundaries are traced along cell edges on the vertex lattice, so
//! output vertices are always grid corners. Cells of equal value that
//! share an edge end up in the same polygon; cells that only touch at
//! a corner do not. Each distinct value yields one (multi) polygon.

use grid::{
    geo::{Coord, LineString, MultiPolygon, Polygon},
    Grid, GridSpec, C,
};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// All cells of one value, dissolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub value: i32,
    pub shape: MultiPolygon<C>,
}

/// Lattice vertex `(i, j)`: column and row of a cell corner, rows
/// growing southward.
type Vertex = (i64, i64);

/// Polygonizes `grid`, one region per distinct valid value, sorted by
/// value. Nodata cells are not covered by any region.
pub fn polygonize(grid: &Grid<i32>) -> Vec<Region> {
    let spec = grid.spec();
    let mut edges: BTreeMap<i32, Vec<(Vertex, Vertex)>> = BTreeMap::new();
    for (idx, value) in grid.iter() {
        let Some(value) = value else { continue };
        let (col, row) = spec.col_row(idx);
        let differs = |dc: isize, dr: isize| {
            let neighbor = col
                .checked_add_signed(dc)
                .zip(row.checked_add_signed(dr))
                .and_then(|(c, r)| grid.get(c, r));
            neighbor != Some(value)
        };
        #[allow(clippy::cast_possible_wrap)]
        let (i, j) = (col as i64, row as i64);
        let cell_edges = edges.entry(value).or_default();
        // Counter-clockwise on the ground, so the cell is on the left.
        if differs(0, 1) {
            cell_edges.push(((i, j + 1), (i + 1, j + 1)));
        }
        if differs(1, 0) {
            cell_edges.push(((i + 1, j + 1), (i + 1, j)));
        }
        if differs(0, -1) {
            cell_edges.push(((i + 1, j), (i, j)));
        }
        if differs(-1, 0) {
            cell_edges.push(((i, j), (i, j + 1)));
        }
    }

    let regions: Vec<Region> = edges
        .into_iter()
        .map(|(value, edges)| Region {
            value,
            shape: assemble(spec, &edges),
        })
        .collect();
    debug!("polygonized {} values", regions.len());
    regions
}

/// Chains boundary edges into rings and sorts them into polygons.
fn assemble(spec: &GridSpec, edges: &[(Vertex, Vertex)]) -> MultiPolygon<C> {
    let mut exteriors = Vec::new();
    let mut holes = Vec::new();
    for ring in trace(edges).into_iter().flat_map(split_pinches) {
        let ring = merge_collinear(ring);
        if ring.len() < 4 {
            continue;
        }
        match signed_area2(&ring) {
            a if a > 0 => exteriors.push((a, ring)),
            a if a < 0 => holes.push(ring),
            _ => {}
        }
    }

    let mut polygons: Vec<(Vec<Vertex>, Vec<Vec<Vertex>>)> = exteriors
        .iter()
        .map(|(_, ring)| (ring.clone(), Vec::new()))
        .collect();
    for hole in holes {
        let probe = left_cell_center2(hole[0], hole[1]);
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (_, ring))| contains2(ring, probe))
            .min_by_key(|(_, (area, _))| *area)
            .map(|(n, _)| n);
        if let Some(n) = owner {
            polygons[n].1.push(hole);
        }
    }

    MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| {
                Polygon::new(
                    to_world(spec, &exterior),
                    holes.iter().map(|h| to_world(spec, h)).collect(),
                )
            })
            .collect(),
    )
}

/// Follows edges end to start. Where two rings meet at a vertex the
/// left-most turn is taken.
fn trace(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (n, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(n);
    }
    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].0];
        let mut current = start;
        loop {
            let (from, to) = edges[current];
            let next = outgoing
                .get(&to)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&n| n == start || !used[n])
                .max_by_key(|&n| turn(from, to, edges[n].1));
            match next {
                Some(n) if n == start => break,
                Some(n) => {
                    used[n] = true;
                    ring.push(to);
                    current = n;
                }
                None => break,
            }
        }
        rings.push(ring);
    }
    rings
}

/// Positive for a left turn at `b`, in ground orientation.
fn turn(a: Vertex, b: Vertex, c: Vertex) -> i64 {
    let (dx1, dy1) = (b.0 - a.0, a.1 - b.1);
    let (dx2, dy2) = (c.0 - b.0, b.1 - c.1);
    dx1 * dy2 - dy1 * dx2
}

/// Splits a ring that revisits a vertex into simple rings.
fn split_pinches(ring: Vec<Vertex>) -> Vec<Vec<Vertex>> {
    let mut out = Vec::new();
    let mut stack: Vec<Vertex> = Vec::with_capacity(ring.len());
    let mut seen: HashMap<Vertex, usize> = HashMap::new();
    for v in ring {
        if let Some(&k) = seen.get(&v) {
            let sub: Vec<Vertex> = stack.drain(k..).collect();
            for u in &sub {
                seen.remove(u);
            }
            out.push(sub);
        }
        seen.insert(v, stack.len());
        stack.push(v);
    }
    out.push(stack);
    out
}

/// Drops vertices in the middle of straight runs.
fn merge_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&k| turn(ring[(k + n - 1) % n], ring[k], ring[(k + 1) % n]) != 0)
        .map(|k| ring[k])
        .collect()
}

/// Twice the signed area on the ground; positive when
/// counter-clockwise.
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|k| {
            let (x1, y1) = (ring[k].0, -ring[k].1);
            let (x2, y2) = (ring[(k + 1) % n].0, -ring[(k + 1) % n].1);
            x1 * y2 - x2 * y1
        })
        .sum()
}

/// Center of the cell to the left of the edge leaving `a` toward
/// `b`, in doubled lattice coordinates.
fn left_cell_center2(a: Vertex, b: Vertex) -> Vertex {
    let (di, dj) = ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    (2 * a.0 + di + dj, 2 * a.1 + dj - di)
}

/// Even-odd test of a doubled lattice point (never on an edge)
/// against a ring of axis-aligned edges.
fn contains2(ring: &[Vertex], (px, py): Vertex) -> bool {
    let n = ring.len();
    let mut inside = false;
    for k in 0..n {
        let (a, b) = (ring[k], ring[(k + 1) % n]);
        if a.0 != b.0 {
            continue;
        }
        let (lo, hi) = (2 * a.1.min(b.1), 2 * a.1.max(b.1));
        if 2 * a.0 > px && lo < py && py < hi {
            inside = !inside;
        }
    }
    inside
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn to_world(spec: &GridSpec, ring: &[Vertex]) -> LineString<C> {
    ring.iter()
        .map(|&(i, j)| spec.vertex(i as usize, j as usize))
        .collect::<Vec<Coord<C>>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::{polygonize, Region};
    use approx::assert_relative_eq;
    use grid::{
        geo::{Area, Coord},
        Grid, GridSpec, SpatialRef, NODATA_I32,
    };

    const N: i32 = NODATA_I32;

    fn grid(cols: usize, cells: Vec<i32>) -> Grid<i32> {
        let rows = cells.len() / cols;
        let spec = GridSpec::new(
            cols,
            rows,
            1.0,
            Coord {
                x: 0.0,
                y: rows as f64,
            },
            SpatialRef::projected("utm", "Meter"),
        );
        Grid::from_vec(spec, NODATA_I32, cells).unwrap()
    }

    fn region(regions: &[Region], value: i32) -> &Region {
        regions.iter().find(|r| r.value == value).unwrap()
    }

    #[test]
    fn test_block() {
        let regions = polygonize(&grid(3, vec![N, N, N, 4, 4, N, 4, 4, N]));
        assert_eq!(regions.len(), 1);
        let shape = &regions[0].shape;
        assert_eq!(shape.0.len(), 1);
        // Four corners plus the closing vertex.
        assert_eq!(shape.0[0].exterior().0.len(), 5);
        assert_relative_eq!(shape.unsigned_area(), 4.0);
        assert!(shape.0[0].exterior().0.contains(&Coord { x: 2.0, y: 0.0 }));
    }

    #[test]
    fn test_hole() {
        #[rustfmt::skip]
        let regions = polygonize(&grid(3, vec![
            1, 1, 1,
            1, 2, 1,
            1, 1, 1,
        ]));
        assert_eq!(
            regions.iter().map(|r| r.value).collect::<Vec<_>>(),
            vec![1, 2]
        );
        let outer = &region(&regions, 1).shape;
        assert_eq!(outer.0.len(), 1);
        assert_eq!(outer.0[0].interiors().len(), 1);
        assert_relative_eq!(outer.unsigned_area(), 8.0);
        assert_relative_eq!(region(&regions, 2).shape.unsigned_area(), 1.0);
    }

    #[test]
    fn test_diagonal_cells_are_separate() {
        #[rustfmt::skip]
        let regions = polygonize(&grid(2, vec![
            1, 2,
            2, 1,
        ]));
        for value in [1, 2] {
            let shape = &region(&regions, value).shape;
            assert_eq!(shape.0.len(), 2);
            for polygon in shape {
                assert_eq!(polygon.exterior().0.len(), 5);
                assert!(polygon.interiors().is_empty());
            }
            assert_relative_eq!(shape.unsigned_area(), 2.0);
        }
    }

    #[test]
    fn test_hole_touching_outside() {
        #[rustfmt::skip]
        let regions = polygonize(&grid(3, vec![
            1, 1, 1,
            1, N, 1,
            1, 1, N,
        ]));
        let shape = &region(&regions, 1).shape;
        assert_relative_eq!(shape.unsigned_area(), 7.0);
        assert_eq!(shape.0.len(), 1);
        assert_eq!(shape.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_island_in_hole() {
        #[rustfmt::skip]
        let regions = polygonize(&grid(5, vec![
            1, 1, 1, 1, 1,
            1, 2, 2, 2, 1,
            1, 2, 1, 2, 1,
            1, 2, 2, 2, 1,
            1, 1, 1, 1, 1,
        ]));
        let ones = &region(&regions, 1).shape;
        assert_eq!(ones.0.len(), 2);
        assert_relative_eq!(ones.unsigned_area(), 17.0);
        let with_hole: Vec<_> = ones.iter().filter(|p| !p.interiors().is_empty()).collect();
        assert_eq!(with_hole.len(), 1);
        assert_relative_eq!(with_hole[0].unsigned_area(), 16.0);
        let twos = &region(&regions, 2).shape;
        assert_eq!(twos.0.len(), 1);
        assert_eq!(twos.0[0].interiors().len(), 1);
        assert_relative_eq!(twos.unsigned_area(), 8.0);
    }

    #[test]
    fn test_empty() {
        assert!(polygonize(&grid(2, vec![N, N])).is_empty());
    }
}
