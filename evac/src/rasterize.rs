//! Polygon to grid conversion.
//!
//! A cell is selected when its center lies inside or on the boundary
//! of a polygon.

use grid::{
    geo::{BoundingRect, Intersects, MultiPolygon, Point, Polygon},
    Grid, GridSpec, Sample, C, NODATA_U8,
};
use log::warn;

/// Returns `true` when `shape` has polygons but none reach the grid
/// extent. This usually means the polygons are in a different
/// spatial reference.
pub fn misses_extent(spec: &GridSpec, shape: &MultiPolygon<C>) -> bool {
    shape
        .bounding_rect()
        .is_some_and(|bbox| !bbox.intersects(&spec.extent()))
}

fn warn_outside(spec: &GridSpec, count: usize) {
    let extent = spec.extent();
    warn!(
        "{count} polygons lie outside the grid extent ({:.1}, {:.1})..({:.1}, {:.1}), check their spatial reference",
        extent.min().x,
        extent.min().y,
        extent.max().x,
        extent.max().y
    );
}

/// Returns a mask with `1` for every cell covered by `shape` and
/// nodata elsewhere.
pub fn rasterize_mask(spec: &GridSpec, shape: &MultiPolygon<C>) -> Grid<u8> {
    if misses_extent(spec, shape) {
        warn_outside(spec, shape.0.len());
    }
    let mut mask = Grid::new(spec.clone(), NODATA_U8);
    for polygon in shape {
        burn(spec, polygon, |idx| mask.set_index(idx, 1));
    }
    mask
}

/// Burns each feature's value into a new grid. Later features
/// overwrite earlier ones where they overlap.
pub fn rasterize_values<V: Sample>(
    spec: &GridSpec,
    features: &[(MultiPolygon<C>, V)],
    nodata: V,
) -> Grid<V> {
    let shapes = features
        .iter()
        .map(|(shape, _)| shape)
        .filter(|shape| !shape.0.is_empty())
        .collect::<Vec<_>>();
    if !shapes.is_empty() && shapes.iter().all(|shape| misses_extent(spec, shape)) {
        warn_outside(spec, shapes.iter().map(|shape| shape.0.len()).sum());
    }
    let mut out = Grid::new(spec.clone(), nodata);
    for (shape, value) in features {
        for polygon in shape {
            burn(spec, polygon, |idx| out.set_index(idx, *value));
        }
    }
    out
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn burn<F: FnMut(usize)>(spec: &GridSpec, polygon: &Polygon<C>, mut f: F) {
    let Some(bbox) = polygon.bounding_rect() else {
        return;
    };
    if spec.cols == 0 || spec.rows == 0 {
        return;
    }
    let to_col = |x: C| ((x - spec.origin.x) / spec.cell_size).floor();
    let to_row = |y: C| ((spec.origin.y - y) / spec.cell_size).floor();
    let clamp = |v: C, n: usize| v.clamp(0.0, (n - 1) as C) as usize;

    let (c0, c1) = (to_col(bbox.min().x), to_col(bbox.max().x));
    let (r0, r1) = (to_row(bbox.max().y), to_row(bbox.min().y));
    if c1 < 0.0 || r1 < 0.0 || c0 >= spec.cols as C || r0 >= spec.rows as C {
        return;
    }
    for row in clamp(r0, spec.rows)..=clamp(r1, spec.rows) {
        for col in clamp(c0, spec.cols)..=clamp(c1, spec.cols) {
            if polygon.intersects(&Point::from(spec.cell_center(col, row))) {
                f(spec.index(col, row));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{misses_extent, rasterize_mask, rasterize_values};
    use grid::{
        geo::{polygon, Coord, MultiPolygon},
        GridSpec, SpatialRef, NODATA_I32,
    };

    fn spec() -> GridSpec {
        GridSpec::new(
            4,
            4,
            10.0,
            Coord { x: 0.0, y: 40.0 },
            SpatialRef::projected("test", "Meter"),
        )
    }

    #[test]
    fn test_mask_selects_cell_centers() {
        // Covers centers (5, 35) and (15, 35) only.
        let shape = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 30.0),
            (x: 18.0, y: 30.0),
            (x: 18.0, y: 40.0),
            (x: 0.0, y: 40.0),
        ]]);
        let mask = rasterize_mask(&spec(), &shape);
        assert_eq!(mask.valid_count(), 2);
        assert_eq!(mask.get(0, 0), Some(1));
        assert_eq!(mask.get(1, 0), Some(1));
        assert_eq!(mask.get(2, 0), None);
    }

    #[test]
    fn test_boundary_center_is_included() {
        let shape = MultiPolygon::new(vec![polygon![
            (x: 5.0, y: 0.0),
            (x: 40.0, y: 0.0),
            (x: 40.0, y: 5.0),
            (x: 5.0, y: 5.0),
        ]]);
        let mask = rasterize_mask(&spec(), &shape);
        assert_eq!(mask.valid_count(), 4);
        assert_eq!(mask.get(0, 3), Some(1));
    }

    #[test]
    fn test_later_features_win() {
        let everything = MultiPolygon::new(vec![polygon![
            (x: -100.0, y: -100.0),
            (x: 100.0, y: -100.0),
            (x: 100.0, y: 100.0),
            (x: -100.0, y: 100.0),
        ]]);
        let corner = MultiPolygon::new(vec![polygon![
            (x: 30.0, y: 0.0),
            (x: 40.0, y: 0.0),
            (x: 40.0, y: 10.0),
            (x: 30.0, y: 10.0),
        ]]);
        let out = rasterize_values(&spec(), &[(everything, 1), (corner, 2)], NODATA_I32);
        assert_eq!(out.valid_count(), 16);
        assert_eq!(out.get(3, 3), Some(2));
        assert_eq!(out.get(2, 3), Some(1));
    }

    #[test]
    fn test_lon_lat_polygons_miss_projected_grid() {
        let lon_lat = MultiPolygon::new(vec![polygon![
            (x: -124.2, y: 41.7),
            (x: -124.1, y: 41.7),
            (x: -124.1, y: 41.8),
            (x: -124.2, y: 41.8),
        ]]);
        let utm = GridSpec::new(
            4,
            4,
            10.0,
            Coord { x: 400_000.0, y: 4_620_040.0 },
            SpatialRef::projected("utm", "Meter"),
        );
        assert!(misses_extent(&utm, &lon_lat));
        assert_eq!(rasterize_mask(&utm, &lon_lat).valid_count(), 0);

        let inside = MultiPolygon::new(vec![polygon![
            (x: 5.0, y: 5.0),
            (x: 15.0, y: 5.0),
            (x: 15.0, y: 15.0),
        ]]);
        assert!(!misses_extent(&spec(), &inside));
        assert!(!misses_extent(&spec(), &MultiPolygon::new(vec![])));
    }
}
