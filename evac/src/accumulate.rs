//! Anisotropic accumulated cost search.
//!
//! From every source cell outward over the 8-connected lattice, the
//! cost of stepping from cell `u` to neighbor `v` is
//!
//! ```text
//! length(u, v) × cost[v] × VF(vertical angle) × HF(heading)
//! ```
//!
//! where `length` is the planar distance between cell centers, or the
//! surface distance when enabled. Steps whose factor is impassable are
//! never taken, and cells with nodata cost, nodata elevation, or
//! outside the study area are never entered.

use crate::{
    factors::{HorizontalFactor, TravelDirection, VerticalFactor},
    EvacError, ProcessingContext,
};
use grid::{Direction, Grid, NODATA_F64, NODATA_U8};
use log::{debug, info};
use std::{cmp::Ordering, collections::BinaryHeap};

/// Backlink code of a source cell.
pub const SOURCE: u8 = 0;

/// Accumulated cost and back direction grids from one search.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation {
    /// Least accumulated cost to the nearest source. Nodata where no
    /// source is reachable.
    pub cost: Grid<f64>,

    /// [`SOURCE`] at sources, otherwise the [`Direction`] code of the
    /// neighbor one step closer to the source. Nodata where
    /// unreached.
    pub backlink: Grid<u8>,
}

impl Accumulation {
    pub fn builder<'a>() -> AccumulationBuilder<'a> {
        AccumulationBuilder {
            source: None,
            cost: None,
            elevation: None,
            vertical: VerticalFactor::default(),
            horizontal: HorizontalFactor::default(),
            direction: TravelDirection::default(),
            surface_distance: false,
        }
    }

    /// Follows backlinks from (`col`, `row`) to a source cell.
    ///
    /// Returns the visited cells, both ends included, or `None` if the
    /// cell was not reached.
    pub fn trace(&self, col: usize, row: usize) -> Option<Vec<(usize, usize)>> {
        let spec = self.backlink.spec();
        let mut path = vec![(col, row)];
        let (mut col, mut row) = (col, row);
        for _ in 0..spec.len() {
            let code = self.backlink.get(col, row)?;
            if code == SOURCE {
                return Some(path);
            }
            let (dc, dr) = Direction::from_code(code)?.offset();
            col = col.checked_add_signed(dc)?;
            row = row.checked_add_signed(dr)?;
            path.push((col, row));
        }
        None
    }
}

pub struct AccumulationBuilder<'a> {
    /// Safe zone cells.
    source: Option<&'a Grid<u8>>,

    /// Cost per linear unit of travel through each cell.
    cost: Option<&'a Grid<f64>>,

    /// Same linear units as the grid.
    elevation: Option<&'a Grid<f64>>,

    vertical: VerticalFactor,

    horizontal: HorizontalFactor,

    direction: TravelDirection,

    /// Measure steps along the terrain surface.
    surface_distance: bool,
}

impl<'a> AccumulationBuilder<'a> {
    pub fn source(mut self, mask: &'a Grid<u8>) -> Self {
        self.source = Some(mask);
        self
    }

    pub fn cost(mut self, cost: &'a Grid<f64>) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn elevation(mut self, elevation: &'a Grid<f64>) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn vertical(mut self, factor: VerticalFactor) -> Self {
        self.vertical = factor;
        self
    }

    pub fn horizontal(mut self, factor: HorizontalFactor) -> Self {
        self.horizontal = factor;
        self
    }

    pub fn direction(mut self, direction: TravelDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn surface_distance(mut self, enable: bool) -> Self {
        self.surface_distance = enable;
        self
    }

    pub fn build(&self, ctx: &ProcessingContext) -> Result<Accumulation, EvacError> {
        let source = self.source.ok_or(EvacError::Builder("source"))?;
        let cost = self.cost.ok_or(EvacError::Builder("cost"))?;
        let elevation = self.elevation.ok_or(EvacError::Builder("elevation"))?;
        self.vertical.validate()?;
        self.horizontal.validate()?;
        ctx.check(source)?;
        ctx.check(cost)?;
        ctx.check(elevation)?;

        let search = Search {
            ctx,
            cost,
            elevation,
            builder: self,
        };
        let now = std::time::Instant::now();
        let (dist, back) = search.run(source);
        let spec = ctx.spec().clone();
        let cost = Grid::from_vec(
            spec.clone(),
            NODATA_F64,
            dist.into_iter()
                .map(|d| if d.is_finite() { d } else { NODATA_F64 })
                .collect(),
        )?;
        let backlink = Grid::from_vec(spec, NODATA_U8, back)?;
        info!(
            "accumulated cost: {} of {} study area cells reached in {:?}",
            cost.valid_count(),
            ctx.study_area().valid_count(),
            now.elapsed()
        );
        Ok(Accumulation { cost, backlink })
    }
}

struct Search<'a> {
    ctx: &'a ProcessingContext,
    cost: &'a Grid<f64>,
    elevation: &'a Grid<f64>,
    builder: &'a AccumulationBuilder<'a>,
}

impl<'a> Search<'a> {
    /// Cost of stepping from `from` to its neighbor `to` in direction
    /// `dir`, or `None` if the step is impassable.
    fn step(&self, from: usize, dir: Direction, to: usize) -> Option<f64> {
        if !self.ctx.contains(to) {
            return None;
        }
        let cost = self.cost.get_index(to)?;
        let z_from = self.elevation.get_index(from)?;
        let z_to = self.elevation.get_index(to)?;
        let run = dir.step() * self.ctx.spec().cell_size;
        let (rise, heading) = match self.builder.direction {
            TravelDirection::FromSource => (z_to - z_from, dir.azimuth()),
            TravelDirection::ToSource => (z_from - z_to, dir.opposite().azimuth()),
        };
        let vf = self.builder.vertical.factor(rise.atan2(run).to_degrees())?;
        let hf = self.builder.horizontal.factor(heading)?;
        let length = if self.builder.surface_distance {
            run.hypot(rise)
        } else {
            run
        };
        Some(length * cost * vf * hf)
    }

    /// Dijkstra over the grid. A cell's backlink is only ever set
    /// toward a cell that was settled before it, so backlinks form a
    /// forest rooted at the sources.
    fn run(&self, source: &Grid<u8>) -> (Vec<f64>, Vec<u8>) {
        let spec = self.ctx.spec();
        let mut dist = vec![f64::INFINITY; spec.len()];
        let mut back = vec![NODATA_U8; spec.len()];
        let mut settled = vec![false; spec.len()];
        let mut frontier = BinaryHeap::new();

        for (idx, value) in source.iter() {
            if value.is_some() && self.ctx.contains(idx) {
                dist[idx] = 0.0;
                back[idx] = SOURCE;
                frontier.push(Frontier {
                    cost: 0.0,
                    index: idx,
                });
            }
        }
        debug!("{} source cells", frontier.len());

        while let Some(Frontier { cost, index }) = frontier.pop() {
            if settled[index] {
                continue;
            }
            settled[index] = true;
            for (dir, neighbor) in spec.neighbors(index) {
                if settled[neighbor] {
                    continue;
                }
                let Some(step) = self.step(index, dir, neighbor) else {
                    continue;
                };
                let candidate = cost + step;
                if candidate < dist[neighbor] {
                    dist[neighbor] = candidate;
                    back[neighbor] = dir.opposite().code();
                    frontier.push(Frontier {
                        cost: candidate,
                        index: neighbor,
                    });
                }
            }
        }
        (dist, back)
    }
}

/// Min-heap entry.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    index: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::{Accumulation, Search, SOURCE};
    use crate::{
        factors::{HorizontalFactor, TravelDirection, VerticalFactor},
        ConfigError, EvacError, ProcessingContext,
    };
    use approx::assert_relative_eq;
    use grid::{geo::Coord, Direction, Grid, GridSpec, SpatialRef, NODATA_F64, NODATA_U8};
    use std::f64::consts::SQRT_2;

    fn spec(cols: usize, rows: usize) -> GridSpec {
        GridSpec::new(
            cols,
            rows,
            10.0,
            Coord { x: 0.0, y: 10.0 * rows as f64 },
            SpatialRef::projected("utm", "Meter"),
        )
    }

    fn source_at(spec: &GridSpec, cells: &[(usize, usize)]) -> Grid<u8> {
        let mut source = Grid::new(spec.clone(), NODATA_U8);
        for &(col, row) in cells {
            source.set(col, row, 1);
        }
        source
    }

    /// Deterministic bumpy terrain.
    fn hills(spec: &GridSpec) -> Grid<f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let cells = (0..spec.len())
            .map(|idx| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let (col, row) = spec.col_row(idx);
                (col as f64 * 0.7).sin() * 8.0 + (row as f64 * 0.4).cos() * 5.0
                    + (state % 100) as f64 / 50.0
            })
            .collect();
        Grid::from_vec(spec.clone(), NODATA_F64, cells).unwrap()
    }

    #[test]
    fn test_flat_isotropic_distances() {
        let spec = spec(3, 3);
        let dem = Grid::filled(spec.clone(), 5.0, NODATA_F64);
        let cost = Grid::filled(spec.clone(), 1.0, NODATA_F64);
        let source = source_at(&spec, &[(0, 0)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let acc = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .vertical(VerticalFactor::None)
            .build(&ctx)
            .unwrap();
        assert_eq!(acc.cost.get(0, 0), Some(0.0));
        assert_relative_eq!(acc.cost.get(1, 0).unwrap(), 10.0);
        assert_relative_eq!(acc.cost.get(1, 1).unwrap(), 10.0 * SQRT_2);
        assert_relative_eq!(acc.cost.get(2, 1).unwrap(), 10.0 + 10.0 * SQRT_2);
        assert_eq!(acc.backlink.get(0, 0), Some(SOURCE));
        assert_eq!(acc.backlink.get(1, 1), Some(Direction::NW.code()));
        assert_eq!(acc.backlink.get(2, 0), Some(Direction::W.code()));
        assert_eq!(
            acc.trace(2, 2),
            Some(vec![(2, 2), (1, 1), (0, 0)])
        );
    }

    #[test]
    fn test_flat_tobler_matches_isotropic() {
        let spec = spec(4, 4);
        let dem = Grid::filled(spec.clone(), 5.0, NODATA_F64);
        let cost = Grid::filled(spec.clone(), 2.0, NODATA_F64);
        let source = source_at(&spec, &[(3, 3)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let acc = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .build(&ctx)
            .unwrap();
        assert_relative_eq!(acc.cost.get(0, 0).unwrap(), 3.0 * 20.0 * SQRT_2);
    }

    #[test]
    fn test_monotone_and_acyclic() {
        let spec = spec(24, 18);
        let dem = hills(&spec);
        let mut cost = Grid::filled(spec.clone(), 1.0, NODATA_F64);
        // A wall with a gap.
        for row in 2..18 {
            cost.set_nodata(spec.index(12, row));
        }
        let source = source_at(&spec, &[(0, 17), (1, 17), (0, 16)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let acc = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .build(&ctx)
            .unwrap();

        for (col, row) in [(0, 17), (1, 17), (0, 16)] {
            assert_eq!(acc.cost.get(col, row), Some(0.0));
        }
        assert_eq!(acc.cost.get(12, 10), None);
        let mut reached = 0;
        for idx in 0..spec.len() {
            let (col, row) = spec.col_row(idx);
            let Some(total) = acc.cost.get(col, row) else {
                continue;
            };
            reached += 1;
            let path = acc.trace(col, row).expect("reached cells trace to a source");
            assert!(path.len() <= spec.len());
            let (sc, sr) = *path.last().unwrap();
            assert_eq!(acc.backlink.get(sc, sr), Some(SOURCE));
            let mut previous = total;
            for &(c, r) in &path[1..] {
                let next = acc.cost.get(c, r).unwrap();
                assert!(next <= previous);
                previous = next;
            }
        }
        assert_eq!(reached, spec.len() - 16);
    }

    #[test]
    fn test_matches_exhaustive_relaxation() {
        let spec = spec(9, 7);
        let dem = hills(&spec);
        let cost = Grid::filled(spec.clone(), 1.5, NODATA_F64);
        let source = source_at(&spec, &[(4, 3)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let builder = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .vertical(VerticalFactor::Tobler {
                low_cut: -40.0,
                high_cut: 40.0,
            });
        let acc = builder.build(&ctx).unwrap();

        // Bellman-Ford with the same step costs.
        let search = Search {
            ctx: &ctx,
            cost: &cost,
            elevation: &dem,
            builder: &builder,
        };
        let mut dist = vec![f64::INFINITY; spec.len()];
        dist[spec.index(4, 3)] = 0.0;
        loop {
            let mut changed = false;
            for u in 0..spec.len() {
                if !dist[u].is_finite() {
                    continue;
                }
                for (dir, v) in spec.neighbors(u) {
                    if let Some(step) = search.step(u, dir, v) {
                        if dist[u] + step < dist[v] - 1e-9 {
                            dist[v] = dist[u] + step;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        for (idx, expected) in dist.into_iter().enumerate() {
            match acc.cost.get_index(idx) {
                Some(actual) => assert_relative_eq!(actual, expected, max_relative = 1e-9),
                None => assert!(expected.is_infinite()),
            }
        }
    }

    #[test]
    fn test_direction_matters_on_a_ramp() {
        // Rises 5 units per 10 unit cell toward the east.
        let spec = spec(6, 1);
        let dem = Grid::from_vec(
            spec.clone(),
            NODATA_F64,
            (0..6).map(|c| c as f64 * 5.0).collect(),
        )
        .unwrap();
        let cost = Grid::filled(spec.clone(), 1.0, NODATA_F64);
        let source = source_at(&spec, &[(0, 0)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let run = |direction, surface| {
            Accumulation::builder()
                .source(&source)
                .cost(&cost)
                .elevation(&dem)
                .direction(direction)
                .surface_distance(surface)
                .build(&ctx)
                .unwrap()
                .cost
                .get(5, 0)
                .unwrap()
        };
        let uphill = run(TravelDirection::FromSource, false);
        let downhill = run(TravelDirection::ToSource, false);
        assert!(uphill > downhill);
        let tan = 0.5_f64;
        assert_relative_eq!(uphill, 50.0 * (3.5 * tan).exp(), max_relative = 1e-12);
        assert_relative_eq!(
            downhill,
            50.0 * (3.5 * ((0.05 - tan).abs() - 0.05)).exp(),
            max_relative = 1e-12
        );
        let surface = run(TravelDirection::FromSource, true);
        assert_relative_eq!(surface, uphill * 1.25_f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_steep_steps_are_impassable() {
        let spec = spec(3, 1);
        let dem = Grid::from_vec(spec.clone(), NODATA_F64, vec![0.0, 0.0, 100.0]).unwrap();
        let cost = Grid::filled(spec.clone(), 1.0, NODATA_F64);
        let source = source_at(&spec, &[(0, 0)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let acc = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .vertical(VerticalFactor::Binary {
                zero_factor: 1.0,
                low_cut: -45.0,
                high_cut: 45.0,
            })
            .build(&ctx)
            .unwrap();
        assert_relative_eq!(acc.cost.get(1, 0).unwrap(), 10.0);
        assert_eq!(acc.cost.get(2, 0), None);
        assert_eq!(acc.backlink.get(2, 0), None);
        assert_eq!(acc.trace(2, 0), None);
    }

    #[test]
    fn test_negative_factors_are_rejected() {
        let spec = spec(3, 1);
        let dem = Grid::filled(spec.clone(), 0.0, NODATA_F64);
        let cost = Grid::filled(spec.clone(), 1.0, NODATA_F64);
        let source = source_at(&spec, &[(0, 0)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let err = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .vertical(VerticalFactor::Binary {
                zero_factor: -1.0,
                low_cut: -45.0,
                high_cut: 45.0,
            })
            .build(&ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            EvacError::Config(ConfigError::Factor { kind: "vertical", .. })
        ));
        assert!(err.is_config());
        let err = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .horizontal(HorizontalFactor::Binary {
                zero_factor: -2.0,
                cut_angle: 90.0,
                direction: 90.0,
            })
            .build(&ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            EvacError::Config(ConfigError::Factor { kind: "horizontal", .. })
        ));
    }

    #[test]
    fn test_missing_parameter() {
        let spec = spec(2, 2);
        let dem = Grid::filled(spec.clone(), 0.0, NODATA_F64);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let err = Accumulation::builder()
            .elevation(&dem)
            .cost(&dem)
            .build(&ctx)
            .unwrap_err();
        assert!(matches!(err, EvacError::Builder("source")));
    }

    #[test]
    fn test_misaligned_inputs() {
        let dem = Grid::filled(spec(2, 2), 0.0, NODATA_F64);
        let cost = Grid::filled(spec(3, 2), 1.0, NODATA_F64);
        let source = source_at(&spec(2, 2), &[(0, 0)]);
        let ctx = ProcessingContext::new(&dem, None).unwrap();
        let err = Accumulation::builder()
            .source(&source)
            .cost(&cost)
            .elevation(&dem)
            .build(&ctx)
            .unwrap_err();
        assert!(matches!(err, EvacError::Grid(_)));
        assert!(!err.is_config());
    }
}
