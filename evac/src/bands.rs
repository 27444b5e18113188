//! Integer-minute time maps and obstacle void filling.

use crate::{
    polygonize::{polygonize, Region},
    rasterize::rasterize_mask,
    EvacError, ProcessingContext,
};
use grid::{
    geo::{BooleanOps, MultiPolygon},
    Grid, GridSpec, Sample, C, NODATA_I32,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// How obstacle cells get their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    /// Each cell takes the value of the closest cell outside the
    /// obstacle, reached without leaving the obstacle. Ties go to the
    /// smaller value.
    #[default]
    Nearest,

    /// Every cell of an obstacle takes the smallest value found just
    /// outside it.
    ZoneMinimum,
}

/// A band raster and its dissolved polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMap {
    pub raster: Grid<i32>,

    /// One region per band, `value` being the travel time in whole
    /// minutes.
    pub regions: Vec<Region>,
}

impl BandMap {
    pub fn new(raster: Grid<i32>) -> Self {
        let regions = polygonize(&raster);
        Self { raster, regions }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeMap {
    pub unfilled: BandMap,

    /// Present when obstacles were given.
    pub filled: Option<BandMap>,
}

/// Rounds travel times up to whole minutes.
pub fn to_bands(time: &Grid<f64>) -> Grid<i32> {
    time.par_map(NODATA_I32, |minutes| i32::try_from_f64(minutes.ceil()))
}

/// Rasterizes obstacle footprints (typically buildings) that lie
/// outside the safe zone.
pub fn obstacle_mask(
    ctx: &ProcessingContext,
    footprints: &MultiPolygon<C>,
    safe_zone: Option<&MultiPolygon<C>>,
) -> Result<Grid<u8>, EvacError> {
    let outside = match safe_zone {
        Some(safe_zone) => footprints.difference(safe_zone),
        None => footprints.clone(),
    };
    let dissolved = outside
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        });
    debug!("{} dissolved obstacle parts", dissolved.0.len());
    ctx.mask_to_study_area(&rasterize_mask(ctx.spec(), &dissolved))
}

/// Replaces obstacle cells with values from their surroundings.
///
/// Obstacles are split into 4-connected zones; each zone is filled
/// from the valid non-obstacle cells 8-adjacent to it. A zone with no
/// such neighbor becomes nodata. Cells outside the obstacle mask are
/// returned unchanged.
pub fn fill(
    bands: &Grid<i32>,
    obstacles: &Grid<u8>,
    rule: FillRule,
) -> Result<Grid<i32>, EvacError> {
    bands.spec().ensure_coregistered(obstacles.spec())?;
    let spec = bands.spec();
    let mut out = bands.clone();
    let mut zone_of: Vec<Option<usize>> = vec![None; spec.len()];
    let mut zones = 0_usize;
    let mut unfilled = 0_usize;

    for start in 0..spec.len() {
        if obstacles.get_index(start).is_none() || zone_of[start].is_some() {
            continue;
        }
        let zone = collect_zone(obstacles, start, zones, &mut zone_of);
        zones += 1;

        // Each border cell's best outside value.
        let mut seeds = BTreeMap::new();
        for &cell in &zone {
            let best = spec
                .neighbors(cell)
                .filter(|(_, n)| obstacles.get_index(*n).is_none())
                .filter_map(|(_, n)| bands.get_index(n))
                .min();
            if let Some(value) = best {
                seeds.insert(cell, value);
            }
        }

        if seeds.is_empty() {
            unfilled += zone.len();
            for &cell in &zone {
                out.set_nodata(cell);
            }
            continue;
        }
        match rule {
            FillRule::ZoneMinimum => {
                let min = seeds.values().copied().min().unwrap_or(NODATA_I32);
                for &cell in &zone {
                    out.set_index(cell, min);
                }
            }
            FillRule::Nearest => {
                for (cell, value) in spread(spec, &zone_of, &seeds) {
                    out.set_index(cell, value);
                }
            }
        }
    }
    debug!("filled {zones} obstacle zones, {unfilled} cells left without a value");
    Ok(out)
}

/// Flood fills the 4-connected obstacle zone containing `start`.
fn collect_zone(
    obstacles: &Grid<u8>,
    start: usize,
    id: usize,
    zone_of: &mut [Option<usize>],
) -> Vec<usize> {
    let spec = obstacles.spec();
    let mut zone = Vec::new();
    let mut queue = VecDeque::from([start]);
    zone_of[start] = Some(id);
    while let Some(cell) = queue.pop_front() {
        zone.push(cell);
        for (dir, n) in spec.neighbors(cell) {
            if !dir.is_diagonal() && zone_of[n].is_none() && obstacles.get_index(n).is_some() {
                zone_of[n] = Some(id);
                queue.push_back(n);
            }
        }
    }
    zone
}

/// Breadth-first spread of seed values through their zone, one
/// 4-connected step per round.
fn spread(
    spec: &GridSpec,
    zone_of: &[Option<usize>],
    seeds: &BTreeMap<usize, i32>,
) -> BTreeMap<usize, i32> {
    let mut assigned = seeds.clone();
    let mut frontier: Vec<usize> = seeds.keys().copied().collect();
    while !frontier.is_empty() {
        let mut next: BTreeMap<usize, i32> = BTreeMap::new();
        for &cell in &frontier {
            let value = assigned[&cell];
            for (dir, n) in spec.neighbors(cell) {
                if dir.is_diagonal() || zone_of[n] != zone_of[cell] || assigned.contains_key(&n) {
                    continue;
                }
                next.entry(n)
                    .and_modify(|v| *v = (*v).min(value))
                    .or_insert(value);
            }
        }
        frontier = next.keys().copied().collect();
        assigned.extend(next);
    }
    assigned
}

/// Builds the time map for one travel time surface, and its filled
/// variant when obstacles are given.
pub fn time_map(
    ctx: &ProcessingContext,
    time: &Grid<f64>,
    obstacles: Option<(&Grid<u8>, FillRule)>,
) -> Result<TimeMap, EvacError> {
    ctx.check(time)?;
    let bands = to_bands(time);
    let filled = match obstacles {
        Some((mask, rule)) => {
            ctx.check(mask)?;
            Some(BandMap::new(fill(&bands, mask, rule)?))
        }
        None => None,
    };
    let unfilled = BandMap::new(bands);
    info!(
        "time map: {} bands{}",
        unfilled.regions.len(),
        if filled.is_some() { " (filled)" } else { "" }
    );
    Ok(TimeMap { unfilled, filled })
}
