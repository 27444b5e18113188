use crate::{
    polygonize::{polygonize, Region},
    ConfigError, EvacError, Speed,
};
use grid::{Grid, Sample, NODATA_I32};
use log::info;

/// Speed map code of a cell no candidate speed gets out in time.
pub const UNSAFE: i32 = 999;

/// Minutes available for travel: `arrival - delay - 1`.
pub fn travel_limit(arrival: i32, delay: i32) -> Result<i32, ConfigError> {
    let limit = arrival - delay - 1;
    if limit > 0 {
        Ok(limit)
    } else {
        Err(ConfigError::TravelLimit(limit))
    }
}

/// Per-cell slowest safe speed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMap {
    /// [`Speed::code`] of the slowest speed arriving within the
    /// travel limit, or [`UNSAFE`].
    pub raster: Grid<i32>,

    pub regions: Vec<Region>,
}

impl SpeedMap {
    /// Speed map attribute for a code: meters per second, or `999`
    /// for unsafe cells.
    pub fn speed_attribute(code: i32) -> f64 {
        if code < 900 {
            f64::from(code) / 100.0
        } else {
            f64::from(code)
        }
    }
}

/// Classifies each cell by the slowest of the candidate speeds whose
/// travel time is within `arrival - delay - 1` minutes.
///
/// Surfaces may be given in any order. A cell that is nodata in every
/// surface stays nodata.
pub fn classify_speeds<T: Sample>(
    surfaces: &[(Speed, &Grid<T>)],
    arrival: i32,
    delay: i32,
) -> Result<SpeedMap, EvacError> {
    let limit = f64::from(travel_limit(arrival, delay)?);
    let Some((_, first)) = surfaces.first() else {
        return Err(ConfigError::EmptySpeeds.into());
    };
    let spec = first.spec();
    for (_, time) in surfaces {
        spec.ensure_coregistered(time.spec())?;
    }

    let cells = (0..spec.len())
        .map(|idx| {
            surfaces
                .iter()
                .filter_map(|(speed, time)| {
                    let minutes = time.get_index(idx)?.as_f64();
                    Some(if minutes <= limit {
                        speed.code()
                    } else {
                        UNSAFE
                    })
                })
                .min()
                .filter(|&code| code != 0)
                .unwrap_or(NODATA_I32)
        })
        .collect();
    let raster = Grid::from_vec(spec.clone(), NODATA_I32, cells)?;
    let regions = polygonize(&raster);
    info!(
        "speed map: travel limit {limit} min, {} classes",
        regions.len()
    );
    Ok(SpeedMap { raster, regions })
}
