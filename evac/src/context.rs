use crate::{rasterize::rasterize_mask, units, ConfigError, EvacError};
use grid::{geo::MultiPolygon, Grid, GridSpec, Sample, C, NODATA_U8};
use log::debug;

/// Everything a scenario run needs to know about where it is
/// working: the snap grid, the study area, and how long a linear
/// unit is.
///
/// Built once per run and passed by reference to every operation.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    study_area: Grid<u8>,
    meters_per_unit: f64,
}

impl ProcessingContext {
    /// Derives the context from the elevation model.
    ///
    /// Without a study area polygon every valid elevation cell is
    /// part of the study area. With one, only valid elevation cells
    /// whose center is covered by it are.
    pub fn new(
        elevation: &Grid<f64>,
        study_area: Option<&MultiPolygon<C>>,
    ) -> Result<Self, EvacError> {
        let spec = elevation.spec();
        let meters_per_unit = linear_unit(spec)?;
        let mask = match study_area {
            None => elevation.map(NODATA_U8, |_| Some(1)),
            Some(shape) => rasterize_mask(spec, shape).zip_map(elevation, NODATA_U8, |m, z| {
                m.and(z).map(|_| 1)
            })?,
        };
        debug!(
            "study area: {} of {} cells, {meters_per_unit} m/unit",
            mask.valid_count(),
            mask.len()
        );
        Ok(Self {
            study_area: mask,
            meters_per_unit,
        })
    }

    /// Rebuilds a context from a previously derived study area mask.
    pub fn from_study_area(study_area: Grid<u8>) -> Result<Self, EvacError> {
        let meters_per_unit = linear_unit(study_area.spec())?;
        Ok(Self {
            study_area,
            meters_per_unit,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        self.study_area.spec()
    }

    /// `1` inside the study area, nodata outside.
    pub fn study_area(&self) -> &Grid<u8> {
        &self.study_area
    }

    pub fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }

    pub fn contains(&self, index: usize) -> bool {
        self.study_area.get_index(index).is_some()
    }

    /// Fails unless `grid` shares this context's geometry.
    pub fn check<T: Sample>(&self, grid: &Grid<T>) -> Result<(), EvacError> {
        self.spec().ensure_coregistered(grid.spec())?;
        Ok(())
    }

    /// Returns a copy of `grid` with every cell outside the study
    /// area set to nodata.
    pub fn mask_to_study_area<T: Sample>(&self, grid: &Grid<T>) -> Result<Grid<T>, EvacError> {
        Ok(grid.zip_map(&self.study_area, grid.nodata(), |v, m| m.and(v))?)
    }
}

fn linear_unit(spec: &GridSpec) -> Result<f64, ConfigError> {
    let unit = spec.srs.linear_unit.as_deref();
    unit.and_then(units::meters_per_unit)
        .ok_or_else(|| ConfigError::LinearUnit(unit.map(str::to_string)))
}
