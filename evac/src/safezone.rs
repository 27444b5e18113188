use crate::{rasterize::rasterize_mask, ConfigError, EvacError, ProcessingContext};
use grid::{
    geo::{BooleanOps, MultiPolygon, Polygon},
    Grid, C,
};
use log::debug;

/// Returns the part of `study_area` outside `hazard`, one polygon
/// per connected piece.
///
/// The result is a starting point for drawing the real safe zone.
pub fn preliminary_safe_zone(
    study_area: &MultiPolygon<C>,
    hazard: &MultiPolygon<C>,
) -> Vec<Polygon<C>> {
    let safe = study_area.difference(hazard);
    debug!("preliminary safe zone: {} parts", safe.0.len());
    safe.0
}

/// Rasterizes the safe zone onto the study area. These cells are the
/// sources of the accumulated cost search.
pub fn safe_zone_mask(
    ctx: &ProcessingContext,
    safe_zone: &MultiPolygon<C>,
) -> Result<Grid<u8>, EvacError> {
    let mask = ctx.mask_to_study_area(&rasterize_mask(ctx.spec(), safe_zone))?;
    if mask.valid_count() == 0 {
        return Err(ConfigError::EmptySafeZone.into());
    }
    Ok(mask)
}
