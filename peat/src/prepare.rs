use crate::{options::Prepare, vector, workspace::Workspace};
use anyhow::{Context, Result};
use evac::{
    naming::{ArtifactKey, Role},
    polygonize::polygonize,
    ProcessingContext,
};
use grid::{Grid, NODATA_I32};
use log::info;
use std::path::Path;

impl Prepare {
    pub fn run(&self) -> Result<()> {
        let ws = Workspace::new(&self.workspace);
        prepare(&ws, &self.dem, self.study_area.as_deref())?;
        Ok(())
    }
}

/// Stores the DEM clipped to the study area, and the study area as
/// both a mask and polygons.
pub fn prepare(ws: &Workspace, dem: &Path, study_area: Option<&Path>) -> Result<ProcessingContext> {
    let dem: Grid<f64> =
        grid::io::read(dem).with_context(|| format!("reading DEM {}", dem.display()))?;
    let shape = study_area.map(vector::read_shape).transpose()?;
    let ctx = ProcessingContext::new(&dem, shape.as_ref())?;

    ws.write_grid(&ArtifactKey::root(Role::Dem), &ctx.mask_to_study_area(&dem)?)?;
    ws.write_grid(&ArtifactKey::root(Role::StudyAreaRaster), ctx.study_area())?;
    let polygons: Vec<_> = polygonize(&ctx.study_area().map(NODATA_I32, |v| Some(i32::from(v))))
        .into_iter()
        .flat_map(|region| region.shape.0)
        .collect();
    ws.write_polygons(&ArtifactKey::root(Role::StudyAreaPolygon), &polygons)?;
    info!(
        "prepared {}: {} study area cells",
        ws.root().display(),
        ctx.study_area().valid_count()
    );
    Ok(ctx)
}
