use crate::{options::SafeZone, vector, workspace::Workspace};
use anyhow::Result;
use evac::{
    naming::{ArtifactKey, Role},
    safezone::safe_zone_mask,
};
use log::info;
use std::path::Path;

impl SafeZone {
    pub fn run(&self) -> Result<()> {
        safe_zone(&Workspace::new(&self.workspace), &self.polygons)
    }
}

/// Stores the safe zone polygons and their cells within the study
/// area.
pub fn safe_zone(ws: &Workspace, polygons: &Path) -> Result<()> {
    let ctx = ws.context()?;
    let shape = vector::read_shape(polygons)?;
    let mask = safe_zone_mask(&ctx, &shape)?;
    ws.write_grid(&ArtifactKey::root(Role::SafeZoneRaster), &mask)?;
    ws.write_polygons(&ArtifactKey::root(Role::SafeZonePolygon), &shape.0)?;
    info!("safe zone: {} cells", mask.valid_count());
    Ok(())
}
