use crate::{options::TimeMap, progress, vector, workspace::Workspace};
use anyhow::Result;
use evac::{
    bands::{self, obstacle_mask, BandMap, FillRule},
    naming::{clean_scenario_name, ArtifactKey, Role},
    Speed,
};
use geojson::JsonValue;
use grid::Grid;
use rayon::prelude::*;
use std::path::Path;

/// Time map polygon attribute holding the band's minutes.
pub const TRAVEL_TIME: &str = "Travel_time";

impl TimeMap {
    pub fn run(&self) -> Result<()> {
        time_map(
            &Workspace::new(&self.workspace),
            &self.scenario,
            &self.speeds.0,
            self.buildings.as_deref(),
            self.fill.into(),
        )
    }
}

/// Writes a time map per speed, plus a building-filled variant when
/// `buildings` is given.
pub fn time_map(
    ws: &Workspace,
    scenario: &str,
    speeds: &[Speed],
    buildings: Option<&Path>,
    rule: FillRule,
) -> Result<()> {
    let scenario = clean_scenario_name(scenario)?;
    let surface = |speed: Speed| ArtifactKey::scenario(Role::EvacSurface, &scenario).with_speed(speed);
    for &speed in speeds {
        ws.require(&surface(speed))?;
    }

    let ctx = ws.context()?;
    let obstacles = match buildings {
        Some(path) => {
            let footprints = vector::read_shape(path)?;
            let safe_key = ArtifactKey::root(Role::SafeZonePolygon);
            let safe_zone = if ws.path(&safe_key).exists() {
                Some(ws.read_shape(&safe_key)?)
            } else {
                None
            };
            ws.write_polygons(&ArtifactKey::root(Role::Buildings), &footprints.0)?;
            Some(obstacle_mask(&ctx, &footprints, safe_zone.as_ref())?)
        }
        None => None,
    };

    let pb = progress::bar(format!("Time maps for {scenario}"), speeds.len() as u64);
    speeds.par_iter().try_for_each(|&speed| {
        let time: Grid<f64> = ws.read_grid(&surface(speed))?;
        let map = bands::time_map(&ctx, &time, obstacles.as_ref().map(|mask| (mask, rule)))?;
        let key = |role| ArtifactKey::scenario(role, &scenario).with_speed(speed);
        write_bands(ws, key(Role::TimeMapRaster), key(Role::TimeMapPolygon), &map.unfilled)?;
        if let Some(filled) = &map.filled {
            write_bands(
                ws,
                key(Role::TimeMapRaster).filled(),
                key(Role::TimeMapPolygon).filled(),
                filled,
            )?;
        }
        pb.inc(1);
        Ok::<_, anyhow::Error>(())
    })?;
    pb.finish_and_clear();
    Ok(())
}

fn write_bands(
    ws: &Workspace,
    raster: ArtifactKey,
    polygons: ArtifactKey,
    bands: &BandMap,
) -> Result<()> {
    ws.write_grid(&raster, &bands.raster)?;
    ws.write_regions(&polygons, &bands.regions, TRAVEL_TIME, JsonValue::from)
}
