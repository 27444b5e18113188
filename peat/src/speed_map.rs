use crate::{options::SpeedMap, workspace::Workspace};
use anyhow::Result;
use evac::{
    naming::{clean_scenario_name, ArtifactKey, Role},
    speed::{self, classify_speeds, travel_limit},
    Speed,
};
use geojson::JsonValue;
use grid::Grid;
use log::info;

/// Speed map polygon attribute: m/s, or `999` where no speed is
/// safe.
pub const SPEED: &str = "SPEED";

impl SpeedMap {
    pub fn run(&self) -> Result<()> {
        speed_map(
            &Workspace::new(&self.workspace),
            &self.scenario,
            &self.speeds.0,
            self.arrival,
            self.delay,
            self.filled,
        )
    }
}

/// Classifies the time maps of `speeds` against the hazard arrival.
pub fn speed_map(
    ws: &Workspace,
    scenario: &str,
    speeds: &[Speed],
    arrival: i32,
    delay: i32,
    filled: bool,
) -> Result<()> {
    let scenario = clean_scenario_name(scenario)?;
    let limit = travel_limit(arrival, delay)?;
    let keys = speeds
        .iter()
        .map(|&speed| {
            let key = ArtifactKey::scenario(Role::TimeMapRaster, &scenario).with_speed(speed);
            if filled {
                key.filled()
            } else {
                key
            }
        })
        .collect::<Vec<_>>();
    for key in &keys {
        ws.require(key)?;
    }

    let maps = keys
        .iter()
        .map(|key| ws.read_grid::<i32>(key))
        .collect::<Result<Vec<Grid<i32>>>>()?;
    let inputs: Vec<(Speed, &Grid<i32>)> = speeds.iter().copied().zip(&maps).collect();
    let map = classify_speeds(&inputs, arrival, delay)?;

    let raster_key = ArtifactKey::speed_map(Role::SpeedMapRaster, &scenario, arrival, delay);
    let polygon_key = ArtifactKey::speed_map(Role::SpeedMapPolygon, &scenario, arrival, delay);
    ws.write_grid(&raster_key, &map.raster)?;
    ws.write_regions(&polygon_key, &map.regions, SPEED, |code| {
        JsonValue::from(speed::SpeedMap::speed_attribute(code))
    })?;
    info!(
        "{raster_key}: travel limit {limit} min, {} speed classes",
        map.regions.len()
    );
    Ok(())
}
