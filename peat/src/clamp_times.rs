use crate::{options::ClampTimes, workspace::Workspace};
use anyhow::Result;
use evac::{
    naming::{clean_scenario_name, ArtifactKey, Role},
    time::clamp_outliers,
    Speed,
};
use grid::Grid;
use log::info;

impl ClampTimes {
    pub fn run(&self) -> Result<()> {
        let ws = Workspace::new(&self.workspace);
        clamp_times(&ws, &self.scenario, self.speed, self.max)?;
        Ok(())
    }
}

/// Caps one travel time surface in place. Returns whether it was
/// rewritten.
pub fn clamp_times(ws: &Workspace, scenario: &str, speed: Speed, max_minutes: f64) -> Result<bool> {
    let scenario = clean_scenario_name(scenario)?;
    let key = ArtifactKey::scenario(Role::EvacSurface, &scenario).with_speed(speed);
    let mut time: Grid<f64> = ws.read_grid(&key)?;
    let clamped = clamp_outliers(&mut time, max_minutes)?;
    if clamped {
        ws.write_grid(&key, &time)?;
    } else {
        info!("{key}: no times above {max_minutes} minutes");
    }
    Ok(clamped)
}
