use crate::{
    job::{self, Factors},
    options::EvacSurface,
    progress,
    workspace::Workspace,
};
use anyhow::Result;
use evac::{
    naming::{clean_scenario_name, ArtifactKey, Role},
    time::travel_times,
    Accumulation, Speed,
};
use grid::Grid;
use rayon::prelude::*;

impl EvacSurface {
    pub fn run(&self) -> Result<()> {
        let factors = match &self.factors {
            Some(path) => job::read_json(path)?,
            None => Factors::default(),
        };
        evac_surface(
            &Workspace::new(&self.workspace),
            &self.scenario,
            &self.speeds.0,
            &factors,
        )
    }
}

/// Accumulates cost outward from the safe zone and writes a travel
/// time surface per speed.
pub fn evac_surface(
    ws: &Workspace,
    scenario: &str,
    speeds: &[Speed],
    factors: &Factors,
) -> Result<()> {
    let scenario = clean_scenario_name(scenario)?;
    let cost_key = ArtifactKey::scenario(Role::CostInverse, &scenario);
    let dem_key = ArtifactKey::root(Role::Dem);
    let source_key = ArtifactKey::root(Role::SafeZoneRaster);
    for key in [&cost_key, &dem_key, &source_key] {
        ws.require(key)?;
    }
    let vertical = factors.vertical()?;
    vertical.validate()?;
    factors.horizontal.validate()?;

    let ctx = ws.context()?;
    let cost: Grid<f64> = ws.read_grid(&cost_key)?;
    let dem: Grid<f64> = ws.read_grid(&dem_key)?;
    let source: Grid<u8> = ws.read_grid(&source_key)?;
    let acc = Accumulation::builder()
        .source(&source)
        .cost(&cost)
        .elevation(&dem)
        .vertical(vertical)
        .horizontal(factors.horizontal.clone())
        .direction(factors.direction)
        .surface_distance(factors.surface_distance)
        .build(&ctx)?;
    ws.write_grid(
        &ArtifactKey::scenario(Role::PathDistance, &scenario),
        &acc.cost,
    )?;
    ws.write_grid(
        &ArtifactKey::scenario(Role::Backlink, &scenario),
        &acc.backlink,
    )?;

    let surfaces = travel_times(&ctx, &acc, speeds)?;
    let pb = progress::bar(
        format!("Writing {scenario} travel times"),
        surfaces.len() as u64,
    );
    surfaces.par_iter().try_for_each(|(speed, time)| {
        let key = ArtifactKey::scenario(Role::EvacSurface, &scenario).with_speed(*speed);
        ws.write_grid(&key, time)?;
        pb.inc(1);
        Ok::<_, anyhow::Error>(())
    })?;
    pb.finish_and_clear();
    Ok(())
}
