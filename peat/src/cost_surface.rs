use crate::{
    job::{self, LayerFile},
    options::CostSurface,
    workspace::Workspace,
};
use anyhow::Result;
use log::warn;
use evac::{
    cost::build_cost_surface,
    naming::{clean_scenario_name, ArtifactKey, Role},
};

impl CostSurface {
    pub fn run(&self) -> Result<()> {
        let layers: Vec<LayerFile> = job::read_json(&self.layers)?;
        cost_surface(&Workspace::new(&self.workspace), &self.scenario, &layers)
    }
}

pub fn cost_surface(ws: &Workspace, scenario: &str, layers: &[LayerFile]) -> Result<()> {
    let scenario = clean_scenario_name(scenario)?;
    job::validate_layers(layers)?;
    if ws.scenario_dir(&scenario).exists() {
        warn!("scenario {scenario} is already in use, its artifacts will be overwritten");
    }
    let ctx = ws.context()?;
    let layers = job::load_layers(layers)?;
    let cost = build_cost_surface(&ctx, &layers)?;
    ws.write_grid(&ArtifactKey::scenario(Role::CostInverse, &scenario), &cost)
}
