mod clamp_times;
mod cost_surface;
mod delete_scenario;
mod evac_surface;
mod hazard;
mod job;
mod options;
mod prepare;
mod progress;
mod run;
mod safe_zone;
mod speed_map;
mod time_map;
mod vector;
mod workspace;

use anyhow::Result;
use clap::Parser;
use options::Cli;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Prepare(prepare) => prepare.run(),
        Cli::Hazard(hazard) => hazard.run(),
        Cli::SafeZone(safe_zone) => safe_zone.run(),
        Cli::CostSurface(cost_surface) => cost_surface.run(),
        Cli::EvacSurface(evac_surface) => evac_surface.run(),
        Cli::ClampTimes(clamp_times) => clamp_times.run(),
        Cli::TimeMap(time_map) => time_map.run(),
        Cli::SpeedMap(speed_map) => speed_map.run(),
        Cli::Run(run) => run.run(),
        Cli::DeleteScenario(delete_scenario) => delete_scenario.run(),
    }
}
