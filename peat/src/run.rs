use crate::{
    clamp_times::clamp_times,
    cost_surface::cost_surface,
    evac_surface::evac_surface,
    job::{self, Job},
    options::Run,
    prepare::prepare,
    safe_zone::safe_zone,
    speed_map::speed_map,
    time_map::time_map,
    workspace::Workspace,
};
use anyhow::{Context, Result};
use log::info;

impl Run {
    pub fn run(&self) -> Result<()> {
        let job: Job = job::read_json(&self.job)?;
        run(&job)
    }
}

/// Runs a whole scenario: preparation, cost surface, travel times,
/// time maps and the speed map.
pub fn run(job: &Job) -> Result<()> {
    job.validate()?;
    let ws = Workspace::new(&job.workspace);
    let now = std::time::Instant::now();

    prepare(&ws, &job.dem, job.study_area.as_deref()).context("prepare")?;
    safe_zone(&ws, &job.safe_zone).context("safe zone")?;
    cost_surface(&ws, &job.scenario, &job.layers).context("cost surface")?;
    evac_surface(&ws, &job.scenario, &job.speeds, &job.factors).context("evacuation surface")?;
    if let Some(max_minutes) = job.max_minutes {
        for &speed in &job.speeds {
            clamp_times(&ws, &job.scenario, speed, max_minutes)
                .with_context(|| format!("clamping {speed} m/s"))?;
        }
    }
    time_map(
        &ws,
        &job.scenario,
        &job.speeds,
        job.buildings.as_deref(),
        job.fill,
    )
    .context("time map")?;
    speed_map(
        &ws,
        &job.scenario,
        &job.speeds,
        job.arrival,
        job.delay,
        job.buildings.is_some(),
    )
    .context("speed map")?;

    info!("{} finished in {:?}", job.scenario, now.elapsed());
    Ok(())
}
