use anyhow::{anyhow, Error as AnyError};
use clap::{Args, Parser, ValueEnum};
use evac::{bands::FillRule, Speed};
use std::{path::PathBuf, str::FromStr};

/// Pedestrian evacuation travel-time mapping.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Store the elevation grid and derive the study area.
    Prepare(Prepare),

    /// Write a preliminary safe zone: the study area outside the
    /// hazard zone.
    Hazard(Hazard),

    /// Rasterize the safe zone onto the study area.
    SafeZone(SafeZone),

    /// Composite land cover layers into a traversal cost grid.
    CostSurface(CostSurface),

    /// Accumulate cost from the safe zone and convert it to travel
    /// times.
    EvacSurface(EvacSurface),

    /// Cap a travel time surface at a maximum number of minutes.
    ClampTimes(ClampTimes),

    /// Band travel times into whole minutes, optionally filling
    /// building voids.
    TimeMap(TimeMap),

    /// Classify cells by the slowest speed that reaches safety in
    /// time.
    SpeedMap(SpeedMap),

    /// Run every step from a job file.
    Run(Run),

    /// Remove every artifact of a scenario, keeping the shared ones.
    DeleteScenario(DeleteScenario),
}

#[derive(Debug, Clone, Args)]
pub struct Prepare {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    /// Elevation grid (.asc or .bil), in a projected coordinate
    /// system.
    #[arg(long)]
    pub dem: PathBuf,

    /// Study area polygons (GeoJSON). Defaults to the DEM's valid
    /// cells.
    #[arg(long)]
    pub study_area: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct Hazard {
    /// Hazard zone polygons (GeoJSON).
    #[arg(long)]
    pub hazard: PathBuf,

    /// Study area polygons (GeoJSON).
    #[arg(long)]
    pub study_area: PathBuf,

    /// Output GeoJSON.
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct SafeZone {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    /// Safe zone polygons (GeoJSON).
    #[arg(long)]
    pub polygons: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct CostSurface {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,

    /// JSON list of land cover layers.
    #[arg(long)]
    pub layers: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct EvacSurface {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,

    /// Comma separated walking speeds in m/s, e.g. "0.89,1.22".
    #[arg(long)]
    pub speeds: SpeedList,

    /// JSON vertical/horizontal factor settings. Defaults to Tobler's
    /// hiking function with no horizontal factor.
    #[arg(long)]
    pub factors: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ClampTimes {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,

    /// Walking speed in m/s.
    #[arg(long)]
    pub speed: Speed,

    /// Largest travel time to keep, in minutes.
    #[arg(long)]
    pub max: f64,
}

#[derive(Debug, Clone, Args)]
pub struct TimeMap {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,

    /// Comma separated walking speeds in m/s.
    #[arg(long)]
    pub speeds: SpeedList,

    /// Building footprints (GeoJSON) whose cells are filled from
    /// their surroundings.
    #[arg(long)]
    pub buildings: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Fill::Nearest)]
    pub fill: Fill,
}

#[derive(Debug, Clone, Args)]
pub struct SpeedMap {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,

    /// Comma separated walking speeds in m/s.
    #[arg(long)]
    pub speeds: SpeedList,

    /// Minutes until the hazard arrives.
    #[arg(long)]
    pub arrival: i32,

    /// Minutes before evacuation starts.
    #[arg(long, default_value_t = 0)]
    pub delay: i32,

    /// Classify the building-filled time maps.
    #[arg(long)]
    pub filled: bool,
}

#[derive(Debug, Clone, Args)]
pub struct Run {
    /// JSON job file.
    #[arg(short, long)]
    pub job: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteScenario {
    /// Artifact directory.
    #[arg(short, long)]
    pub workspace: PathBuf,

    #[arg(short, long)]
    pub scenario: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Fill {
    Nearest,
    ZoneMinimum,
}

impl From<Fill> for FillRule {
    fn from(fill: Fill) -> Self {
        match fill {
            Fill::Nearest => FillRule::Nearest,
            Fill::ZoneMinimum => FillRule::ZoneMinimum,
        }
    }
}

/// Walking speeds given as "0.89,1.22,1.52".
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedList(pub Vec<Speed>);

impl FromStr for SpeedList {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let speeds = s
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(|token| {
                token
                    .parse::<Speed>()
                    .map_err(|e| anyhow!("{e} in speed list {s:?}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if speeds.is_empty() {
            return Err(anyhow!("no speeds in {s:?}"));
        }
        Ok(Self(speeds))
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, SpeedList};
    use clap::Parser;
    use evac::Speed;

    #[test]
    fn test_speed_list() {
        let SpeedList(speeds) = "0.89, 1.22,1.52".parse().unwrap();
        assert_eq!(
            speeds,
            vec![
                Speed::new(0.89).unwrap(),
                Speed::new(1.22).unwrap(),
                Speed::new(1.52).unwrap()
            ]
        );
        assert!("".parse::<SpeedList>().is_err());
        assert!("0.89,-1".parse::<SpeedList>().is_err());
    }

    #[test]
    fn test_parse_cli() {
        let cli = Cli::try_parse_from([
            "peat",
            "speed-map",
            "-w",
            "out",
            "-s",
            "tsunami",
            "--speeds",
            "0.89,1.22",
            "--arrival",
            "80",
        ])
        .unwrap();
        let Cli::SpeedMap(args) = cli else {
            panic!("expected speed-map");
        };
        assert_eq!(args.delay, 0);
        assert_eq!(args.speeds.0.len(), 2);
        assert!(Cli::try_parse_from(["peat", "time-map", "-w", "out"]).is_err());
        let cli =
            Cli::try_parse_from(["peat", "delete-scenario", "-w", "out", "-s", "tsunami"]).unwrap();
        assert!(matches!(cli, Cli::DeleteScenario(args) if args.scenario == "tsunami"));
    }
}
