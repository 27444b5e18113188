//! Artifact keys.
//!
//! Every persisted grid or polygon set is named by its role, the
//! scenario it belongs to and, for speed-dependent outputs, a speed
//! token. Study area, safe zone, elevation and building artifacts are
//! shared by all scenarios and carry no scenario name.

use crate::{ConfigError, Speed};
use std::fmt;

/// Variant marking a void-filled time map.
pub const FILLED: &str = "filled";

const RESERVED: [&str; 2] = ["scratch", "PEATbasin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    CostInverse,
    PathDistance,
    Backlink,
    EvacSurface,
    TimeMapRaster,
    TimeMapPolygon,
    SpeedMapRaster,
    SpeedMapPolygon,
    SafeZoneRaster,
    SafeZonePolygon,
    StudyAreaRaster,
    StudyAreaPolygon,
    Dem,
    Buildings,
}

impl Role {
    pub fn stem(self) -> &'static str {
        match self {
            Role::CostInverse => "lc_cost_inverse",
            Role::PathDistance => "path_distance",
            Role::Backlink => "backlink",
            Role::EvacSurface => "evac_surface",
            Role::TimeMapRaster => "time_map_raster",
            Role::TimeMapPolygon => "time_map_polygon",
            Role::SpeedMapRaster => "speed_map_raster",
            Role::SpeedMapPolygon => "speed_map_polygon",
            Role::SafeZoneRaster => "safe_zone_raster",
            Role::SafeZonePolygon => "safe_zone_polygon",
            Role::StudyAreaRaster => "study_area_raster",
            Role::StudyAreaPolygon => "study_area_polygon",
            Role::Dem => "dem",
            Role::Buildings => "buildings",
        }
    }

    /// Shared by every scenario.
    pub fn is_root(self) -> bool {
        matches!(
            self,
            Role::SafeZoneRaster
                | Role::SafeZonePolygon
                | Role::StudyAreaRaster
                | Role::StudyAreaPolygon
                | Role::Dem
                | Role::Buildings
        )
    }

    /// Stored as polygons rather than a grid.
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            Role::TimeMapPolygon
                | Role::SpeedMapPolygon
                | Role::SafeZonePolygon
                | Role::StudyAreaPolygon
                | Role::Buildings
        )
    }
}

/// Collision-free name of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactKey {
    pub role: Role,
    pub scenario: Option<String>,
    pub speed: Option<Speed>,
    pub variant: Option<String>,
}

impl ArtifactKey {
    pub fn root(role: Role) -> Self {
        Self {
            role,
            scenario: None,
            speed: None,
            variant: None,
        }
    }

    pub fn scenario(role: Role, scenario: &str) -> Self {
        Self {
            scenario: Some(scenario.to_owned()),
            ..Self::root(role)
        }
    }

    pub fn with_speed(self, speed: Speed) -> Self {
        Self {
            speed: Some(speed),
            ..self
        }
    }

    pub fn with_variant(self, variant: impl Into<String>) -> Self {
        Self {
            variant: Some(variant.into()),
            ..self
        }
    }

    pub fn filled(self) -> Self {
        self.with_variant(FILLED)
    }

    /// Speed map key for an arrival and delay in minutes.
    pub fn speed_map(role: Role, scenario: &str, arrival: i32, delay: i32) -> Self {
        Self::scenario(role, scenario).with_variant(format!("{arrival}_{delay}"))
    }

    /// Base file name without extension, e.g.
    /// `time_map_raster_filled_tsunami_0p89`.
    pub fn stem(&self) -> String {
        let filled = self.variant.as_deref() == Some(FILLED);
        let mut parts = vec![self.role.stem().to_owned()];
        if filled {
            parts.push(FILLED.to_owned());
        }
        parts.extend(self.scenario.clone());
        parts.extend(self.speed.map(Speed::token));
        if !filled {
            parts.extend(self.variant.clone());
        }
        parts.join("_")
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Makes `name` safe for file and folder names.
///
/// A leading non-letter gets an `S` prefix, each run of characters
/// other than letters, digits and `_` becomes a single `_`, and a
/// trailing `_` gets an `s` suffix.
pub fn clean_scenario_name(name: &str) -> Result<String, ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::ScenarioName(name.to_owned()));
    }

    let mut cleaned = String::with_capacity(name.len() + 2);
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        cleaned.push('S');
    }
    for c in name.chars() {
        let c = if c.is_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }
    if cleaned.ends_with('_') {
        cleaned.push('s');
    }

    if RESERVED.contains(&cleaned.as_str()) {
        return Err(ConfigError::ScenarioName(cleaned));
    }
    Ok(cleaned)
}
