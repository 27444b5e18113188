use grid::GridError;
use std::path::PathBuf;
use thiserror::Error;

/// Structurally invalid user input.
///
/// Always reported before any raster work is done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("processing order {0} is used by more than one layer")]
    DuplicateOrder(u8),

    #[error("no base layer (processing order 0)")]
    MissingBase,

    #[error("processing order {0} is outside 0..={max}", max = crate::cost::MAX_ORDER)]
    OrderRange(u8),

    #[error("layer '{layer}': SCV {scv} is outside [0, 1]")]
    ScvRange { layer: String, scv: f64 },

    #[error("layer '{0}' has no classes")]
    EmptyRemap(String),

    #[error("travel limit {0} (arrival - delay - 1) must be positive")]
    TravelLimit(i32),

    #[error("unrecognized linear unit {0:?}")]
    LinearUnit(Option<String>),

    #[error("invalid speed {0}")]
    InvalidSpeed(f64),

    #[error("no speeds given")]
    EmptySpeeds,

    #[error("maximum time {0} must be positive")]
    MaxTime(f64),

    #[error("invalid scenario name {0:?}")]
    ScenarioName(String),

    #[error("safe zone does not cover any study area cell")]
    EmptySafeZone,

    #[error("invalid {kind} factor: {reason}")]
    Factor { kind: &'static str, reason: String },

    #[error("invalid vertical factor table: {0}")]
    VerticalTable(String),

    #[error("missing prerequisite artifact {}", .0.display())]
    MissingArtifact(PathBuf),
}

#[derive(Error, Debug)]
pub enum EvacError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl EvacError {
    /// Returns `true` for errors caused by invalid input rather than
    /// a failure while processing.
    pub fn is_config(&self) -> bool {
        matches!(self, EvacError::Config(_) | EvacError::Builder(_))
    }
}
