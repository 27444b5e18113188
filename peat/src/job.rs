//! JSON job and layer files.

use crate::vector;
use anyhow::{Context, Result};
use evac::{
    bands::FillRule,
    cost::{self, CostLayer, CostLayers, LayerSource, Remap},
    factors::{HorizontalFactor, TravelDirection, VerticalFactor},
    naming, speed, ConfigError, Speed,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// One land cover input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFile {
    pub name: String,
    pub order: u8,

    /// A grid (.asc, .bil) or GeoJSON polygons.
    pub path: PathBuf,

    /// GeoJSON property holding the class. Ignored for grids.
    #[serde(default)]
    pub attribute: Option<String>,

    pub remap: Remap,
}

impl LayerFile {
    pub fn load(&self) -> Result<CostLayer> {
        let is_vector = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"));
        let source = if is_vector {
            LayerSource::Vector(vector::read_features(&self.path, self.attribute.as_deref())?)
        } else {
            LayerSource::Raster(grid::io::read(&self.path)?)
        };
        Ok(CostLayer {
            name: self.name.clone(),
            order: self.order,
            source,
            remap: self.remap.clone(),
        })
    }
}

/// Checks processing orders and SCVs without reading any layer.
pub fn validate_layers(layers: &[LayerFile]) -> Result<()> {
    cost::validate_layers(
        layers
            .iter()
            .map(|layer| (layer.name.as_str(), layer.order, &layer.remap)),
    )?;
    Ok(())
}

/// Validates a set of layers, then loads them.
pub fn load_layers(layers: &[LayerFile]) -> Result<CostLayers> {
    validate_layers(layers)?;
    let layers = layers
        .iter()
        .map(|layer| {
            layer
                .load()
                .with_context(|| format!("loading layer '{}'", layer.name))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CostLayers::new(layers)?)
}

/// Accumulation settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Factors {
    pub vertical: VerticalFactor,

    /// Slope/factor table file, replacing `vertical` when given.
    pub vertical_table: Option<PathBuf>,

    pub horizontal: HorizontalFactor,
    pub direction: TravelDirection,
    pub surface_distance: bool,
}

impl Factors {
    pub fn vertical(&self) -> Result<VerticalFactor> {
        match &self.vertical_table {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Ok(VerticalFactor::parse_table(&text)?)
            }
            None => Ok(self.vertical.clone()),
        }
    }
}

/// Everything needed to run one scenario end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub workspace: PathBuf,
    pub scenario: String,
    pub dem: PathBuf,
    #[serde(default)]
    pub study_area: Option<PathBuf>,
    pub safe_zone: PathBuf,
    #[serde(default)]
    pub buildings: Option<PathBuf>,
    pub layers: Vec<LayerFile>,
    pub speeds: Vec<Speed>,
    #[serde(default)]
    pub factors: Factors,
    #[serde(default)]
    pub max_minutes: Option<f64>,
    #[serde(default)]
    pub fill: FillRule,
    pub arrival: i32,
    #[serde(default)]
    pub delay: i32,
}

impl Job {
    /// Checks everything that can be checked without reading a
    /// raster, so a bad job fails before the first step runs.
    pub fn validate(&self) -> Result<()> {
        naming::clean_scenario_name(&self.scenario)?;
        validate_layers(&self.layers)?;
        if self.speeds.is_empty() {
            return Err(ConfigError::EmptySpeeds.into());
        }
        self.factors.vertical()?.validate()?;
        self.factors.horizontal.validate()?;
        speed::travel_limit(self.arrival, self.delay)?;
        Ok(())
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
