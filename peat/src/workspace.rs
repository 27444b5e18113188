//! On-disk artifact layout.
//!
//! Shared artifacts live at `<root>/<stem>.<ext>`, scenario artifacts
//! at `<root>/<scenario>/<stem>.<ext>`. Grids are written as BIL and
//! polygons as GeoJSON. Every artifact has one writer; rerunning a
//! step overwrites its outputs.

use crate::vector;
use anyhow::Result;
use evac::{
    naming::{ArtifactKey, Role},
    polygonize::Region,
    ConfigError, ProcessingContext,
};
use geo::{MultiPolygon, Polygon};
use geojson::JsonValue;
use grid::{Grid, Sample};
use log::{debug, info};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        let ext = if key.role.is_vector() {
            "geojson"
        } else {
            "bil"
        };
        let mut path = self.root.clone();
        if let Some(scenario) = key.scenario.as_deref().filter(|_| !key.role.is_root()) {
            path.push(scenario);
        }
        path.push(format!("{}.{ext}", key.stem()));
        path
    }

    /// Path of an artifact that an earlier step must have written.
    pub fn require(&self, key: &ArtifactKey) -> Result<PathBuf, ConfigError> {
        let path = self.path(key);
        if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::MissingArtifact(path))
        }
    }

    pub fn read_grid<T: Sample>(&self, key: &ArtifactKey) -> Result<Grid<T>> {
        let path = self.require(key)?;
        Ok(grid::io::read(path)?)
    }

    pub fn write_grid<T: Sample>(&self, key: &ArtifactKey, grid: &Grid<T>) -> Result<()> {
        let path = self.path(key);
        grid::io::remove(&path)?;
        grid::io::write(&path, grid)?;
        Ok(())
    }

    pub fn read_shape(&self, key: &ArtifactKey) -> Result<MultiPolygon<f64>> {
        vector::read_shape(&self.require(key)?)
    }

    pub fn write_polygons(&self, key: &ArtifactKey, polygons: &[Polygon<f64>]) -> Result<()> {
        let path = self.path(key);
        debug!("writing {}", path.display());
        vector::write_polygons(&path, polygons)
    }

    pub fn write_regions<F>(
        &self,
        key: &ArtifactKey,
        regions: &[Region],
        attribute: &str,
        value: F,
    ) -> Result<()>
    where
        F: Fn(i32) -> JsonValue,
    {
        let path = self.path(key);
        debug!("writing {}", path.display());
        vector::write_regions(&path, regions, attribute, value)
    }

    /// Directory holding a scenario's artifacts. `scenario` must
    /// already be cleaned.
    pub fn scenario_dir(&self, scenario: &str) -> PathBuf {
        self.root.join(scenario)
    }

    /// Removes every artifact of a scenario. Shared artifacts (DEM,
    /// study area, safe zone) are kept. Returns whether anything was
    /// removed.
    pub fn delete_scenario(&self, scenario: &str) -> Result<bool> {
        let dir = self.scenario_dir(scenario);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!("removed {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Context of a prepared workspace.
    pub fn context(&self) -> Result<ProcessingContext> {
        let study_area = self.read_grid(&ArtifactKey::root(Role::StudyAreaRaster))?;
        Ok(ProcessingContext::from_study_area(study_area)?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
