//! Cost surface construction.
//!
//! Land cover layers are turned into SCV (ease of traversal, `0` to
//! `1`) grids and painted on top of each other in processing order.
//! The result is the reciprocal, so cheaper cells have lower values
//! and SCV `0` becomes impassable nodata.

use crate::{rasterize::rasterize_values, ConfigError, EvacError, ProcessingContext};
use grid::{geo::MultiPolygon, resample, Grid, C, NODATA_F64};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Highest processing order an overlay may use.
pub const MAX_ORDER: u8 = 20;

/// An attribute value identifying a land cover class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassKey {
    Int(i64),
    Text(String),
}

impl ClassKey {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_sample(value: f64) -> Option<Self> {
        let whole = value.round();
        (whole == value && whole.abs() < i64::MAX as f64).then(|| ClassKey::Int(whole as i64))
    }
}

/// How a layer's values become SCVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remap {
    /// The layer's whole valid footprint gets one SCV.
    Uniform(f64),

    /// Per-class SCVs. Values without a class become nodata.
    Classes(Vec<(ClassKey, f64)>),
}

impl Remap {
    fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Remap::Uniform(scv) => Box::new(std::iter::once(*scv)),
            Remap::Classes(classes) => Box::new(classes.iter().map(|(_, scv)| *scv)),
        }
    }
}

/// A polygon with an optional class attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub geometry: MultiPolygon<C>,
    pub class: Option<ClassKey>,
}

#[derive(Debug, Clone)]
pub enum LayerSource {
    /// Class values, resampled onto the context grid as needed.
    Raster(Grid<f64>),

    /// Rasterized onto the context grid by cell center.
    Vector(Vec<VectorFeature>),
}

#[derive(Debug, Clone)]
pub struct CostLayer {
    pub name: String,

    /// `0` for the base layer, `1..=20` for overlays. Higher orders
    /// are painted on top.
    pub order: u8,

    pub source: LayerSource,

    pub remap: Remap,
}

impl CostLayer {
    pub fn is_base(&self) -> bool {
        self.order == 0
    }
}

/// A validated set of cost layers, sorted by processing order.
#[derive(Debug, Clone)]
pub struct CostLayers(Vec<CostLayer>);

impl CostLayers {
    /// Checks the layers with [`validate_layers`] and sorts them by
    /// processing order.
    pub fn new(mut layers: Vec<CostLayer>) -> Result<Self, ConfigError> {
        validate_layers(
            layers
                .iter()
                .map(|layer| (layer.name.as_str(), layer.order, &layer.remap)),
        )?;
        layers.sort_by_key(|layer| layer.order);
        Ok(Self(layers))
    }

    pub fn base(&self) -> &CostLayer {
        &self.0[0]
    }

    pub fn overlays(&self) -> &[CostLayer] {
        &self.0[1..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CostLayer> {
        self.0.iter()
    }
}

/// Checks `(name, order, remap)` layer records: exactly one base
/// layer, no two layers sharing an order, and every SCV in `[0, 1]`.
///
/// Needs no layer data, so it can run before any file is read.
pub fn validate_layers<'a, I>(layers: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (&'a str, u8, &'a Remap)>,
{
    let mut seen = HashSet::new();
    for (name, order, remap) in layers {
        if order > MAX_ORDER {
            return Err(ConfigError::OrderRange(order));
        }
        if !seen.insert(order) {
            return Err(ConfigError::DuplicateOrder(order));
        }
        if matches!(remap, Remap::Classes(c) if c.is_empty()) {
            return Err(ConfigError::EmptyRemap(name.to_string()));
        }
        if let Some(scv) = remap.values().find(|v| !(0.0..=1.0).contains(v)) {
            return Err(ConfigError::ScvRange {
                layer: name.to_string(),
                scv,
            });
        }
    }
    if !seen.contains(&0) {
        return Err(ConfigError::MissingBase);
    }
    Ok(())
}

/// Rounds an SCV to four decimal places.
pub fn quantize(scv: f64) -> f64 {
    (scv * 10_000.0).round() / 10_000.0
}

/// Builds the cost-inverse grid (`1 / SCV`) for the study area.
///
/// Layers are composited in ascending order; an overlay's valid cells
/// replace whatever is below them and its nodata cells are
/// transparent.
pub fn build_cost_surface(
    ctx: &ProcessingContext,
    layers: &CostLayers,
) -> Result<Grid<f64>, EvacError> {
    let now = std::time::Instant::now();
    let mut composite = Grid::new(ctx.spec().clone(), NODATA_F64);
    for layer in layers.iter() {
        let scv = layer_scv(ctx, layer)?;
        info!(
            "layer '{}' (order {}): {} cells",
            layer.name,
            layer.order,
            scv.valid_count()
        );
        composite = scv.zip_map(&composite, NODATA_F64, |top, below| top.or(below))?;
    }
    let cost = composite.par_map(NODATA_F64, |scv| (scv != 0.0).then(|| 1.0 / scv));
    debug!(
        "cost surface: {} passable cells in {:?}",
        cost.valid_count(),
        now.elapsed()
    );
    Ok(cost)
}

fn class_lookup(classes: &[(ClassKey, f64)]) -> HashMap<&ClassKey, f64> {
    classes
        .iter()
        .map(|(key, scv)| (key, quantize(*scv)))
        .collect()
}

/// Returns the layer's SCV grid, limited to the study area.
fn layer_scv(ctx: &ProcessingContext, layer: &CostLayer) -> Result<Grid<f64>, EvacError> {
    let mut unmatched = 0_usize;
    let scv = match (&layer.source, &layer.remap) {
        (LayerSource::Raster(raster), Remap::Uniform(scv)) => {
            let scv = quantize(*scv);
            resample(raster, ctx.spec())?.map(NODATA_F64, |_| Some(scv))
        }
        (LayerSource::Raster(raster), Remap::Classes(classes)) => {
            let lookup = class_lookup(classes);
            let raster = resample(raster, ctx.spec())?;
            let scv = raster.map(NODATA_F64, |v| {
                ClassKey::from_sample(v).and_then(|key| lookup.get(&key).copied())
            });
            unmatched = raster.valid_count() - scv.valid_count();
            scv
        }
        (LayerSource::Vector(features), remap) => {
            let lookup = match remap {
                Remap::Uniform(_) => None,
                Remap::Classes(classes) => Some(class_lookup(classes)),
            };
            let burns: Vec<(MultiPolygon<C>, f64)> = features
                .iter()
                .filter_map(|feature| {
                    let scv = match (remap, &lookup, &feature.class) {
                        (Remap::Uniform(scv), _, _) => Some(quantize(*scv)),
                        (_, Some(lookup), Some(class)) => lookup.get(class).copied(),
                        _ => None,
                    };
                    if scv.is_none() {
                        unmatched += 1;
                    }
                    scv.map(|scv| (feature.geometry.clone(), scv))
                })
                .collect();
            rasterize_values(ctx.spec(), &burns, NODATA_F64)
        }
    };
    if unmatched > 0 {
        warn!(
            "layer '{}': {unmatched} values match no class and are treated as nodata",
            layer.name
        );
    }
    ctx.mask_to_study_area(&scv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use grid::{
        geo::{polygon, Coord},
        GridSpec, SpatialRef, NODATA_F64,
    };

    fn spec(cols: usize, rows: usize, cell_size: f64) -> GridSpec {
        GridSpec::new(
            cols,
            rows,
            cell_size,
            Coord { x: 0.0, y: 40.0 },
            SpatialRef::projected("utm", "Meter"),
        )
    }

    fn ctx() -> ProcessingContext {
        // 4x4 study area with the last column outside it.
        let mut dem = Grid::filled(spec(4, 4, 10.0), 100.0, NODATA_F64);
        for row in 0..4 {
            dem.set(3, row, NODATA_F64);
        }
        ProcessingContext::new(&dem, None).unwrap()
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]])
    }

    fn layer(name: &str, order: u8, source: LayerSource, remap: Remap) -> CostLayer {
        CostLayer {
            name: name.to_string(),
            order,
            source,
            remap,
        }
    }

    fn uniform_vector(name: &str, order: u8, shape: MultiPolygon, scv: f64) -> CostLayer {
        layer(
            name,
            order,
            LayerSource::Vector(vec![VectorFeature {
                geometry: shape,
                class: None,
            }]),
            Remap::Uniform(scv),
        )
    }

    #[test]
    fn test_overlay_painted_on_base() {
        let ctx = ctx();
        let layers = CostLayers::new(vec![
            // Overlay listed first; order decides.
            uniform_vector("roads", 1, square(0.0, 30.0, 20.0, 40.0), 1.0),
            uniform_vector("land", 0, square(-50.0, -50.0, 90.0, 90.0), 0.5),
        ])
        .unwrap();
        let cost = build_cost_surface(&ctx, &layers).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                let expected = match (col, row) {
                    (3, _) => None,
                    (0 | 1, 0) => Some(1.0),
                    _ => Some(2.0),
                };
                assert_eq!(cost.get(col, row), expected, "({col}, {row})");
            }
        }
    }

    #[test]
    fn test_zero_scv_is_impassable() {
        let ctx = ctx();
        let layers = CostLayers::new(vec![
            uniform_vector("land", 0, square(-50.0, -50.0, 90.0, 90.0), 0.25),
            uniform_vector("water", 1, square(0.0, 0.0, 10.0, 10.0), 0.0),
        ])
        .unwrap();
        let cost = build_cost_surface(&ctx, &layers).unwrap();
        assert_eq!(cost.get(0, 3), None);
        assert_relative_eq!(cost.get(1, 3).unwrap(), 4.0);
    }

    #[test]
    fn test_raster_classes() {
        let ctx = ctx();
        // 2x2 @ 20m land cover, resampled onto the 10m grid.
        let land_cover = Grid::from_vec(spec(2, 2, 20.0), NODATA_F64, vec![1.0, 2.0, 3.0, 7.0])
            .unwrap();
        let layers = CostLayers::new(vec![layer(
            "landcover",
            0,
            LayerSource::Raster(land_cover),
            Remap::Classes(vec![
                (ClassKey::Int(1), 1.0),
                (ClassKey::Int(2), 0.8),
                (ClassKey::Int(3), 0.333_333),
            ]),
        )])
        .unwrap();
        let cost = build_cost_surface(&ctx, &layers).unwrap();
        assert_relative_eq!(cost.get(0, 0).unwrap(), 1.0);
        assert_relative_eq!(cost.get(2, 1).unwrap(), 1.25);
        assert_relative_eq!(cost.get(1, 3).unwrap(), 1.0 / 0.3333);
        // Class 7 has no SCV.
        assert_eq!(cost.get(2, 3), None);
    }

    #[test]
    fn test_vector_classes() {
        let ctx = ctx();
        let layers = CostLayers::new(vec![layer(
            "landuse",
            0,
            LayerSource::Vector(vec![
                VectorFeature {
                    geometry: square(0.0, 20.0, 40.0, 40.0),
                    class: Some(ClassKey::Text("forest".to_string())),
                },
                VectorFeature {
                    geometry: square(0.0, 0.0, 40.0, 20.0),
                    class: Some(ClassKey::Text("marsh".to_string())),
                },
            ]),
            Remap::Classes(vec![(ClassKey::Text("forest".to_string()), 0.5)]),
        )])
        .unwrap();
        let cost = build_cost_surface(&ctx, &layers).unwrap();
        assert_eq!(cost.valid_count(), 6);
        assert_relative_eq!(cost.get(0, 0).unwrap(), 2.0);
        assert_eq!(cost.get(0, 2), None);
    }

    #[test]
    fn test_validation() {
        let shape = || square(0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            CostLayers::new(vec![
                uniform_vector("a", 0, shape(), 1.0),
                uniform_vector("b", 3, shape(), 1.0),
                uniform_vector("c", 3, shape(), 1.0),
            ])
            .unwrap_err(),
            ConfigError::DuplicateOrder(3)
        );
        assert_eq!(
            CostLayers::new(vec![
                uniform_vector("a", 0, shape(), 1.0),
                uniform_vector("b", 0, shape(), 1.0),
            ])
            .unwrap_err(),
            ConfigError::DuplicateOrder(0)
        );
        assert_eq!(
            CostLayers::new(vec![uniform_vector("a", 1, shape(), 1.0)]).unwrap_err(),
            ConfigError::MissingBase
        );
        assert_eq!(
            CostLayers::new(vec![uniform_vector("a", 21, shape(), 1.0)]).unwrap_err(),
            ConfigError::OrderRange(21)
        );
        assert_eq!(
            CostLayers::new(vec![uniform_vector("a", 0, shape(), 1.5)]).unwrap_err(),
            ConfigError::ScvRange {
                layer: "a".to_string(),
                scv: 1.5
            }
        );
        assert!(CostLayers::new(vec![uniform_vector("a", 0, shape(), f64::NAN)]).is_err());
    }

    #[test]
    fn test_quantize() {
        assert_relative_eq!(quantize(0.123_456), 0.1235);
        assert_relative_eq!(quantize(1.0), 1.0);
    }

    #[test]
    fn test_remap_json() {
        let remap: Remap =
            serde_json::from_str(r#"{"classes": [[11, 0.0], ["forest", 0.5]]}"#).unwrap();
        assert_eq!(
            remap,
            Remap::Classes(vec![
                (ClassKey::Int(11), 0.0),
                (ClassKey::Text("forest".to_string()), 0.5)
            ])
        );
    }
}
