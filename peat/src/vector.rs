//! GeoJSON polygon I/O.

use anyhow::{anyhow, Result};
use evac::{
    cost::{ClassKey, VectorFeature},
    polygonize::Region,
};
use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

/// Reads every polygon in a GeoJSON file as one multipolygon.
/// Non-areal geometries are ignored.
pub fn read_shape(path: &Path) -> Result<MultiPolygon<f64>> {
    let polygons = read_features(path, None)?
        .into_iter()
        .flat_map(|feature| feature.geometry.0)
        .collect();
    Ok(MultiPolygon::new(polygons))
}

/// Reads polygon features, taking each feature's class from the
/// `attribute` property.
pub fn read_features(path: &Path, attribute: Option<&str>) -> Result<Vec<VectorFeature>> {
    let file = BufReader::new(File::open(path)?);
    let features = match GeoJson::from_reader(file)? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };
    let mut out = Vec::with_capacity(features.len());
    for feature in features {
        let class = match attribute {
            Some(name) => feature.property(name).and_then(class_key),
            None => None,
        };
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry.value)
            .map_err(|e| anyhow!("{}: {e}", path.display()))?;
        let polygons = areal(geometry);
        if !polygons.is_empty() {
            out.push(VectorFeature {
                geometry: MultiPolygon::new(polygons),
                class,
            });
        }
    }
    Ok(out)
}

fn areal(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(multi) => multi.0,
        Geometry::GeometryCollection(collection) => {
            collection.0.into_iter().flat_map(areal).collect()
        }
        _ => Vec::new(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn class_key(value: &JsonValue) -> Option<ClassKey> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(ClassKey::Int)
            .or_else(|| Some(ClassKey::Text(n.to_string()))),
        JsonValue::String(s) => Some(ClassKey::Text(s.clone())),
        _ => None,
    }
}

/// Writes polygons without attributes.
pub fn write_polygons(path: &Path, polygons: &[Polygon<f64>]) -> Result<()> {
    let features = polygons
        .iter()
        .map(|polygon| feature(geojson::Value::from(polygon), JsonObject::new()))
        .collect();
    write(path, features)
}

/// Writes one feature per region, with the region's value mapped to
/// property `attribute`.
pub fn write_regions<F>(path: &Path, regions: &[Region], attribute: &str, value: F) -> Result<()>
where
    F: Fn(i32) -> JsonValue,
{
    let features = regions
        .iter()
        .map(|region| {
            let mut properties = JsonObject::new();
            properties.insert(attribute.to_owned(), value(region.value));
            feature(geojson::Value::from(&region.shape), properties)
        })
        .collect();
    write(path, features)
}

fn feature(value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn write(path: &Path, features: Vec<Feature>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let collection = GeoJson::from(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    fs::write(path, collection.to_string())?;
    Ok(())
}
