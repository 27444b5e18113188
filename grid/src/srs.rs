use serde::{Deserialize, Serialize};
use std::fmt;

/// A spatial reference, reduced to what the evacuation pipeline
/// needs: a name to compare by, and the linear unit (if any).
///
/// A `None` linear unit means the coordinate system is geographic
/// (angular units), in which case distances are meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialRef {
    pub name: String,

    pub linear_unit: Option<String>,

    /// Source WKT text, kept so `.prj` sidecars round-trip
    /// untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl SpatialRef {
    pub fn projected(name: impl Into<String>, linear_unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linear_unit: Some(linear_unit.into()),
            wkt: None,
        }
    }

    pub fn geographic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linear_unit: None,
            wkt: None,
        }
    }

    /// Placeholder for rasters that carry no `.prj` sidecar.
    pub fn unknown() -> Self {
        Self::geographic("Unknown")
    }

    pub fn is_geographic(&self) -> bool {
        self.linear_unit.is_none()
    }

    /// Parses the name and linear unit out of an ESRI-style WKT
    /// string.
    ///
    /// Only the outermost `PROJCS`/`GEOGCS` name and the last `UNIT`
    /// of a `PROJCS` are looked at; everything else is carried along
    /// verbatim.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let wkt = wkt.trim();
        let projected = if wkt.starts_with("PROJCS[") {
            true
        } else if wkt.starts_with("GEOGCS[") {
            false
        } else {
            return None;
        };
        let name = first_quoted(&wkt[7..])?.to_string();
        let linear_unit = if projected {
            let idx = wkt.rfind("UNIT[")?;
            Some(first_quoted(&wkt[idx + 5..])?.to_string())
        } else {
            None
        };
        Some(Self {
            name,
            linear_unit,
            wkt: Some(wkt.to_string()),
        })
    }

    pub fn to_wkt(&self) -> String {
        if let Some(wkt) = &self.wkt {
            return wkt.clone();
        }
        match &self.linear_unit {
            Some(unit) => format!("PROJCS[\"{}\",UNIT[\"{unit}\"]]", self.name),
            None => format!("GEOGCS[\"{}\",UNIT[\"Degree\",0.0174532925199433]]", self.name),
        }
    }
}

/// Spatial references are compared by name and unit, never by WKT
/// formatting.
impl PartialEq for SpatialRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.linear_unit == other.linear_unit
    }
}

impl Eq for SpatialRef {}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.linear_unit {
            Some(unit) => write!(f, "{} ({unit})", self.name),
            None => write!(f, "{} (geographic)", self.name),
        }
    }
}

fn first_quoted(s: &str) -> Option<&str> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(&s[start..start + len])
}
