/// Known linear units and their length in meters.
///
/// Checked in order against the spatial reference's unit name, so
/// `Foot_US` matches `Foot`.
const LINEAR_UNITS: &[(&str, f64)] = &[
    ("Meter", 1.0),
    ("Foot", 0.3048),
    ("50_Kilometers", 50_000.0),
    ("Chain", 20.1168),
    ("Yard", 0.9144),
    ("Link", 0.201_168),
];

/// Returns the number of meters in one `unit`, or `None` when the
/// unit is not recognized.
pub fn meters_per_unit(unit: &str) -> Option<f64> {
    LINEAR_UNITS
        .iter()
        .find(|(name, _)| unit.contains(name))
        .map(|&(_, meters)| meters)
}
