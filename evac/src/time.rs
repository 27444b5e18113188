use crate::{Accumulation, ConfigError, EvacError, ProcessingContext};
use grid::{Grid, NODATA_F64};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A walking speed in meters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Speed(f64);

impl Speed {
    pub fn new(meters_per_second: f64) -> Result<Self, ConfigError> {
        if meters_per_second.is_finite() && meters_per_second > 0.0 {
            Ok(Self(meters_per_second))
        } else {
            Err(ConfigError::InvalidSpeed(meters_per_second))
        }
    }

    pub fn meters_per_second(self) -> f64 {
        self.0
    }

    /// Speed in hundredths of a meter per second, as used by speed
    /// maps.
    #[allow(clippy::cast_possible_truncation)]
    pub fn code(self) -> i32 {
        (self.0 * 100.0).round() as i32
    }

    /// Filename-safe form: `0.89` is `0p89`, `10.0` is `10`.
    pub fn token(self) -> String {
        self.to_string().replace('.', "p")
    }

    pub fn from_token(token: &str) -> Result<Self, ConfigError> {
        token.replace('p', ".").parse()
    }
}

impl TryFrom<f64> for Speed {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

impl FromStr for Speed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidSpeed(f64::NAN))
            .and_then(Self::new)
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts accumulated cost (in cost-weighted linear units) to
/// minutes of travel at `speed`.
pub fn travel_time(
    acc: &Grid<f64>,
    speed: Speed,
    meters_per_unit: f64,
) -> Result<Grid<f64>, ConfigError> {
    if !(meters_per_unit.is_finite() && meters_per_unit > 0.0) {
        return Err(ConfigError::LinearUnit(None));
    }
    let units_per_second = speed.meters_per_second() / meters_per_unit;
    let seconds_per_unit = 1.0 / units_per_second;
    Ok(acc.par_map(NODATA_F64, |cost| Some(cost * seconds_per_unit / 60.0)))
}

/// Travel time grids for each of `speeds`, in the same order.
pub fn travel_times(
    ctx: &ProcessingContext,
    acc: &Accumulation,
    speeds: &[Speed],
) -> Result<Vec<(Speed, Grid<f64>)>, EvacError> {
    if speeds.is_empty() {
        return Err(ConfigError::EmptySpeeds.into());
    }
    ctx.check(&acc.cost)?;
    let now = std::time::Instant::now();
    let surfaces = speeds
        .par_iter()
        .map(|&speed| {
            let time = travel_time(&acc.cost, speed, ctx.meters_per_unit())?;
            debug!(
                "{speed} m/s: max {:.2} min",
                time.max().unwrap_or(f64::NAN)
            );
            Ok((speed, time))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    info!("{} travel time surfaces in {:?}", surfaces.len(), now.elapsed());
    Ok(surfaces)
}

/// Caps travel times at `max_minutes` when the surface's largest
/// value rounds up past it. Returns whether anything changed.
pub fn clamp_outliers(time: &mut Grid<f64>, max_minutes: f64) -> Result<bool, ConfigError> {
    if !(max_minutes.is_finite() && max_minutes > 0.0) {
        return Err(ConfigError::MaxTime(max_minutes));
    }
    let Some(max) = time.max() else {
        return Ok(false);
    };
    if max.ceil() <= max_minutes {
        return Ok(false);
    }
    let mut clamped = 0_usize;
    for idx in 0..time.len() {
        if matches!(time.get_index(idx), Some(t) if t > max_minutes) {
            time.set_index(idx, max_minutes);
            clamped += 1;
        }
    }
    info!("clamped {clamped} cells from up to {max:.2} to {max_minutes} minutes");
    Ok(clamped > 0)
}

#[cfg(test)]
mod tests {
    use super::{clamp_outliers, travel_time, Speed};
    use crate::ConfigError;
    use approx::assert_relative_eq;
    use grid::{geo::Coord, Grid, GridSpec, SpatialRef, NODATA_F64};

    fn grid(cells: Vec<f64>) -> Grid<f64> {
        let spec = GridSpec::new(
            cells.len(),
            1,
            1.0,
            Coord { x: 0.0, y: 1.0 },
            SpatialRef::projected("utm", "Meter"),
        );
        Grid::from_vec(spec, NODATA_F64, cells).unwrap()
    }

    #[test]
    fn test_doubling_speed_halves_time() {
        let acc = grid(vec![0.0, 120.0, NODATA_F64, 5_000.5]);
        let slow = travel_time(&acc, Speed::new(0.89).unwrap(), 1.0).unwrap();
        let fast = travel_time(&acc, Speed::new(1.78).unwrap(), 1.0).unwrap();
        for idx in 0..acc.len() {
            match (slow.get_index(idx), fast.get_index(idx)) {
                (Some(s), Some(f)) => assert_relative_eq!(f, s / 2.0, max_relative = 1e-12),
                (None, None) => {}
                other => panic!("nodata mismatch at {idx}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_units() {
        // 600 m at 1 m/s is 10 minutes.
        let meters = travel_time(&grid(vec![600.0]), Speed::new(1.0).unwrap(), 1.0).unwrap();
        assert_relative_eq!(meters.get(0, 0).unwrap(), 10.0);
        // 600 ft at 1 m/s.
        let feet = travel_time(&grid(vec![600.0]), Speed::new(1.0).unwrap(), 0.3048).unwrap();
        assert_relative_eq!(feet.get(0, 0).unwrap(), 10.0 * 0.3048, max_relative = 1e-12);
        assert_eq!(
            travel_time(&grid(vec![1.0]), Speed::new(1.0).unwrap(), 0.0).unwrap_err(),
            ConfigError::LinearUnit(None)
        );
    }

    #[test]
    fn test_speed() {
        assert!(Speed::new(0.0).is_err());
        assert!(Speed::new(-1.0).is_err());
        assert!(Speed::new(f64::INFINITY).is_err());
        let speed: Speed = " 0.89".parse().unwrap();
        assert_eq!(speed.code(), 89);
        assert_eq!(speed.token(), "0p89");
        assert_eq!(Speed::from_token("0p89").unwrap(), speed);
        assert_eq!(Speed::new(10.0).unwrap().token(), "10");
        assert_eq!(Speed::new(1.52).unwrap().code(), 152);
        assert!("fast".parse::<Speed>().is_err());
        let json: Vec<Speed> = serde_json::from_str("[0.89, 1.22]").unwrap();
        assert_eq!(json[1].code(), 122);
        assert!(serde_json::from_str::<Speed>("-1").is_err());
    }

    #[test]
    fn test_clamp_outliers() {
        let mut time = grid(vec![10.0, 60.5, NODATA_F64, 75.0]);
        assert!(clamp_outliers(&mut time, 60.0).unwrap());
        assert_eq!(time.cells(), &[10.0, 60.0, NODATA_F64, 60.0]);

        let mut time = grid(vec![10.0, 59.5]);
        assert!(!clamp_outliers(&mut time, 60.0).unwrap());
        assert_eq!(time.cells(), &[10.0, 59.5]);

        assert!(clamp_outliers(&mut time, 0.0).is_err());
    }
}
