//! Direction-dependent multipliers applied to each step of the
//! accumulated cost search.
//!
//! A factor of `None` means the step is impassable.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Multiplier as a function of the vertical relative moving angle:
/// `atan(Δz / horizontal distance)` in degrees, positive uphill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalFactor {
    /// Slope is ignored.
    None,

    /// `zero_factor` strictly between the cut angles, impassable
    /// elsewhere.
    Binary {
        zero_factor: f64,
        low_cut: f64,
        high_cut: f64,
    },

    /// `zero_factor + slope × angle` strictly between the cut angles.
    /// Non-positive factors are impassable.
    Linear {
        zero_factor: f64,
        low_cut: f64,
        high_cut: f64,
        slope: f64,
    },

    /// `(angle, factor)` rows sorted by angle, linearly interpolated.
    /// Angles outside the table are impassable.
    Table(Vec<(f64, f64)>),

    /// Tobler's hiking function relative to walking on flat ground.
    Tobler { low_cut: f64, high_cut: f64 },
}

impl Default for VerticalFactor {
    fn default() -> Self {
        VerticalFactor::Tobler {
            low_cut: -90.0,
            high_cut: 90.0,
        }
    }
}

impl VerticalFactor {
    /// Parses an ESRI vertical factor table: one `angle factor` pair
    /// per line, separated by whitespace or a comma.
    pub fn parse_table(text: &str) -> Result<Self, ConfigError> {
        let mut rows = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty());
            let mut next = || -> Result<f64, ConfigError> {
                fields
                    .next()
                    .and_then(|f| f.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        ConfigError::VerticalTable(format!("line {}: {line:?}", lineno + 1))
                    })
            };
            let angle = next()?;
            let factor = next()?;
            rows.push((angle, factor));
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        if rows.len() < 2 {
            return Err(ConfigError::VerticalTable(
                "at least two rows are required".to_string(),
            ));
        }
        if rows.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(ConfigError::VerticalTable("repeated angle".to_string()));
        }
        Ok(VerticalFactor::Table(rows))
    }

    /// Rejects settings that could make a step cost negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Factor {
            kind: "vertical",
            reason,
        };
        match *self {
            VerticalFactor::None | VerticalFactor::Tobler { .. } => Ok(()),
            VerticalFactor::Binary { zero_factor, .. } => {
                check_zero_factor(zero_factor).map_err(invalid)
            }
            VerticalFactor::Linear {
                zero_factor, slope, ..
            } => {
                check_zero_factor(zero_factor).map_err(invalid)?;
                if slope.is_finite() {
                    Ok(())
                } else {
                    Err(invalid(format!("slope {slope} is not finite")))
                }
            }
            VerticalFactor::Table(ref rows) => {
                match rows.iter().find(|(a, f)| !a.is_finite() || !f.is_finite()) {
                    Some((angle, factor)) => {
                        Err(invalid(format!("row ({angle}, {factor}) is not finite")))
                    }
                    None => Ok(()),
                }
            }
        }
    }

    pub fn factor(&self, angle: f64) -> Option<f64> {
        let within = |low: f64, high: f64| angle > low && angle < high;
        match *self {
            VerticalFactor::None => Some(1.0),
            VerticalFactor::Binary {
                zero_factor,
                low_cut,
                high_cut,
            } => within(low_cut, high_cut).then_some(zero_factor),
            VerticalFactor::Linear {
                zero_factor,
                low_cut,
                high_cut,
                slope,
            } => {
                let factor = zero_factor + slope * angle;
                (within(low_cut, high_cut) && factor > 0.0).then_some(factor)
            }
            VerticalFactor::Table(ref rows) => interpolate(rows, angle),
            VerticalFactor::Tobler { low_cut, high_cut } => within(low_cut, high_cut)
                .then(|| (3.5 * ((angle.to_radians().tan() + 0.05).abs() - 0.05)).exp()),
        }
    }
}

fn check_zero_factor(zero_factor: f64) -> Result<(), String> {
    if zero_factor.is_finite() && zero_factor >= 0.0 {
        Ok(())
    } else {
        Err(format!("zero factor {zero_factor} must be finite and non-negative"))
    }
}

fn interpolate(rows: &[(f64, f64)], angle: f64) -> Option<f64> {
    let upper = rows.iter().position(|&(a, _)| a >= angle)?;
    let (a1, f1) = rows[upper];
    let factor = if a1 == angle {
        f1
    } else {
        let (a0, f0) = rows[upper.checked_sub(1)?];
        f0 + (f1 - f0) * (angle - a0) / (a1 - a0)
    };
    (factor.is_finite() && factor >= 0.0).then_some(factor)
}

/// Multiplier as a function of the horizontal relative moving
/// angle: the difference between the travel heading and a fixed
/// horizontal direction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalFactor {
    /// Heading is ignored.
    #[default]
    Isotropic,

    /// `zero_factor` when the heading is within `cut_angle` degrees of
    /// `direction` (clockwise from north), impassable otherwise.
    Binary {
        zero_factor: f64,
        cut_angle: f64,
        direction: f64,
    },
}

impl HorizontalFactor {
    /// Rejects settings that could make a step cost negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            HorizontalFactor::Isotropic => Ok(()),
            HorizontalFactor::Binary { zero_factor, .. } => {
                check_zero_factor(zero_factor).map_err(|reason| ConfigError::Factor {
                    kind: "horizontal",
                    reason,
                })
            }
        }
    }

    pub fn factor(&self, heading: f64) -> Option<f64> {
        match *self {
            HorizontalFactor::Isotropic => Some(1.0),
            HorizontalFactor::Binary {
                zero_factor,
                cut_angle,
                direction,
            } => {
                let diff = (heading - direction).rem_euclid(360.0);
                let hrma = diff.min(360.0 - diff);
                (hrma < cut_angle).then_some(zero_factor)
            }
        }
    }
}

/// Which way slope and heading are measured along each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    /// Moving away from the safe zone.
    #[default]
    FromSource,

    /// Moving toward the safe zone.
    ToSource,
}

#[cfg(test)]
mod tests {
    use super::{HorizontalFactor, VerticalFactor};
    use crate::ConfigError;
    use approx::assert_relative_eq;

    #[test]
    fn test_tobler() {
        let tobler = VerticalFactor::default();
        assert_relative_eq!(tobler.factor(0.0).unwrap(), 1.0);
        // Fastest on a gentle downhill.
        let best = (-0.05_f64).atan().to_degrees();
        assert_relative_eq!(tobler.factor(best).unwrap(), (-0.175_f64).exp());
        assert!(tobler.factor(10.0).unwrap() > tobler.factor(5.0).unwrap());
        assert!(tobler.factor(-10.0).unwrap() > 1.0);
        assert_eq!(tobler.factor(90.0), None);
    }

    #[test]
    fn test_binary_cuts_are_exclusive() {
        let vf = VerticalFactor::Binary {
            zero_factor: 2.0,
            low_cut: -30.0,
            high_cut: 30.0,
        };
        assert_eq!(vf.factor(0.0), Some(2.0));
        assert_eq!(vf.factor(29.9), Some(2.0));
        assert_eq!(vf.factor(30.0), None);
        assert_eq!(vf.factor(-45.0), None);
    }

    #[test]
    fn test_linear() {
        let vf = VerticalFactor::Linear {
            zero_factor: 1.0,
            low_cut: -90.0,
            high_cut: 90.0,
            slope: 0.1,
        };
        assert_relative_eq!(vf.factor(10.0).unwrap(), 2.0);
        assert_eq!(vf.factor(-10.0), None);
    }

    #[test]
    fn test_table() {
        let vf = VerticalFactor::parse_table(
            "# angle, factor\n 10, 3.0\n-10 2.0\n\n0,1.0\n",
        )
        .unwrap();
        assert_eq!(
            vf,
            VerticalFactor::Table(vec![(-10.0, 2.0), (0.0, 1.0), (10.0, 3.0)])
        );
        assert_relative_eq!(vf.factor(-10.0).unwrap(), 2.0);
        assert_relative_eq!(vf.factor(-5.0).unwrap(), 1.5);
        assert_relative_eq!(vf.factor(2.5).unwrap(), 1.5);
        assert_eq!(vf.factor(10.5), None);
        assert_eq!(vf.factor(-11.0), None);
    }

    #[test]
    fn test_bad_tables() {
        assert!(VerticalFactor::parse_table("0 1").is_err());
        assert!(VerticalFactor::parse_table("0 1\nten 2").is_err());
        assert!(VerticalFactor::parse_table("0 1\n0 2").is_err());
        assert!(VerticalFactor::parse_table("0 1\n5").is_err());
    }

    #[test]
    fn test_horizontal_binary() {
        let hf = HorizontalFactor::Binary {
            zero_factor: 1.0,
            cut_angle: 45.0,
            direction: 350.0,
        };
        assert_eq!(hf.factor(0.0), Some(1.0));
        assert_eq!(hf.factor(20.0), Some(1.0));
        assert_eq!(hf.factor(45.0), None);
        assert_eq!(HorizontalFactor::Isotropic.factor(123.0), Some(1.0));
    }

    #[test]
    fn test_negative_factors_are_rejected() {
        let vf = VerticalFactor::Binary {
            zero_factor: -1.0,
            low_cut: -30.0,
            high_cut: 30.0,
        };
        assert!(matches!(
            vf.validate(),
            Err(ConfigError::Factor { kind: "vertical", .. })
        ));
        let vf = VerticalFactor::Linear {
            zero_factor: 1.0,
            low_cut: -90.0,
            high_cut: 90.0,
            slope: f64::NAN,
        };
        assert!(vf.validate().is_err());
        let hf = HorizontalFactor::Binary {
            zero_factor: -2.0,
            cut_angle: 45.0,
            direction: 0.0,
        };
        assert!(matches!(
            hf.validate(),
            Err(ConfigError::Factor { kind: "horizontal", .. })
        ));
        assert_eq!(VerticalFactor::default().validate(), Ok(()));
        assert_eq!(HorizontalFactor::Isotropic.validate(), Ok(()));
        let zero = VerticalFactor::Binary {
            zero_factor: 0.0,
            low_cut: -30.0,
            high_cut: 30.0,
        };
        assert_eq!(zero.validate(), Ok(()));
    }

    #[test]
    fn test_json() {
        let vf: VerticalFactor =
            serde_json::from_str(r#"{"tobler": {"low_cut": -60, "high_cut": 60}}"#).unwrap();
        assert_eq!(
            vf,
            VerticalFactor::Tobler {
                low_cut: -60.0,
                high_cut: 60.0
            }
        );
        let vf: VerticalFactor = serde_json::from_str(r#""none""#).unwrap();
        assert_eq!(vf, VerticalFactor::None);
    }
}
