use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Display units for speed. Internal canonical unit is always m/s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    Kmh,
    Mph,
    Knots,
}

impl SpeedUnit {
    /// Conversion factor from m/s to this unit
    pub fn factor(&self) -> f64 {
        match self {
            SpeedUnit::Kmh => 3.6,
            SpeedUnit::Mph => 2.237,
            SpeedUnit::Knots => 1.944,
        }
    }

    /// Convert a speed in m/s into this unit
    pub fn convert(&self, speed_ms: f64) -> f64 {
        speed_ms * self.factor()
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::Kmh => "km/h",
            SpeedUnit::Mph => "mph",
            SpeedUnit::Knots => "kn",
        }
    }

    /// Gauge ceiling used by the presentation layer
    pub fn gauge_max(&self) -> f64 {
        match self {
            SpeedUnit::Kmh => 200.0,
            SpeedUnit::Mph => 125.0,
            SpeedUnit::Knots => 108.0,
        }
    }
}

impl Display for SpeedUnit {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SpeedUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kmh" | "km/h" => Ok(SpeedUnit::Kmh),
            "mph" => Ok(SpeedUnit::Mph),
            "knots" | "kn" => Ok(SpeedUnit::Knots),
            other => Err(format!("unknown speed unit: {}", other)),
        }
    }
}

/// Format a distance in meters for display: "842 m" or "1.24 km"
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_conversion_factors() {
        assert_relative_eq!(SpeedUnit::Kmh.convert(10.0), 36.0);
        assert_relative_eq!(SpeedUnit::Mph.convert(10.0), 22.37, max_relative = 1e-12);
        assert_relative_eq!(SpeedUnit::Knots.convert(10.0), 19.44, max_relative = 1e-12);
    }

    #[test]
    fn test_gauge_ceilings() {
        assert_eq!(SpeedUnit::Kmh.gauge_max(), 200.0);
        assert_eq!(SpeedUnit::Mph.gauge_max(), 125.0);
        assert_eq!(SpeedUnit::Knots.gauge_max(), 108.0);
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("kmh".parse::<SpeedUnit>().unwrap(), SpeedUnit::Kmh);
        assert_eq!("MPH".parse::<SpeedUnit>().unwrap(), SpeedUnit::Mph);
        assert_eq!("knots".parse::<SpeedUnit>().unwrap(), SpeedUnit::Knots);
        assert!("furlongs".parse::<SpeedUnit>().is_err());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(842.3), "842 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1240.0), "1.24 km");
        assert_eq!(format_distance(0.0), "0 m");
    }
}
