use crate::units::{format_distance, SpeedUnit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Read-only snapshot published for presentation consumers (dashboard,
/// gauge, stats cards). Written periodically as pretty JSON.
#[derive(Serialize, Deserialize, Clone)]
pub struct StatusSnapshot {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    pub is_tracking: bool,
    // Speed
    pub speed_ms: f64,
    pub speed_display: f64,
    pub max_speed_display: f64,
    pub unit: String,
    // Distance / position
    pub distance_m: f64,
    pub distance_display: String,
    pub accuracy_m: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_count: u64,
    // Address
    pub street: Option<String>,
    pub full_address: Option<String>,
    pub address_loading: bool,
    pub address_error: Option<String>,
    // Alert
    pub speed_limit: Option<f64>,
    pub over_limit: bool,
    pub overshoot: f64,
    // Errors
    pub tracker_error: Option<String>,
}

impl StatusSnapshot {
    pub fn new(unit: SpeedUnit) -> Self {
        Self {
            timestamp: current_timestamp(),
            uptime_seconds: 0,
            is_tracking: false,
            speed_ms: 0.0,
            speed_display: 0.0,
            max_speed_display: 0.0,
            unit: unit.label().to_string(),
            distance_m: 0.0,
            distance_display: format_distance(0.0),
            accuracy_m: 0.0,
            latitude: None,
            longitude: None,
            fix_count: 0,
            street: None,
            full_address: None,
            address_loading: false,
            address_error: None,
            speed_limit: None,
            over_limit: false,
            overshoot: 0.0,
            tracker_error: None,
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = StatusSnapshot::new(SpeedUnit::Kmh);
        assert_eq!(snapshot.unit, "km/h");
        assert_eq!(snapshot.distance_display, "0 m");
        assert!(!snapshot.is_tracking);
        assert!(snapshot.latitude.is_none());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut snapshot = StatusSnapshot::new(SpeedUnit::Mph);
        snapshot.speed_ms = 12.5;
        snapshot.speed_display = SpeedUnit::Mph.convert(12.5);
        snapshot.distance_m = 1532.0;
        snapshot.distance_display = format_distance(1532.0);
        snapshot.latitude = Some(-23.5505);
        snapshot.over_limit = true;
        snapshot.overshoot = 7.0;

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.speed_ms, 12.5);
        assert_eq!(back.distance_display, "1.53 km");
        assert_eq!(back.latitude, Some(-23.5505));
        assert!(back.over_limit);
        assert_eq!(back.overshoot, 7.0);
    }
}
