/// Horizontal accuracy above which a fix is too noisy to trust for
/// distance accumulation (meters, strict).
pub const MAX_TRUSTED_ACCURACY_M: f64 = 50.0;

/// Minimum movement between accepted fixes before a delta counts as real
/// displacement rather than GPS jitter (meters, strict). Consumer GPS
/// noise floor is typically 3-15 m while stationary.
pub const MIN_MOVEMENT_M: f64 = 2.0;

/// Great-circle distance in meters between two lat/lon pairs.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const R: f64 = 6_371_000.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    R * c
}

/// Running distance total with jitter rejection.
///
/// A delta is added to the total only when a previous position exists, the
/// fix accuracy is better than [`MAX_TRUSTED_ACCURACY_M`], and the computed
/// movement exceeds [`MIN_MOVEMENT_M`]. The last position is remembered on
/// every fix so a string of rejected fixes does not accumulate into one
/// large phantom jump.
#[derive(Debug, Default)]
pub struct DistanceTracker {
    total_m: f64,
    last_position: Option<(f64, f64)>,
}

impl DistanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fix; returns the increment added (0.0 when rejected).
    pub fn record(&mut self, latitude: f64, longitude: f64, accuracy_m: f64) -> f64 {
        let mut added = 0.0;
        if let Some((last_lat, last_lon)) = self.last_position {
            let delta = haversine_distance(last_lat, last_lon, latitude, longitude);
            if accuracy_m < MAX_TRUSTED_ACCURACY_M && delta > MIN_MOVEMENT_M {
                self.total_m += delta;
                added = delta;
            }
        }
        self.last_position = Some((latitude, longitude));
        added
    }

    pub fn total_m(&self) -> f64 {
        self.total_m
    }

    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.last_position
    }

    /// Zero the total and forget the last position. Valid in any state.
    pub fn reset(&mut self) {
        self.total_m = 0.0;
        self.last_position = None;
    }
}
