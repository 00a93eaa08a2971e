use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::time::Instant;

/// Coordinate delta (degrees, either axis) below which the device has not
/// plausibly moved to a different street. ~50 m at mid-latitudes; kept as a
/// fixed linear threshold regardless of latitude.
pub const MOVEMENT_THRESHOLD_DEG: f64 = 0.0005;

/// Quiet period after the last qualifying coordinate before a lookup fires,
/// coalescing bursts of fixes and respecting Nominatim rate limits.
pub const LOOKUP_DEBOUNCE: Duration = Duration::from_secs(2);

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lookup errors from the reverse geocoding service
#[derive(Debug, Clone)]
pub enum GeocodeError {
    Http(u16),
    Network(String),
    Parse(String),
    NoData,
}

impl Display for GeocodeError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            GeocodeError::Http(code) => write!(f, "HTTP error: {}", code),
            GeocodeError::Network(msg) => write!(f, "Network error: {}", msg),
            GeocodeError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GeocodeError::NoData => write!(f, "No address returned"),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// Resolved human-readable address for a coordinate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressData {
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub full_address: Option<String>,
}

/// Raw Nominatim `address` object; field names vary by locale and feature
/// type, so every candidate is optional.
#[derive(Debug, Default, Deserialize)]
struct RawAddress {
    road: Option<String>,
    pedestrian: Option<String>,
    footway: Option<String>,
    path: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<RawAddress>,
}

fn extract_address(raw: RawAddress) -> AddressData {
    let street = raw.road.or(raw.pedestrian).or(raw.footway).or(raw.path);
    let neighborhood = raw.suburb.or(raw.neighbourhood).or(raw.district);
    let city = raw.city.or(raw.town).or(raw.village).or(raw.municipality);
    let state = raw.state;

    let parts: Vec<&str> = [&street, &neighborhood, &city]
        .iter()
        .filter_map(|p| p.as_deref())
        .collect();
    let full_address = if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    };

    AddressData {
        street,
        neighborhood,
        city,
        state,
        full_address,
    }
}

/// Nominatim reverse geocoding client
///
/// # Request Shape
/// - `GET {base}/reverse?format=json&lat=..&lon=..&zoom=18&addressdetails=1`
/// - Street-level zoom with address detail expansion
/// - Identifying User-Agent (Nominatim usage policy) and pt-BR language
///   preference
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("SpeedTrackerApp/0.1.0")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        NominatimClient {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Resolve one coordinate to an address.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressData, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .header("Accept-Language", "pt-BR,pt")
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Http(status.as_u16()));
        }

        let parsed: ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        match parsed.address {
            Some(raw) => Ok(extract_address(raw)),
            None => Err(GeocodeError::NoData),
        }
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingLookup {
    latitude: f64,
    longitude: f64,
    due: Instant,
}

/// A lookup taken off the pending slot, tagged with the generation it
/// belongs to so an out-of-order completion can be discarded.
#[derive(Clone, Copy, Debug)]
pub struct LookupTicket {
    pub generation: u64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Debounces and rate-limits reverse geocoding for a coordinate stream.
///
/// Each qualifying coordinate restarts the debounce window and bumps the
/// generation counter; only the newest pending coordinate ever reaches the
/// network, and completions for superseded generations are dropped
/// (last-coordinate-wins). Lookup failures keep the previous address.
pub struct GeocodeCoordinator {
    client: NominatimClient,
    debounce: Duration,
    pending: Option<PendingLookup>,
    generation: u64,
    last_resolved: Option<(f64, f64)>,
    address: AddressData,
    is_loading: bool,
    error: Option<String>,
}

impl GeocodeCoordinator {
    pub fn new(client: NominatimClient) -> Self {
        GeocodeCoordinator {
            client,
            debounce: LOOKUP_DEBOUNCE,
            pending: None,
            generation: 0,
            last_resolved: None,
            address: AddressData::default(),
            is_loading: false,
            error: None,
        }
    }

    pub fn address(&self) -> &AddressData {
        &self.address
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a coordinate clears the movement gate relative to the last
    /// successfully resolved coordinate.
    fn qualifies(&self, latitude: f64, longitude: f64) -> bool {
        match self.last_resolved {
            None => true,
            Some((lat, lon)) => {
                let lat_diff = (latitude - lat).abs();
                let lon_diff = (longitude - lon).abs();
                !(lat_diff < MOVEMENT_THRESHOLD_DEG && lon_diff < MOVEMENT_THRESHOLD_DEG)
            }
        }
    }

    /// Feed the current coordinate. A null pair does nothing; a coordinate
    /// inside the movement gate does nothing; a qualifying one (re)arms the
    /// debounce timer and supersedes any earlier pending coordinate.
    pub fn push_position(&mut self, latitude: Option<f64>, longitude: Option<f64>, now: Instant) {
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return,
        };
        if !self.qualifies(latitude, longitude) {
            return;
        }
        self.generation += 1;
        self.pending = Some(PendingLookup {
            latitude,
            longitude,
            due: now + self.debounce,
        });
    }

    /// When the event loop should wake up to service a pending lookup.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Take the pending lookup if its debounce window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<LookupTicket> {
        let pending = self.pending?;
        if now < pending.due {
            return None;
        }
        self.pending = None;
        self.is_loading = true;
        self.error = None;
        Some(LookupTicket {
            generation: self.generation,
            latitude: pending.latitude,
            longitude: pending.longitude,
        })
    }

    /// Apply a completed lookup. Completions whose generation no longer
    /// matches the newest push are stale and dropped.
    pub fn apply(&mut self, ticket: LookupTicket, result: Result<AddressData, GeocodeError>) {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding stale geocode result for generation {} (current {})",
                ticket.generation,
                self.generation
            );
            return;
        }
        self.is_loading = false;
        match result {
            Ok(address) => {
                self.address = address;
                self.last_resolved = Some((ticket.latitude, ticket.longitude));
                self.error = None;
            }
            Err(e) => {
                // Previous address stays; the next qualifying movement
                // retries naturally.
                log::warn!("reverse geocode failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Service a due lookup end to end: dispatch the request and fold the
    /// completion back in.
    pub async fn service(&mut self, now: Instant) {
        if let Some(ticket) = self.take_due(now) {
            let result = self.client.reverse(ticket.latitude, ticket.longitude).await;
            self.apply(ticket, result);
        }
    }
}
