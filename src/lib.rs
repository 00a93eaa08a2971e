//! Real-time speed and distance tracking engine.
//!
//! Subscribes to a continuous stream of position fixes, filters and
//! accumulates them into a trustworthy distance total, derives display
//! speed, coordinates debounced reverse-geocode lookups, and drives a
//! speed-limit alert state machine with a rate-limited synthesized tone.
//! Presentation layers consume [`tracker::TrackingState`],
//! [`geocode::AddressData`] and [`status::StatusSnapshot`] as passive
//! values.

pub mod alert;
pub mod distance;
pub mod geocode;
pub mod provider;
pub mod status;
pub mod tone;
pub mod tracker;
pub mod units;

pub use alert::SpeedAlert;
pub use distance::{haversine_distance, DistanceTracker};
pub use geocode::{AddressData, GeocodeCoordinator, NominatimClient};
pub use provider::{LocationProvider, PositionFix, SimulatedProvider, WatchEvent, WatchOptions};
pub use status::StatusSnapshot;
pub use tone::{TonePlayer, ToneSynth};
pub use tracker::{SpeedTracker, TrackError, TrackingState};
pub use units::SpeedUnit;
