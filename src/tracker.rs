use crate::distance::DistanceTracker;
use crate::provider::{LocationProvider, WatchEvent, WatchOptions};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;

/// User-facing message when the host exposes no location capability.
pub const UNSUPPORTED_MESSAGE: &str = "Geolocalização não suportada pelo dispositivo";

/// Errors from the tracking lifecycle
#[derive(Debug, Clone)]
pub enum TrackError {
    /// No location capability on this host; tracking never starts.
    CapabilityUnavailable,
    /// The active subscription reported a failure.
    Subscription(String),
}

impl Display for TrackError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TrackError::CapabilityUnavailable => write!(f, "{}", UNSUPPORTED_MESSAGE),
            TrackError::Subscription(msg) => write!(f, "Subscription error: {}", msg),
        }
    }
}

impl std::error::Error for TrackError {}

/// Aggregate tracking state exposed to presentation consumers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackingState {
    /// Current speed in m/s, never negative.
    pub speed: f64,
    /// Cumulative distance in meters; only decreases on explicit reset.
    pub distance: f64,
    pub accuracy: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub error: Option<String>,
    pub is_tracking: bool,
}

struct Watch {
    handle: JoinHandle<()>,
    rx: Receiver<WatchEvent>,
}

/// Position stream controller: owns the subscription lifecycle, normalizes
/// raw fixes into [`TrackingState`] and feeds the distance accumulator.
///
/// Two states: Idle (`is_tracking == false`, no watch task) and Tracking.
/// All mutation happens on the caller's event loop; nothing here needs a
/// lock.
pub struct SpeedTracker {
    state: TrackingState,
    distance: DistanceTracker,
    watch: Option<Watch>,
}

impl SpeedTracker {
    pub fn new() -> Self {
        SpeedTracker {
            state: TrackingState::default(),
            distance: DistanceTracker::new(),
            watch: None,
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    /// Idle -> Tracking. Fails without side effects (beyond the recorded
    /// error message) when the provider reports no capability.
    pub fn start(
        &mut self,
        provider: &dyn LocationProvider,
        options: WatchOptions,
    ) -> Result<(), TrackError> {
        if !provider.available() {
            self.state.error = Some(UNSUPPORTED_MESSAGE.to_string());
            return Err(TrackError::CapabilityUnavailable);
        }
        if self.watch.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<WatchEvent>(100);
        let handle = provider.watch(options, tx);
        self.watch = Some(Watch { handle, rx });
        self.state.is_tracking = true;
        self.state.error = None;
        Ok(())
    }

    /// Tracking -> Idle. Distance and last known values are left untouched;
    /// only the subscription is torn down.
    pub fn stop(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.handle.abort();
        }
        self.state.is_tracking = false;
    }

    /// Clear the accumulated distance in either state.
    pub fn reset_distance(&mut self) {
        self.distance.reset();
        self.state.distance = 0.0;
    }

    /// Await the next watch event and fold it into the state. Returns false
    /// once tracking has ended (not tracking, or the watch channel closed).
    pub async fn poll_event(&mut self) -> bool {
        let event = match self.watch.as_mut() {
            Some(watch) => watch.rx.recv().await,
            None => return false,
        };
        match event {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => {
                // Provider loop ended without an explicit error
                self.fail_subscription("position stream ended".to_string());
                false
            }
        }
    }

    /// Apply one watch event. Public so tests and alternative event loops
    /// can drive the controller without a channel.
    pub fn handle_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Fix(fix) => {
                if !self.state.is_tracking {
                    return;
                }
                // Never surface a negative or missing speed
                let speed = match fix.speed {
                    Some(s) if s >= 0.0 => s,
                    _ => 0.0,
                };
                self.distance.record(fix.latitude, fix.longitude, fix.accuracy);

                self.state.speed = speed;
                self.state.distance = self.distance.total_m();
                self.state.accuracy = fix.accuracy;
                self.state.latitude = Some(fix.latitude);
                self.state.longitude = Some(fix.longitude);
                self.state.error = None;
            }
            WatchEvent::Error(message) => {
                log::warn!("position subscription error: {}", message);
                self.fail_subscription(message);
            }
        }
    }

    fn fail_subscription(&mut self, message: String) {
        if let Some(watch) = self.watch.take() {
            watch.handle.abort();
        }
        self.state.error = Some(message);
        self.state.is_tracking = false;
    }
}

impl Default for SpeedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpeedTracker {
    fn drop(&mut self) {
        // A live subscription must not keep polling after the owner is gone
        if let Some(watch) = self.watch.take() {
            watch.handle.abort();
        }
    }
}
