use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// One raw position sample from a location source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported ground speed in m/s; None when the source has no estimate.
    pub speed: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
}

/// Subscription parameters for a continuous watch.
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// A fix must arrive within this window or the watch reports an error.
    pub timeout: Duration,
    /// Maximum age of a cached fix the source may deliver. Zero = live only.
    pub max_fix_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_fix_age: Duration::ZERO,
        }
    }
}

/// Events delivered over an active watch channel.
#[derive(Clone, Debug)]
pub enum WatchEvent {
    Fix(PositionFix),
    Error(String),
}

/// A continuous position source. Fixes are delivered in temporal order on
/// the channel handed to `watch`; cancelling the subscription is aborting
/// the returned task.
pub trait LocationProvider: Send + Sync {
    /// Whether the host exposes any location capability at all.
    fn available(&self) -> bool;

    /// Spawn a delivery loop pushing events into `tx`.
    fn watch(&self, options: WatchOptions, tx: Sender<WatchEvent>) -> JoinHandle<()>;
}

/// Synthetic drive for development and integration tests: coordinates
/// drift north-east from a starting point while speed and accuracy
/// oscillate, roughly matching a slow urban drive.
#[derive(Clone, Debug)]
pub struct SimulatedProvider {
    pub start_lat: f64,
    pub start_lon: f64,
    pub fix_interval: Duration,
}

impl SimulatedProvider {
    pub fn new(fix_interval: Duration) -> Self {
        SimulatedProvider {
            start_lat: -23.5505,
            start_lon: -46.6333,
            fix_interval,
        }
    }

    fn fix_at(&self, seq: u64) -> PositionFix {
        let step = seq as f64;
        PositionFix {
            timestamp: current_timestamp(),
            latitude: self.start_lat + step * 0.0001,
            longitude: self.start_lon + step * 0.0001,
            speed: Some(10.0 + (step * 0.5).sin() * 5.0),
            accuracy: 5.0 + (step * 0.1).sin() * 2.0,
        }
    }
}

impl LocationProvider for SimulatedProvider {
    fn available(&self) -> bool {
        true
    }

    fn watch(&self, _options: WatchOptions, tx: Sender<WatchEvent>) -> JoinHandle<()> {
        let provider = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(provider.fix_interval);
            let mut seq = 0u64;
            loop {
                ticker.tick().await;
                let fix = provider.fix_at(seq);
                if tx.send(WatchEvent::Fix(fix)).await.is_err() {
                    log::debug!("watch channel closed after {} fixes", seq);
                    break;
                }
                seq += 1;
            }
        })
    }
}

/// A host with no location capability; `watch` is never reached because
/// callers check `available` first.
pub struct UnavailableProvider;

impl LocationProvider for UnavailableProvider {
    fn available(&self) -> bool {
        false
    }

    fn watch(&self, _options: WatchOptions, _tx: Sender<WatchEvent>) -> JoinHandle<()> {
        tokio::spawn(async {})
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
    use tokio::sync::mpsc;

    #[test]
    fn test_default_watch_options() {
        let opts = WatchOptions::default();
        assert!(opts.high_accuracy);
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert_eq!(opts.max_fix_age, Duration::ZERO);
    }

    #[test]
    fn test_simulated_fixes_drift() {
        let provider = SimulatedProvider::new(Duration::from_millis(10));
        let a = provider.fix_at(0);
        let b = provider.fix_at(1);
        assert!(b.latitude > a.latitude);
        assert!(b.longitude > a.longitude);
        assert!(a.speed.unwrap() > 0.0);
        assert!(a.accuracy > 0.0 && a.accuracy < 10.0);
    }

    #[tokio::test]
    async fn test_simulated_watch_delivers_in_order() {
        let provider = SimulatedProvider::new(Duration::from_millis(5));
        let (tx, mut rx) = mpsc::channel(16);
        let handle = provider.watch(WatchOptions::default(), tx);

        let mut last_ts = 0.0;
        for _ in 0..3 {
            match rx.recv().await.expect("watch event") {
                WatchEvent::Fix(fix) => {
                    assert!(fix.timestamp >= last_ts);
                    last_ts = fix.timestamp;
                }
                WatchEvent::Error(e) => panic!("unexpected error: {}", e),
            }
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_watch_loop_stops_when_receiver_dropped() {
        let provider = SimulatedProvider::new(Duration::from_millis(1));
        let (tx, rx) = mpsc::channel(1);
        let handle = provider.watch(WatchOptions::default(), tx);
        drop(rx);
        // Loop must notice the closed channel and finish on its own
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watch task did not stop")
            .expect("watch task panicked");
    }
}
