/// How long the visible warning is held after the over-limit condition
/// clears, so the indicator does not flicker when speed oscillates around
/// the limit (seconds).
pub const HIDE_DELAY_SECS: f64 = 0.5;

/// Minimum spacing between alert tones (seconds); at most one tone per
/// window no matter how long the limit stays exceeded.
pub const TONE_COOLDOWN_SECS: f64 = 3.0;

/// Instruction for the audio side effect; returned by [`SpeedAlert::update`]
/// when a tone should start now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToneRequest;

/// Speed-limit alert state machine.
///
/// Two states, Quiet and Alarming, compared on every speed update against
/// the configured limit. Going over the limit shows the warning with no
/// delay; coming back under arms a hide deadline instead of hiding
/// immediately. Timing is driven by caller-supplied timestamps (seconds),
/// so tests advance time without waiting.
pub struct SpeedAlert {
    limit: Option<f64>,
    audio_enabled: bool,
    over_limit: bool,
    visible: bool,
    hide_at: Option<f64>,
    last_tone_at: Option<f64>,
    tone_playing: bool,
}

impl SpeedAlert {
    pub fn new(limit: Option<f64>, audio_enabled: bool) -> Self {
        SpeedAlert {
            limit,
            audio_enabled,
            over_limit: false,
            visible: false,
            hide_at: None,
            last_tone_at: None,
            tone_playing: false,
        }
    }

    pub fn limit(&self) -> Option<f64> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: Option<f64>) {
        self.limit = limit;
        if limit.is_none() {
            self.over_limit = false;
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.over_limit
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Amount over the limit, rounded, never negative. Zero without a limit.
    pub fn overshoot(&self, speed: f64) -> f64 {
        match self.limit {
            Some(limit) => (speed - limit).round().max(0.0),
            None => 0.0,
        }
    }

    /// Compare one speed sample (display units) against the limit at time
    /// `now` (seconds). Returns a [`ToneRequest`] when the audible alert
    /// should start.
    pub fn update(&mut self, speed: f64, now: f64) -> Option<ToneRequest> {
        let over = match self.limit {
            Some(limit) => speed > limit,
            None => false,
        };
        self.over_limit = over;

        if over {
            // Visible immediately, and any pending hide is cancelled
            self.visible = true;
            self.hide_at = None;
            return self.request_tone(now);
        }

        if self.visible && self.hide_at.is_none() {
            self.hide_at = Some(now + HIDE_DELAY_SECS);
        }
        None
    }

    /// Apply a due hide deadline.
    pub fn tick(&mut self, now: f64) {
        if let Some(hide_at) = self.hide_at {
            if now >= hide_at {
                self.visible = false;
                self.hide_at = None;
            }
        }
    }

    /// When the caller's event loop should next call [`tick`](Self::tick).
    pub fn hide_deadline(&self) -> Option<f64> {
        self.hide_at
    }

    fn request_tone(&mut self, now: f64) -> Option<ToneRequest> {
        if !self.audio_enabled || self.tone_playing {
            return None;
        }
        if let Some(last) = self.last_tone_at {
            if now - last < TONE_COOLDOWN_SECS {
                return None;
            }
        }
        self.last_tone_at = Some(now);
        self.tone_playing = true;
        Some(ToneRequest)
    }

    /// Playback finished, successfully or not. Must always be called so a
    /// synthesis failure cannot wedge the alert in a "playing" state.
    pub fn tone_finished(&mut self) {
        self.tone_playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_without_limit() {
        let mut alert = SpeedAlert::new(None, true);
        assert!(alert.update(150.0, 0.0).is_none());
        assert!(!alert.is_over_limit());
        assert!(!alert.is_visible());
        assert_eq!(alert.overshoot(150.0), 0.0);
    }

    #[test]
    fn test_visible_immediately_when_over() {
        let mut alert = SpeedAlert::new(Some(60.0), false);
        alert.update(65.0, 0.0);
        assert!(alert.is_over_limit());
        assert!(alert.is_visible());
        assert_eq!(alert.overshoot(65.0), 5.0);
    }

    #[test]
    fn test_hide_held_for_delay() {
        let mut alert = SpeedAlert::new(Some(60.0), false);

        // 55 -> 65 -> 58: visible from the second sample, held visible for
        // at least 500 ms after dropping back under
        alert.update(55.0, 0.0);
        assert!(!alert.is_visible());
        alert.update(65.0, 1.0);
        assert!(alert.is_visible());
        alert.update(58.0, 2.0);
        assert!(alert.is_visible());
        assert_eq!(alert.hide_deadline(), Some(2.5));

        alert.tick(2.4);
        assert!(alert.is_visible());
        alert.tick(2.5);
        assert!(!alert.is_visible());
        assert_eq!(alert.hide_deadline(), None);
    }

    #[test]
    fn test_reentry_cancels_pending_hide() {
        let mut alert = SpeedAlert::new(Some(60.0), false);
        alert.update(65.0, 0.0);
        alert.update(58.0, 1.0);
        assert_eq!(alert.hide_deadline(), Some(1.5));

        // Back over the limit before the deadline fires
        alert.update(66.0, 1.2);
        assert_eq!(alert.hide_deadline(), None);
        alert.tick(2.0);
        assert!(alert.is_visible());
    }

    #[test]
    fn test_oscillation_does_not_shorten_hold() {
        let mut alert = SpeedAlert::new(Some(60.0), false);
        alert.update(65.0, 0.0);
        alert.update(58.0, 1.0);
        // Further under-limit samples do not re-arm a shorter deadline
        alert.update(57.0, 1.3);
        assert_eq!(alert.hide_deadline(), Some(1.5));
    }

    #[test]
    fn test_tone_rate_limited() {
        let mut alert = SpeedAlert::new(Some(60.0), true);

        assert!(alert.update(70.0, 0.0).is_some());
        alert.tone_finished();

        // Still inside the 3 s window: suppressed
        assert!(alert.update(70.0, 1.0).is_none());
        assert!(alert.update(70.0, 2.9).is_none());

        // One tone per sustained 3 s window
        assert!(alert.update(70.0, 3.0).is_some());
        alert.tone_finished();
        assert!(alert.update(70.0, 5.0).is_none());
        assert!(alert.update(70.0, 6.0).is_some());
    }

    #[test]
    fn test_tone_suppressed_while_playing() {
        let mut alert = SpeedAlert::new(Some(60.0), true);
        assert!(alert.update(70.0, 0.0).is_some());
        // Cooldown elapsed but the previous tone never reported completion
        assert!(alert.update(70.0, 4.0).is_none());
        alert.tone_finished();
        assert!(alert.update(70.0, 8.0).is_some());
    }

    #[test]
    fn test_tone_disabled_audio() {
        let mut alert = SpeedAlert::new(Some(60.0), false);
        assert!(alert.update(70.0, 0.0).is_none());
        assert!(alert.is_visible());
    }

    #[test]
    fn test_no_tone_under_limit() {
        let mut alert = SpeedAlert::new(Some(60.0), true);
        assert!(alert.update(59.9, 0.0).is_none());
        // Boundary: exactly at the limit is not over
        assert!(alert.update(60.0, 1.0).is_none());
        assert!(!alert.is_over_limit());
    }

    #[test]
    fn test_clearing_limit_drops_alarm() {
        let mut alert = SpeedAlert::new(Some(60.0), true);
        alert.update(70.0, 0.0);
        assert!(alert.is_over_limit());

        alert.set_limit(None);
        assert!(!alert.is_over_limit());
        assert!(alert.update(70.0, 1.0).is_none());
    }

    #[test]
    fn test_overshoot_rounding() {
        let alert = SpeedAlert::new(Some(60.0), true);
        assert_eq!(alert.overshoot(65.4), 5.0);
        assert_eq!(alert.overshoot(65.5), 6.0);
        assert_eq!(alert.overshoot(59.0), 0.0);
    }
}
