use std::fmt::{Display, Formatter};

/// Alert tone pitch (A5).
pub const TONE_FREQ_HZ: f64 = 880.0;

/// Total tone duration in seconds.
pub const TONE_DURATION_SECS: f64 = 0.5;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Gain envelope breakpoints (time s, gain): two quick pulses, silent after
/// the last breakpoint.
const ENVELOPE: [(f64, f64); 5] = [
    (0.0, 0.0),
    (0.01, 0.3),
    (0.15, 0.0),
    (0.25, 0.3),
    (0.40, 0.0),
];

#[derive(Debug, Clone)]
pub enum ToneError {
    Synthesis(String),
}

impl Display for ToneError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ToneError::Synthesis(msg) => write!(f, "Synthesis error: {}", msg),
        }
    }
}

impl std::error::Error for ToneError {}

/// Piecewise-linear envelope gain at time `t` seconds.
fn envelope_gain(t: f64) -> f64 {
    let (last_t, _) = ENVELOPE[ENVELOPE.len() - 1];
    if t < 0.0 || t >= last_t {
        return 0.0;
    }
    for window in ENVELOPE.windows(2) {
        let (t0, g0) = window[0];
        let (t1, g1) = window[1];
        if t < t1 {
            return g0 + (g1 - g0) * (t - t0) / (t1 - t0);
        }
    }
    0.0
}

/// Render the 880 Hz square-wave alert tone with its double-pulse gain
/// envelope into mono f32 samples.
pub fn render_alert_tone(sample_rate: u32) -> Vec<f32> {
    let total = (TONE_DURATION_SECS * sample_rate as f64).round() as usize;
    let mut samples = Vec::with_capacity(total);
    for i in 0..total {
        let t = i as f64 / sample_rate as f64;
        let phase = (t * TONE_FREQ_HZ).fract();
        let square = if phase < 0.5 { 1.0 } else { -1.0 };
        samples.push((square * envelope_gain(t)) as f32);
    }
    samples
}

/// Output sink for rendered tone samples. Presentation owns the actual
/// audio device; the engine only hands over a buffer.
pub trait TonePlayer {
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), ToneError>;
}

/// Discards the buffer; used headless and in tests.
pub struct NullPlayer;

impl TonePlayer for NullPlayer {
    fn play(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<(), ToneError> {
        Ok(())
    }
}

/// Holds the rendered tone buffer, created lazily on first playback and
/// released on `dispose`.
pub struct ToneSynth {
    sample_rate: u32,
    buffer: Option<Vec<f32>>,
}

impl ToneSynth {
    pub fn new(sample_rate: u32) -> Self {
        ToneSynth {
            sample_rate,
            buffer: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    /// Render (first call only) and push the tone into the sink.
    pub fn play(&mut self, sink: &mut dyn TonePlayer) -> Result<(), ToneError> {
        let rate = self.sample_rate;
        let buffer = self.buffer.get_or_insert_with(|| render_alert_tone(rate));
        sink.play(buffer, rate)
    }

    /// Release the synthesis buffer; the next playback re-renders.
    pub fn dispose(&mut self) {
        self.buffer = None;
    }
}

impl Default for ToneSynth {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_envelope_breakpoints() {
        assert_eq!(envelope_gain(0.0), 0.0);
        assert_relative_eq!(envelope_gain(0.01), 0.3);
        assert_relative_eq!(envelope_gain(0.15), 0.0, epsilon = 1e-12);
        assert_relative_eq!(envelope_gain(0.25), 0.3);
        assert_eq!(envelope_gain(0.40), 0.0);
        assert_eq!(envelope_gain(0.45), 0.0);
    }

    #[test]
    fn test_envelope_midpoints() {
        // Halfway down the first decay ramp
        assert_relative_eq!(envelope_gain(0.08), 0.15, max_relative = 1e-9);
        // Halfway up the second attack ramp
        assert_relative_eq!(envelope_gain(0.20), 0.15, max_relative = 1e-9);
    }

    #[test]
    fn test_render_length_and_amplitude() {
        let samples = render_alert_tone(DEFAULT_SAMPLE_RATE);
        assert_eq!(samples.len(), 22_050);

        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.3 + 1e-6);
        assert!(peak > 0.29, "peak {} should reach the envelope top", peak);
    }

    #[test]
    fn test_render_silent_head_and_tail() {
        let samples = render_alert_tone(DEFAULT_SAMPLE_RATE);
        assert_eq!(samples[0], 0.0);
        // Everything past the envelope's last breakpoint is silence
        let tail_start = (0.40 * DEFAULT_SAMPLE_RATE as f64) as usize;
        assert!(samples[tail_start..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_square_wave_alternates() {
        let samples = render_alert_tone(DEFAULT_SAMPLE_RATE);
        // Inside the first pulse the waveform must cross zero both ways
        let pulse = &samples[500..2000];
        assert!(pulse.iter().any(|s| *s > 0.0));
        assert!(pulse.iter().any(|s| *s < 0.0));
    }

    #[test]
    fn test_lazy_init_and_dispose() {
        let mut synth = ToneSynth::default();
        assert!(!synth.is_initialized());

        synth.play(&mut NullPlayer).unwrap();
        assert!(synth.is_initialized());

        synth.dispose();
        assert!(!synth.is_initialized());
    }

    #[test]
    fn test_sink_error_propagates() {
        struct FailingPlayer;
        impl TonePlayer for FailingPlayer {
            fn play(&mut self, _: &[f32], _: u32) -> Result<(), ToneError> {
                Err(ToneError::Synthesis("no output device".to_string()))
            }
        }

        let mut synth = ToneSynth::default();
        let err = synth.play(&mut FailingPlayer).unwrap_err();
        assert_eq!(err.to_string(), "Synthesis error: no output device");
    }
}
