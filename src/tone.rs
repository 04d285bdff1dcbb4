use std::f32::consts::PI;

use crate::fade::FadeEnvelope;

/// Classic broadcast bleep frequency
pub const DEFAULT_TONE_FREQUENCY_HZ: f32 = 1000.0;
/// Peak amplitude of the tone
pub const DEFAULT_TONE_AMPLITUDE: f32 = 0.3;

/// Fixed-frequency sine generator for tone masking
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSynthesizer {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub fade_ms: f64,
    pub envelope: FadeEnvelope,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_TONE_FREQUENCY_HZ,
            amplitude: DEFAULT_TONE_AMPLITUDE,
            fade_ms: 10.0,
            envelope: FadeEnvelope::default(),
        }
    }
}

impl ToneSynthesizer {
    /// Number of samples a tone of `duration_ms` occupies
    pub fn sample_count(duration_ms: f64, sample_rate: u32) -> usize {
        if duration_ms <= 0.0 {
            return 0;
        }
        (duration_ms * sample_rate as f64 / 1000.0) as usize
    }

    /// Synthesize a faded tone of `duration_ms`
    pub fn synthesize(&self, duration_ms: f64, sample_rate: u32) -> Vec<f32> {
        let samples = Self::sample_count(duration_ms, sample_rate);
        let step = 2.0 * PI * self.frequency_hz / sample_rate as f32;

        let mut tone: Vec<f32> = (0..samples)
            .map(|i| (step * i as f32).sin() * self.amplitude)
            .collect();

        let fade_samples = FadeEnvelope::fade_samples(self.fade_ms, sample_rate);
        self.envelope.apply(&mut tone, fade_samples);
        tone
    }

    /// Truncate or zero-pad a tone to exactly `length` samples.
    ///
    /// The tone is never stretched, so its pitch is unaffected.
    pub fn fit(mut tone: Vec<f32>, length: usize) -> Vec<f32> {
        tone.resize(length, 0.0);
        tone
    }
}
