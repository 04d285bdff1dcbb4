use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::CensorConfig;
use crate::error::{config_error, HushmixError, Result};
use crate::fade::FadeEnvelope;
use crate::timing::AdjustedSpan;
use crate::tone::ToneSynthesizer;

/// Reversed segments at or below this length get no edge ramp
const REVERSE_EDGE_MIN_LENGTH: usize = 100;

/// How a masked span is obscured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CensorStrategy {
    /// Replace with silence, fading the neighbouring audio
    #[default]
    #[serde(alias = "silence")]
    Mute,
    /// Replace with a fixed-frequency tone
    #[serde(alias = "bleep", alias = "beep")]
    Tone,
    /// Play the span backwards at reduced volume
    Reverse,
}

impl CensorStrategy {
    pub const ALL: [CensorStrategy; 3] = [
        CensorStrategy::Mute,
        CensorStrategy::Tone,
        CensorStrategy::Reverse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CensorStrategy::Mute => "mute",
            CensorStrategy::Tone => "tone",
            CensorStrategy::Reverse => "reverse",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CensorStrategy::Mute => "Replace profanity with silence, fading the surrounding audio",
            CensorStrategy::Tone => "Replace profanity with a 1kHz bleep tone",
            CensorStrategy::Reverse => {
                "Play profanity backwards at reduced volume, boosting the instrumental to compensate"
            }
        }
    }
}

impl std::fmt::Display for CensorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CensorStrategy {
    type Err = HushmixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mute" | "silence" => Ok(CensorStrategy::Mute),
            "tone" | "bleep" | "beep" => Ok(CensorStrategy::Tone),
            "reverse" => Ok(CensorStrategy::Reverse),
            _ => Err(config_error(
                "strategy",
                format!("Unknown censoring strategy '{}'. Valid options: mute, tone, reverse", s),
            )),
        }
    }
}

/// Half-open sample range `[start, end)` within one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleRange {
    pub start: usize,
    pub end: usize,
}

/// Millisecond to sample index, floored.
///
/// The small bias absorbs float error from the seconds to milliseconds
/// conversion, e.g. 2.3s * 1000 landing just under 2300.
pub(crate) fn ms_to_sample(ms: f64, sample_rate: u32) -> i64 {
    (ms * sample_rate as f64 / 1000.0 + 1e-6).floor() as i64
}

impl SampleRange {
    /// Range covered by a sanitized span plus margins, clamped to `[0, frames)`
    pub fn from_span(
        span: &AdjustedSpan,
        pre_margin_ms: f64,
        post_margin_ms: f64,
        sample_rate: u32,
        frames: usize,
    ) -> Self {
        let start = ms_to_sample(span.start_ms - pre_margin_ms, sample_rate).max(0) as usize;
        let end = ms_to_sample(span.end_ms + post_margin_ms, sample_rate)
            .clamp(0, frames as i64) as usize;
        Self {
            start: start.min(frames),
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Applies one masking strategy to one channel over one sample range.
///
/// Degenerate ranges are a no-op; the masker never fails.
#[derive(Debug, Clone)]
pub struct SegmentMasker {
    strategy: CensorStrategy,
    sample_rate: u32,
    fade_samples: usize,
    envelope: FadeEnvelope,
    tone: ToneSynthesizer,
    reverse_gain: f32,
    reverse_edge_samples: usize,
}

impl SegmentMasker {
    pub fn new(config: &CensorConfig, sample_rate: u32) -> Self {
        let envelope = FadeEnvelope::new(config.fade_shape);
        Self {
            strategy: config.strategy,
            sample_rate,
            fade_samples: FadeEnvelope::fade_samples(config.fade_ms, sample_rate),
            envelope,
            tone: ToneSynthesizer {
                frequency_hz: config.tone_frequency_hz,
                amplitude: config.tone_amplitude,
                fade_ms: config.fade_ms,
                envelope,
            },
            reverse_gain: config.reverse_gain,
            reverse_edge_samples: config.reverse_edge_samples,
        }
    }

    pub fn strategy(&self) -> CensorStrategy {
        self.strategy
    }

    pub fn fade_samples(&self) -> usize {
        self.fade_samples
    }

    pub fn mask(&self, channel: &mut [f32], range: SampleRange) {
        let range = SampleRange {
            start: range.start.min(channel.len()),
            end: range.end.min(channel.len()),
        };
        if range.is_empty() {
            debug!("Skipping empty range {}..{}", range.start, range.end);
            return;
        }

        match self.strategy {
            CensorStrategy::Mute => self.mute(channel, range),
            CensorStrategy::Tone => self.tone(channel, range),
            CensorStrategy::Reverse => self.reverse(channel, range),
        }
    }

    /// Zero the range. The ramps sit in the untouched neighbours so the
    /// silence itself stays hard.
    fn mute(&self, channel: &mut [f32], range: SampleRange) {
        let fade = self.fade_samples.min(range.len() / 4);
        if fade > 0 {
            let before = range.start.saturating_sub(fade)..range.start;
            self.envelope.fade_out(&mut channel[before]);

            let after = range.end..(range.end + fade).min(channel.len());
            self.envelope.fade_in(&mut channel[after]);
        }
        channel[range.start..range.end].fill(0.0);
    }

    fn tone(&self, channel: &mut [f32], range: SampleRange) {
        let duration_ms = range.len() as f64 * 1000.0 / self.sample_rate as f64;
        let tone = ToneSynthesizer::fit(
            self.tone.synthesize(duration_ms, self.sample_rate),
            range.len(),
        );
        channel[range.start..range.end].copy_from_slice(&tone);
    }

    fn reverse(&self, channel: &mut [f32], range: SampleRange) {
        let segment = &mut channel[range.start..range.end];
        segment.reverse();
        for sample in segment.iter_mut() {
            *sample *= self.reverse_gain;
        }

        let len = segment.len();
        if len > REVERSE_EDGE_MIN_LENGTH {
            let edge = self.reverse_edge_samples.min(len / 4);
            for i in 0..edge {
                let factor = i as f32 / edge as f32;
                segment[i] *= factor;
                segment[len - 1 - i] *= factor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_signal(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i % 97) as f32 / 97.0) - 0.5).collect()
    }

    fn masker(strategy: CensorStrategy, fade_ms: f64, sample_rate: u32) -> SegmentMasker {
        let config = CensorConfig {
            strategy,
            fade_ms,
            ..Default::default()
        };
        SegmentMasker::new(&config, sample_rate)
    }

    fn span_ms(start_ms: f64, end_ms: f64) -> AdjustedSpan {
        AdjustedSpan {
            word: "word".to_string(),
            confidence: 1.0,
            original_start_ms: start_ms,
            original_end_ms: end_ms,
            start_ms,
            end_ms,
            compressed: false,
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("mute".parse::<CensorStrategy>().unwrap(), CensorStrategy::Mute);
        assert_eq!("BLEEP".parse::<CensorStrategy>().unwrap(), CensorStrategy::Tone);
        assert_eq!("reverse".parse::<CensorStrategy>().unwrap(), CensorStrategy::Reverse);
        assert!("warble".parse::<CensorStrategy>().is_err());
    }

    #[test]
    fn test_range_from_span_clamps() {
        let range = SampleRange::from_span(&span_ms(2000.0, 2300.0), 0.0, 25.0, 16000, 160000);
        assert_eq!(range, SampleRange { start: 32000, end: 37200 });

        let range = SampleRange::from_span(&span_ms(10.0, 50.0), 100.0, 0.0, 1000, 20);
        assert_eq!(range, SampleRange { start: 0, end: 20 });

        let outside = SampleRange::from_span(&span_ms(5000.0, 6000.0), 0.0, 0.0, 1000, 100);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_mute_zeroes_range_and_limits_fades() {
        let original = ramp_signal(4000);
        let mut channel = original.clone();
        let masker = masker(CensorStrategy::Mute, 10.0, 8000);
        let fade = masker.fade_samples();
        assert_eq!(fade, 80);

        let range = SampleRange { start: 1000, end: 2000 };
        masker.mask(&mut channel, range);

        assert!(channel[1000..2000].iter().all(|&s| s == 0.0));
        for (i, (&out, &inp)) in channel.iter().zip(&original).enumerate() {
            if i < range.start - fade || i >= range.end + fade {
                assert_eq!(out, inp, "sample {} changed", i);
            }
        }
        assert_eq!(channel[999], 0.0);
        assert_eq!(channel[2000], 0.0);
        assert_eq!(channel[920], original[920]);
    }

    #[test]
    fn test_mute_fade_shortened_at_buffer_start() {
        let mut channel = vec![1.0f32; 1000];
        let masker = masker(CensorStrategy::Mute, 10.0, 8000);
        masker.mask(&mut channel, SampleRange { start: 20, end: 600 });

        assert_eq!(channel[0], 1.0);
        assert_eq!(channel[19], 0.0);
        assert!(channel[20..600].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_degenerate_range_is_noop() {
        let original = ramp_signal(100);
        for strategy in CensorStrategy::ALL {
            let mut channel = original.clone();
            let masker = masker(strategy, 5.0, 8000);
            masker.mask(&mut channel, SampleRange { start: 50, end: 50 });
            masker.mask(&mut channel, SampleRange { start: 80, end: 40 });
            masker.mask(&mut channel, SampleRange { start: 500, end: 600 });
            assert_eq!(channel, original);
        }
    }

    #[test]
    fn test_tone_fills_exact_length() {
        let original = ramp_signal(10000);
        let mut channel = original.clone();
        let masker = masker(CensorStrategy::Tone, 5.0, 44100);
        let range = SampleRange { start: 1234, end: 5678 };
        masker.mask(&mut channel, range);

        assert_eq!(channel.len(), original.len());
        assert_eq!(&channel[..1234], &original[..1234]);
        assert_eq!(&channel[5678..], &original[5678..]);
        assert!(channel[1234..5678].iter().all(|s| s.abs() <= 0.3 + 1e-6));
        assert!(channel[2000..5000].iter().any(|s| s.abs() > 0.25));
    }

    #[test]
    fn test_reverse_is_scaled_mirror() {
        let original = ramp_signal(2000);
        let mut channel = original.clone();
        let masker = masker(CensorStrategy::Reverse, 25.0, 8000);
        let range = SampleRange { start: 500, end: 1500 };
        masker.mask(&mut channel, range);

        let edge = 50;
        for offset in edge..(range.len() - edge) {
            let expected = original[range.end - 1 - offset] * 0.3;
            assert_eq!(channel[range.start + offset], expected);
            assert!(channel[range.start + offset].abs() <= original[range.end - 1 - offset].abs());
        }
        assert_eq!(channel[range.start], 0.0);
        assert_eq!(channel[range.end - 1], 0.0);
        assert_eq!(&channel[..500], &original[..500]);
        assert_eq!(&channel[1500..], &original[1500..]);
    }

    #[test]
    fn test_short_reverse_has_no_edge_ramp() {
        let mut channel = vec![0.0, 0.1, 0.2, 0.3];
        masker(CensorStrategy::Reverse, 25.0, 8000).mask(&mut channel, SampleRange { start: 0, end: 4 });
        let expected: Vec<f32> = [0.3f32, 0.2, 0.1, 0.0].iter().map(|s| s * 0.3).collect();
        assert_eq!(channel, expected);
    }
}
