use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::error::{buffer_error, Result};

/// Coarse verdict derived from the signal-to-noise ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_snr(snr_db: f64) -> Self {
        if snr_db > 25.0 {
            QualityRating::Excellent
        } else if snr_db > 15.0 {
            QualityRating::Good
        } else if snr_db > 10.0 {
            QualityRating::Fair
        } else {
            QualityRating::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRating::Excellent => "Excellent",
            QualityRating::Good => "Good",
            QualityRating::Fair => "Fair",
            QualityRating::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a processed buffer drifted from the one it was made from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAnalysis {
    /// Infinite for identical signals, which JSON renders as null
    pub snr_db: f64,
    pub quality_rating: QualityRating,
    pub dynamic_range_preservation_percent: f64,
    pub energy_preservation_percent: f64,
    pub original_duration_seconds: f64,
    pub processed_duration_seconds: f64,
    pub sample_rate_match: bool,
}

/// Average all channels into one
fn downmix(buffer: AudioBuffer) -> Vec<f32> {
    let count = buffer.channel_count();
    let mut channels = buffer.into_channels().into_iter();
    let mut mono = channels.next().unwrap_or_default();
    for channel in channels {
        for (m, s) in mono.iter_mut().zip(channel) {
            *m += s;
        }
    }
    if count > 1 {
        let scale = 1.0 / count as f32;
        mono.iter_mut().for_each(|m| *m *= scale);
    }
    mono
}

fn span(samples: &[f32]) -> f64 {
    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    (max - min) as f64
}

/// Compare the mono downmix of `processed` against `original`.
///
/// `processed` is resampled onto the original's rate and both are cut to
/// the shorter length before comparison.
pub fn analyze_quality(original: &AudioBuffer, processed: &AudioBuffer) -> Result<QualityAnalysis> {
    let sample_rate_match = original.sample_rate() == processed.sample_rate();
    let reference = downmix(original.clone());
    let candidate = downmix(processed.resampled(original.sample_rate())?);

    let len = reference.len().min(candidate.len());
    if len == 0 {
        return Err(buffer_error("cannot analyze quality of an empty buffer"));
    }
    let reference = &reference[..len];
    let candidate = &candidate[..len];

    let mut signal_energy = 0.0f64;
    let mut processed_energy = 0.0f64;
    let mut error_energy = 0.0f64;
    for (&o, &p) in reference.iter().zip(candidate) {
        let (o, p) = (o as f64, p as f64);
        signal_energy += o * o;
        processed_energy += p * p;
        error_energy += (o - p) * (o - p);
    }

    let snr_db = if error_energy > 0.0 {
        10.0 * (signal_energy / error_energy).log10()
    } else {
        f64::INFINITY
    };

    let original_range = span(reference);
    let dynamic_range_preservation_percent = if original_range > 0.0 {
        span(candidate) / original_range * 100.0
    } else {
        100.0
    };
    let energy_preservation_percent = if signal_energy > 0.0 {
        processed_energy / signal_energy * 100.0
    } else {
        100.0
    };

    let analysis = QualityAnalysis {
        snr_db,
        quality_rating: QualityRating::from_snr(snr_db),
        dynamic_range_preservation_percent,
        energy_preservation_percent,
        original_duration_seconds: original.duration_secs(),
        processed_duration_seconds: processed.duration_secs(),
        sample_rate_match,
    };
    log::debug!("Quality analysis: {:?}", analysis);
    Ok(analysis)
}
