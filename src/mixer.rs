use log::{debug, info};
use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::config::MixConfig;
use crate::error::{mix_error, Result};

/// Outcome of combining two buffers
#[derive(Debug, Clone)]
pub struct MixResult {
    pub audio: AudioBuffer,
    pub summary: MixSummary,
}

/// Gains and limiting applied during a mix, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixSummary {
    pub primary_gain: f32,
    pub companion_gain: f32,
    pub sample_rate: u32,
    pub channels: usize,
    /// Peak of the weighted sum before any limiting
    pub input_peak: f32,
    /// Scale applied by the limiter, 1.0 when untouched
    pub limiter_scale: f32,
    pub limited: bool,
    /// Scale applied by energy rebalancing, 1.0 when untouched
    pub energy_scale: f32,
}

/// Combines a censored primary buffer with a companion buffer
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    config: MixConfig,
}

impl Mixer {
    pub fn new(config: MixConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    /// Weighted sum of the two buffers with conditional peak limiting.
    ///
    /// The lower sample rate is upsampled to the higher one, a mono side is
    /// duplicated across the other side's channels, and both are truncated
    /// to the shorter length before summing.
    pub fn mix(&self, primary: &AudioBuffer, companion: &AudioBuffer) -> Result<MixResult> {
        if primary.is_empty() {
            return Err(mix_error("primary buffer is empty"));
        }
        if companion.is_empty() {
            return Err(mix_error("companion buffer is empty"));
        }

        let (primary, companion) = align(primary, companion)?;
        let frames = primary.frames().min(companion.frames());
        let primary = primary.truncated(frames);
        let companion = companion.truncated(frames);

        let MixConfig {
            primary_gain,
            companion_gain,
            peak_ceiling,
            ..
        } = self.config;

        let channels = primary
            .channels()
            .iter()
            .zip(companion.channels())
            .map(|(p, c)| {
                p.iter()
                    .zip(c)
                    .map(|(&p, &c)| p * primary_gain + c * companion_gain)
                    .collect()
            })
            .collect();
        let mut mixed = AudioBuffer::new(channels, primary.sample_rate())?;

        let input_peak = mixed.peak();
        let mut limiter_scale = 1.0;
        if input_peak > peak_ceiling {
            limiter_scale = peak_ceiling / input_peak;
            mixed.scale(limiter_scale);
            info!(
                "Applied gentle limiting to prevent clipping (peak: {:.3} -> {:.3})",
                input_peak, peak_ceiling
            );
        }

        let energy_scale = if self.config.preserve_energy {
            self.rebalance_energy(&mut mixed, &primary, &companion)
        } else {
            1.0
        };

        let summary = MixSummary {
            primary_gain,
            companion_gain,
            sample_rate: mixed.sample_rate(),
            channels: mixed.channel_count(),
            input_peak,
            limiter_scale,
            limited: limiter_scale < 1.0,
            energy_scale,
        };
        debug!("Mix summary: {:?}", summary);

        Ok(MixResult {
            audio: mixed,
            summary,
        })
    }

    /// Nudge the mix towards the summed RMS of its inputs.
    ///
    /// The correction is capped by `max_energy_boost` and by the headroom
    /// left under the peak ceiling.
    fn rebalance_energy(&self, mixed: &mut AudioBuffer, primary: &AudioBuffer, companion: &AudioBuffer) -> f32 {
        let primary_rms = primary.rms();
        let companion_rms = companion.rms();
        let mixed_rms = mixed.rms();
        if mixed_rms <= 0.0 || primary_rms <= 0.0 || companion_rms <= 0.0 {
            return 1.0;
        }

        let target = primary_rms + companion_rms;
        if (mixed_rms - target).abs() / target <= self.config.energy_tolerance {
            return 1.0;
        }

        let peak = mixed.peak();
        let mut scale = (target / mixed_rms).min(self.config.max_energy_boost);
        if peak > 0.0 {
            scale = scale.min(self.config.peak_ceiling / peak);
        }

        mixed.scale(scale);
        info!(
            "Rebalanced mix energy by {:.3}x (rms {:.4} -> target {:.4})",
            scale, mixed_rms, target
        );
        scale
    }
}

/// Bring both buffers to a common sample rate and channel count
fn align(primary: &AudioBuffer, companion: &AudioBuffer) -> Result<(AudioBuffer, AudioBuffer)> {
    let target_rate = primary.sample_rate().max(companion.sample_rate());
    let primary = primary.resampled(target_rate)?;
    let companion = companion.resampled(target_rate)?;

    let target_channels = primary.channel_count().max(companion.channel_count());
    let primary = primary.with_channels(target_channels).map_err(|e| {
        mix_error(format!("cannot align primary channels: {}", e))
    })?;
    let companion = companion.with_channels(target_channels).map_err(|e| {
        mix_error(format!("cannot align companion channels: {}", e))
    })?;

    if primary.is_empty() || companion.is_empty() {
        return Err(mix_error("buffer is empty after resampling"));
    }
    Ok((primary, companion))
}
