use log::{debug, info, warn};
use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::config::CensorConfig;
use crate::error::{config_error, Result};
use crate::fade::FadeEnvelope;
use crate::masker::{CensorStrategy, SampleRange, SegmentMasker};
use crate::timing::{AdjustedSpan, TimingSanitizer, WordSpan};

/// Per-span record of what was masked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub word: String,
    pub confidence: f64,
    pub original_start_ms: f64,
    pub original_end_ms: f64,
    pub start_ms: f64,
    pub end_ms: f64,
    /// Sanitized duration plus both margins
    pub duration_ms: f64,
    pub compressed: bool,
    pub start_sample: usize,
    pub end_sample: usize,
    /// The span fell outside the buffer and nothing was changed
    pub skipped: bool,
}

/// Statistics about a censoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensoringStats {
    pub total_segments: usize,
    pub censored_duration_ms: f64,
    pub strategy: CensorStrategy,
    pub skipped_segments: usize,
    pub companion_boosted: bool,
    pub segments: Vec<SegmentStats>,
}

/// One planned span: sanitized timing and the samples it covers
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment {
    pub span: AdjustedSpan,
    pub range: SampleRange,
    pub duration_ms: f64,
}

/// Result of a censoring pass
#[derive(Debug, Clone)]
pub struct CensorOutput {
    /// Censored copy of the primary buffer
    pub audio: AudioBuffer,
    /// Companion buffer, boosted under reversed spans when compensation ran
    pub companion: Option<AudioBuffer>,
    pub stats: CensoringStats,
}

/// Drives the segment masker over every span and channel.
///
/// Under the reverse strategy the companion buffer is boosted in the same
/// per-span pass, over the same sanitized span mapped onto the companion's
/// own sample grid. Every companion channel is boosted, whatever the
/// primary's channel count.
#[derive(Debug, Clone)]
pub struct CensorEngine {
    config: CensorConfig,
    sanitizer: TimingSanitizer,
}

impl CensorEngine {
    pub fn new(config: CensorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sanitizer: TimingSanitizer::default(),
        })
    }

    pub fn with_sanitizer(mut self, sanitizer: TimingSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &CensorConfig {
        &self.config
    }

    pub fn strategy(&self) -> CensorStrategy {
        self.config.strategy
    }

    /// Sanitize spans and map them onto sample ranges without touching audio
    pub fn plan(&self, spans: &[WordSpan], sample_rate: u32, frames: usize) -> Vec<PlannedSegment> {
        self.sanitizer
            .sanitize_all(spans)
            .into_iter()
            .map(|adjusted| {
                let range = SampleRange::from_span(
                    &adjusted,
                    self.config.pre_margin_ms,
                    self.config.post_margin_ms,
                    sample_rate,
                    frames,
                );
                let duration_ms =
                    adjusted.duration_ms() + self.config.pre_margin_ms + self.config.post_margin_ms;
                PlannedSegment {
                    span: adjusted,
                    range,
                    duration_ms,
                }
            })
            .collect()
    }

    /// Censor the primary buffer only
    pub fn censor(&self, primary: &AudioBuffer, spans: &[WordSpan]) -> Result<CensorOutput> {
        self.censor_with_companion(primary, None, spans)
    }

    /// Censor the primary buffer and, in reverse mode, compensate the companion.
    ///
    /// Neither input is modified; the output holds fresh buffers.
    pub fn censor_with_companion(
        &self,
        primary: &AudioBuffer,
        companion: Option<&AudioBuffer>,
        spans: &[WordSpan],
    ) -> Result<CensorOutput> {
        let sample_rate = primary.sample_rate();
        self.check_sample_rate(sample_rate)?;

        info!(
            "Applying {} censoring to {} spans ({} channel(s), {:.2}s)",
            self.config.strategy,
            spans.len(),
            primary.channel_count(),
            primary.duration_secs()
        );

        let mut audio = primary.clone();
        let mut companion = self.prepare_companion(companion);
        let compensating = companion.as_ref().is_some_and(|c| !c.is_empty())
            && self.config.compensate
            && self.config.strategy == CensorStrategy::Reverse;

        let masker = SegmentMasker::new(&self.config, sample_rate);

        let mut stats = CensoringStats {
            total_segments: spans.len(),
            censored_duration_ms: 0.0,
            strategy: self.config.strategy,
            skipped_segments: 0,
            companion_boosted: false,
            segments: Vec::with_capacity(spans.len()),
        };

        for planned in self.plan(spans, sample_rate, audio.frames()) {
            let PlannedSegment {
                span,
                range,
                duration_ms,
            } = planned;
            let skipped = range.is_empty();

            if skipped {
                debug!(
                    "Span '{}' at {:.0}ms-{:.0}ms is outside the buffer, skipping",
                    span.word, span.start_ms, span.end_ms
                );
                stats.skipped_segments += 1;
            } else {
                debug!(
                    "Censoring '{}': {:.0}ms-{:.0}ms (samples {}-{})",
                    span.word, span.start_ms, span.end_ms, range.start, range.end
                );

                for channel in audio.channels_mut() {
                    masker.mask(channel, range);
                }

                if compensating {
                    if let Some(companion) = companion.as_mut() {
                        let companion_rate = companion.sample_rate();
                        let companion_range = SampleRange::from_span(
                            &span,
                            self.config.pre_margin_ms,
                            self.config.post_margin_ms,
                            companion_rate,
                            companion.frames(),
                        );
                        let boost_fade =
                            FadeEnvelope::fade_samples(self.config.companion_fade_ms, companion_rate);
                        for channel in companion.channels_mut() {
                            boost_range(
                                channel,
                                companion_range,
                                self.config.companion_boost,
                                boost_fade,
                            );
                        }
                        stats.companion_boosted |= !companion_range.is_empty();
                        debug!(
                            "Boosted companion by {:.1}x during '{}'",
                            self.config.companion_boost, span.word
                        );
                    }
                }

                stats.censored_duration_ms += duration_ms;
            }

            stats.segments.push(SegmentStats {
                word: span.word,
                confidence: span.confidence,
                original_start_ms: span.original_start_ms,
                original_end_ms: span.original_end_ms,
                start_ms: span.start_ms,
                end_ms: span.end_ms,
                duration_ms,
                compressed: span.compressed,
                start_sample: range.start,
                end_sample: range.end,
                skipped,
            });
        }

        info!(
            "Censored {} of {} spans ({:.0}ms total)",
            stats.total_segments - stats.skipped_segments,
            stats.total_segments,
            stats.censored_duration_ms
        );

        Ok(CensorOutput {
            audio,
            companion,
            stats,
        })
    }

    fn check_sample_rate(&self, sample_rate: u32) -> Result<()> {
        if self.config.strategy == CensorStrategy::Tone {
            let nyquist = sample_rate as f32 / 2.0;
            if self.config.tone_frequency_hz >= nyquist {
                return Err(config_error(
                    "tone_frequency_hz",
                    format!(
                        "Tone of {}Hz cannot be represented at {}Hz sample rate",
                        self.config.tone_frequency_hz, sample_rate
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Working copy of the companion at its native rate; rate matching is the mixer's job
    fn prepare_companion(&self, companion: Option<&AudioBuffer>) -> Option<AudioBuffer> {
        let companion = companion?;
        if self.config.strategy == CensorStrategy::Reverse
            && self.config.compensate
            && companion.is_empty()
        {
            warn!("Companion buffer is empty, skipping compensation");
        }
        Some(companion.clone())
    }
}

/// Multiply `range` by `boost`, ramping the gain in and out over `fade_samples`.
///
/// The gain is blended from 1.0 rather than the samples being hard
/// multiplied, so the level change has no step at either edge.
fn boost_range(channel: &mut [f32], range: SampleRange, boost: f32, fade_samples: usize) {
    let end = range.end.min(channel.len());
    if range.start >= end {
        return;
    }

    let segment = &mut channel[range.start..end];
    let len = segment.len();
    let fade = fade_samples.min(len / 4);

    for (i, sample) in segment.iter_mut().enumerate() {
        let blend = if i < fade {
            i as f32 / fade as f32
        } else if i >= len - fade {
            (len - 1 - i) as f32 / fade as f32
        } else {
            1.0
        };
        *sample *= 1.0 + (boost - 1.0) * blend;
    }
}
