use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{config_error, IntoHushmixError, Result};

/// Spans longer than this are treated as alignment errors
pub const LONG_SPAN_THRESHOLD_MS: f64 = 1500.0;
/// Upper bound on a compressed span's duration
pub const MAX_COMPRESSED_MS: f64 = 800.0;
/// Fraction of the original duration kept when compressing
pub const COMPRESSION_RATIO: f64 = 0.6;

fn default_confidence() -> f64 {
    1.0
}

/// A word to be masked, as produced by the transcription and detection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSpan {
    pub word: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl WordSpan {
    pub fn new(word: impl Into<String>, start: f64, end: f64, confidence: f64) -> Self {
        Self {
            word: word.into().trim().to_string(),
            start,
            end,
            confidence,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        (self.end - self.start) * 1000.0
    }

    fn validate(&self, index: usize) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(config_error(
                "spans",
                format!("span {} ('{}') has non-finite timing", index, self.word),
            ));
        }
        if self.start > self.end {
            return Err(config_error(
                "spans",
                format!(
                    "span {} ('{}') has invalid timing {:.3}s-{:.3}s",
                    index, self.word, self.start, self.end
                ),
            ));
        }
        if self.start < 0.0 {
            warn!(
                "span {} ('{}') starts before the audio at {:.3}s, masking from 0",
                index, self.word, self.start
            );
        }
        Ok(())
    }
}

/// Span timing after sanitization, in milliseconds.
///
/// Derived from a `WordSpan`; the source span is never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedSpan {
    pub word: String,
    pub confidence: f64,
    pub original_start_ms: f64,
    pub original_end_ms: f64,
    pub start_ms: f64,
    pub end_ms: f64,
    /// Whether the end time was pulled in
    pub compressed: bool,
}

impl AdjustedSpan {
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Corrects implausibly long word spans before masking.
///
/// Long spans usually come from alignment failures on fast speech. The
/// onset is kept and the tail is shortened to
/// `min(max_compressed_ms, ratio * duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSanitizer {
    pub threshold_ms: f64,
    pub max_compressed_ms: f64,
    pub ratio: f64,
}

impl Default for TimingSanitizer {
    fn default() -> Self {
        Self {
            threshold_ms: LONG_SPAN_THRESHOLD_MS,
            max_compressed_ms: MAX_COMPRESSED_MS,
            ratio: COMPRESSION_RATIO,
        }
    }
}

impl TimingSanitizer {
    pub fn sanitize(&self, span: &WordSpan) -> AdjustedSpan {
        let original_start_ms = span.start * 1000.0;
        let original_end_ms = span.end * 1000.0;
        let duration = original_end_ms - original_start_ms;

        let (end_ms, compressed) = if duration > self.threshold_ms {
            let compressed_duration = self.max_compressed_ms.min(duration * self.ratio);
            warn!(
                "Suspicious duration for '{}': {:.0}ms, adjusted to {:.0}ms-{:.0}ms",
                span.word,
                duration,
                original_start_ms,
                original_start_ms + compressed_duration
            );
            (original_start_ms + compressed_duration, true)
        } else {
            (original_end_ms, false)
        };

        AdjustedSpan {
            word: span.word.clone(),
            confidence: span.confidence,
            original_start_ms,
            original_end_ms,
            start_ms: original_start_ms,
            end_ms,
            compressed,
        }
    }

    pub fn sanitize_all(&self, spans: &[WordSpan]) -> Vec<AdjustedSpan> {
        spans.iter().map(|s| self.sanitize(s)).collect()
    }
}

/// Validate spans and order them by start time
pub fn prepare_spans(mut spans: Vec<WordSpan>) -> Result<Vec<WordSpan>> {
    for (index, span) in spans.iter_mut().enumerate() {
        span.validate(index)?;
        span.word = span.word.trim().to_string();
    }
    spans.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(spans)
}

/// Load word spans from a JSON array of `{word, start, end, confidence}`
pub async fn load_spans<P: AsRef<Path>>(path: P) -> Result<Vec<WordSpan>> {
    let contents = tokio::fs::read_to_string(path.as_ref())
        .await
        .with_path(path.as_ref().to_path_buf())?;

    let spans: Vec<WordSpan> = serde_json::from_str(&contents).map_err(|e| {
        config_error("spans", format!("Failed to parse spans JSON: {}", e))
    })?;

    debug!("Loaded {} spans from {:?}", spans.len(), path.as_ref());
    prepare_spans(spans)
}
