use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::censoring::CensoringStats;
use crate::config::CensorConfig;
use crate::error::{HushmixError, IntoHushmixError, Result};
use crate::masker::CensorStrategy;
use crate::mixer::MixSummary;
use crate::quality::QualityAnalysis;
use crate::timing::WordSpan;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub source_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub generated_at: DateTime<Utc>,
    pub strategy: CensorStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub original_duration_seconds: f64,
    pub censored_duration_seconds: f64,
    pub total_censored_ms: f64,
    pub censorship_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub total_words: usize,
    pub unique_words: usize,
    pub spans: Vec<WordSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSettings {
    pub fade_ms: f64,
    pub pre_margin_ms: f64,
    pub post_margin_ms: f64,
    pub strategy: CensorStrategy,
}

impl From<&CensorConfig> for ReportSettings {
    fn from(config: &CensorConfig) -> Self {
        Self {
            fade_ms: config.fade_ms,
            pre_margin_ms: config.pre_margin_ms,
            post_margin_ms: config.post_margin_ms,
            strategy: config.strategy,
        }
    }
}

/// Complete record of one censoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensorReport {
    pub metadata: ReportMetadata,
    pub audio_info: AudioInfo,
    pub detection: DetectionSummary,
    pub settings: ReportSettings,
    pub statistics: CensoringStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix: Option<MixSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityAnalysis>,
}

impl CensorReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| HushmixError::Processing {
            message: format!("Failed to serialize report: {}", e),
        })
    }

    /// Save the report as pretty-printed JSON
    pub async fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_content = self.to_json()?;
        fs::write(path.as_ref(), json_content)
            .await
            .with_path(path.as_ref().to_path_buf())?;
        log::info!("Censoring report saved: {}", path.as_ref().display());
        Ok(())
    }
}

/// Assembles a `CensorReport` from engine statistics and buffer facts
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    stats: CensoringStats,
    settings: Option<ReportSettings>,
    spans: Vec<WordSpan>,
    source_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    original_duration: f64,
    censored_duration: f64,
    mix: Option<MixSummary>,
    quality: Option<QualityAnalysis>,
}

impl ReportBuilder {
    pub fn new(stats: CensoringStats) -> Self {
        Self {
            stats,
            settings: None,
            spans: Vec::new(),
            source_file: None,
            output_file: None,
            original_duration: 0.0,
            censored_duration: 0.0,
            mix: None,
            quality: None,
        }
    }

    pub fn settings(mut self, config: &CensorConfig) -> Self {
        self.settings = Some(ReportSettings::from(config));
        self
    }

    pub fn spans(mut self, spans: &[WordSpan]) -> Self {
        self.spans = spans.to_vec();
        self
    }

    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Durations in seconds of the input and the final output
    pub fn durations(mut self, original_seconds: f64, censored_seconds: f64) -> Self {
        self.original_duration = original_seconds;
        self.censored_duration = censored_seconds;
        self
    }

    pub fn mix(mut self, summary: MixSummary) -> Self {
        self.mix = Some(summary);
        self
    }

    /// Comparison of the final output against the unprocessed input
    pub fn quality(mut self, analysis: QualityAnalysis) -> Self {
        self.quality = Some(analysis);
        self
    }

    pub fn build(self) -> CensorReport {
        let total_censored_ms = self.stats.censored_duration_ms;
        let censorship_percentage = if self.original_duration > 0.0 {
            (total_censored_ms / 1000.0) / self.original_duration * 100.0
        } else {
            0.0
        };

        let unique_words = self
            .spans
            .iter()
            .map(|s| s.word.trim().to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let strategy = self.stats.strategy;
        let settings = self.settings.unwrap_or_else(|| ReportSettings {
            strategy,
            ..ReportSettings::from(&CensorConfig::default())
        });

        CensorReport {
            metadata: ReportMetadata {
                source_file: self.source_file,
                output_file: self.output_file,
                generated_at: Utc::now(),
                strategy,
            },
            audio_info: AudioInfo {
                original_duration_seconds: self.original_duration,
                censored_duration_seconds: self.censored_duration,
                total_censored_ms,
                censorship_percentage,
            },
            detection: DetectionSummary {
                total_words: self.spans.len(),
                unique_words,
                spans: self.spans,
            },
            settings,
            statistics: self.stats,
            mix: self.mix,
            quality: self.quality,
        }
    }
}
