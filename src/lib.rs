// Core modules
pub mod audio;
pub mod censoring;
pub mod config;
pub mod config_file;
pub mod error;
pub mod fade;
pub mod masker;
pub mod mixer;
pub mod progress;
pub mod quality;
pub mod report;
pub mod timing;
pub mod tone;

// Re-export commonly used types
pub use audio::{read_wav, write_wav, AudioBuffer, WavEncoding};
pub use censoring::{CensorEngine, CensorOutput, CensoringStats, PlannedSegment, SegmentStats};
pub use config::{CensorConfig, Config, ConfigBuilder, MixConfig};
pub use config_file::{ConfigFile, ProfileConfig};
pub use error::{HushmixError, Result};
pub use fade::{FadeEnvelope, FadeShape};
pub use masker::{CensorStrategy, SampleRange, SegmentMasker};
pub use mixer::{MixResult, MixSummary, Mixer};
pub use progress::ProgressOperation;
pub use quality::{analyze_quality, QualityAnalysis, QualityRating};
pub use report::{CensorReport, ReportBuilder};
pub use timing::{load_spans, AdjustedSpan, TimingSanitizer, WordSpan};
pub use tone::ToneSynthesizer;
