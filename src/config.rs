use serde::{Deserialize, Serialize};

use crate::error::{config_error, Result};
use crate::fade::FadeShape;
use crate::masker::CensorStrategy;
use crate::tone::{DEFAULT_TONE_AMPLITUDE, DEFAULT_TONE_FREQUENCY_HZ};

/// Audible tone range accepted for tone masking
const TONE_FREQUENCY_RANGE: std::ops::RangeInclusive<f32> = 20.0..=20000.0;
/// Accepted range for the mixer's per-input gains
const MIX_GAIN_RANGE: std::ops::RangeInclusive<f32> = 0.0..=4.0;

/// Masking parameters for one censoring pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensorConfig {
    /// Length of the click-suppression ramps in milliseconds
    pub fade_ms: f64,
    /// Extra time masked before each span
    pub pre_margin_ms: f64,
    /// Extra time masked after each span
    pub post_margin_ms: f64,
    pub strategy: CensorStrategy,
    pub fade_shape: FadeShape,
    pub tone_frequency_hz: f32,
    pub tone_amplitude: f32,
    /// Gain applied to reversed audio
    pub reverse_gain: f32,
    /// Upper bound on the edge ramp of reversed audio, in samples
    pub reverse_edge_samples: usize,
    /// Gain applied to the companion buffer under reversed spans
    pub companion_boost: f32,
    pub companion_fade_ms: f64,
    /// Boost the companion buffer in reverse mode
    pub compensate: bool,
}

impl Default for CensorConfig {
    fn default() -> Self {
        Self {
            fade_ms: 25.0,
            pre_margin_ms: 0.0,
            post_margin_ms: 25.0,
            strategy: CensorStrategy::Mute,
            fade_shape: FadeShape::Linear,
            tone_frequency_hz: DEFAULT_TONE_FREQUENCY_HZ,
            tone_amplitude: DEFAULT_TONE_AMPLITUDE,
            reverse_gain: 0.3,
            reverse_edge_samples: 50,
            companion_boost: 1.4,
            companion_fade_ms: 50.0,
            compensate: true,
        }
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(config_error(
            field,
            format!("Value must be a non-negative number, got {}", value),
        ));
    }
    Ok(())
}

fn check_range(field: &str, value: f32, range: std::ops::RangeInclusive<f32>) -> Result<()> {
    if !range.contains(&value) {
        return Err(config_error(
            field,
            format!(
                "Value must be between {} and {}, got {}",
                range.start(),
                range.end(),
                value
            ),
        ));
    }
    Ok(())
}

impl CensorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        check_non_negative("fade_ms", self.fade_ms)?;
        check_non_negative("pre_margin_ms", self.pre_margin_ms)?;
        check_non_negative("post_margin_ms", self.post_margin_ms)?;
        check_non_negative("companion_fade_ms", self.companion_fade_ms)?;
        check_range("tone_frequency_hz", self.tone_frequency_hz, TONE_FREQUENCY_RANGE)?;
        check_range("tone_amplitude", self.tone_amplitude, 0.0..=1.0)?;
        check_range("reverse_gain", self.reverse_gain, 0.0..=1.0)?;
        check_range("companion_boost", self.companion_boost, 1.0..=4.0)?;
        Ok(())
    }
}

/// Gain and limiting parameters for combining two buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub primary_gain: f32,
    pub companion_gain: f32,
    /// Peak level above which the mix is scaled down
    pub peak_ceiling: f32,
    /// Rebalance the mix towards the summed RMS of its inputs
    pub preserve_energy: bool,
    pub max_energy_boost: f32,
    /// Relative RMS deviation tolerated before rebalancing
    pub energy_tolerance: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            primary_gain: 1.0,
            companion_gain: 1.0,
            peak_ceiling: 0.95,
            preserve_energy: false,
            max_energy_boost: 1.2,
            energy_tolerance: 0.1,
        }
    }
}

impl MixConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("primary_gain", self.primary_gain, MIX_GAIN_RANGE)?;
        check_range("companion_gain", self.companion_gain, MIX_GAIN_RANGE)?;
        if !(self.peak_ceiling > 0.0 && self.peak_ceiling <= 1.0) {
            return Err(config_error(
                "peak_ceiling",
                format!("Peak ceiling must be in (0.0, 1.0], got {}", self.peak_ceiling),
            ));
        }
        check_range("max_energy_boost", self.max_energy_boost, 1.0..=4.0)?;
        check_range("energy_tolerance", self.energy_tolerance, 0.0..=1.0)?;
        Ok(())
    }
}

/// Full configuration for a censor-and-remix run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub censor: CensorConfig,
    pub mix: MixConfig,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.censor.validate()?;
        self.mix.validate()
    }
}

/// Builder pattern for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    fade_ms: Option<f64>,
    pre_margin_ms: Option<f64>,
    post_margin_ms: Option<f64>,
    strategy: Option<CensorStrategy>,
    fade_shape: Option<FadeShape>,
    tone_frequency_hz: Option<f32>,
    reverse_gain: Option<f32>,
    companion_boost: Option<f32>,
    compensate: Option<bool>,
    primary_gain: Option<f32>,
    companion_gain: Option<f32>,
    preserve_energy: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fade_ms(mut self, fade_ms: f64) -> Result<Self> {
        check_non_negative("fade_ms", fade_ms)?;
        self.fade_ms = Some(fade_ms);
        Ok(self)
    }

    pub fn pre_margin_ms(mut self, margin: f64) -> Result<Self> {
        check_non_negative("pre_margin_ms", margin)?;
        self.pre_margin_ms = Some(margin);
        Ok(self)
    }

    pub fn post_margin_ms(mut self, margin: f64) -> Result<Self> {
        check_non_negative("post_margin_ms", margin)?;
        self.post_margin_ms = Some(margin);
        Ok(self)
    }

    pub fn strategy(mut self, strategy: CensorStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn fade_shape(mut self, shape: FadeShape) -> Self {
        self.fade_shape = Some(shape);
        self
    }

    pub fn tone_frequency_hz(mut self, frequency: f32) -> Result<Self> {
        check_range("tone_frequency_hz", frequency, TONE_FREQUENCY_RANGE)?;
        self.tone_frequency_hz = Some(frequency);
        Ok(self)
    }

    pub fn reverse_gain(mut self, gain: f32) -> Result<Self> {
        check_range("reverse_gain", gain, 0.0..=1.0)?;
        self.reverse_gain = Some(gain);
        Ok(self)
    }

    pub fn companion_boost(mut self, boost: f32) -> Result<Self> {
        check_range("companion_boost", boost, 1.0..=4.0)?;
        self.companion_boost = Some(boost);
        Ok(self)
    }

    pub fn compensate(mut self, enabled: bool) -> Self {
        self.compensate = Some(enabled);
        self
    }

    pub fn primary_gain(mut self, gain: f32) -> Result<Self> {
        check_range("primary_gain", gain, MIX_GAIN_RANGE)?;
        self.primary_gain = Some(gain);
        Ok(self)
    }

    pub fn companion_gain(mut self, gain: f32) -> Result<Self> {
        check_range("companion_gain", gain, MIX_GAIN_RANGE)?;
        self.companion_gain = Some(gain);
        Ok(self)
    }

    pub fn preserve_energy(mut self, enabled: bool) -> Self {
        self.preserve_energy = Some(enabled);
        self
    }

    pub fn build(self) -> Result<Config> {
        let censor_defaults = CensorConfig::default();
        let mix_defaults = MixConfig::default();

        let config = Config {
            censor: CensorConfig {
                fade_ms: self.fade_ms.unwrap_or(censor_defaults.fade_ms),
                pre_margin_ms: self.pre_margin_ms.unwrap_or(censor_defaults.pre_margin_ms),
                post_margin_ms: self.post_margin_ms.unwrap_or(censor_defaults.post_margin_ms),
                strategy: self.strategy.unwrap_or(censor_defaults.strategy),
                fade_shape: self.fade_shape.unwrap_or(censor_defaults.fade_shape),
                tone_frequency_hz: self
                    .tone_frequency_hz
                    .unwrap_or(censor_defaults.tone_frequency_hz),
                reverse_gain: self.reverse_gain.unwrap_or(censor_defaults.reverse_gain),
                companion_boost: self.companion_boost.unwrap_or(censor_defaults.companion_boost),
                compensate: self.compensate.unwrap_or(censor_defaults.compensate),
                ..censor_defaults
            },
            mix: MixConfig {
                primary_gain: self.primary_gain.unwrap_or(mix_defaults.primary_gain),
                companion_gain: self.companion_gain.unwrap_or(mix_defaults.companion_gain),
                preserve_energy: self.preserve_energy.unwrap_or(mix_defaults.preserve_energy),
                ..mix_defaults
            },
        };

        config.validate()?;
        Ok(config)
    }
}
