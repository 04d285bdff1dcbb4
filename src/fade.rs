use serde::{Deserialize, Serialize};

use crate::error::{config_error, HushmixError, Result};

/// Interpolation curve of a fade ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeShape {
    #[default]
    Linear,
    /// Square of the linear ramp, gentler at the quiet end
    Quadratic,
}

impl FadeShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeShape::Linear => "linear",
            FadeShape::Quadratic => "quadratic",
        }
    }
}

impl std::str::FromStr for FadeShape {
    type Err = HushmixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeShape::Linear),
            "quadratic" | "exponential" => Ok(FadeShape::Quadratic),
            _ => Err(config_error(
                "fade_shape",
                format!("Invalid fade shape '{}'. Valid options: linear, quadratic", s),
            )),
        }
    }
}

/// Produces monotonic gain ramps between 0 and 1.
///
/// Ramps include both endpoints: an ascending ramp of `n` samples starts at
/// exactly 0.0 and ends at exactly 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FadeEnvelope {
    pub shape: FadeShape,
}

impl FadeEnvelope {
    pub fn new(shape: FadeShape) -> Self {
        Self { shape }
    }

    /// `fade_ms * sample_rate / 1000`, truncated
    pub fn fade_samples(fade_ms: f64, sample_rate: u32) -> usize {
        if fade_ms <= 0.0 {
            return 0;
        }
        (fade_ms * sample_rate as f64 / 1000.0) as usize
    }

    fn curve(&self, t: f32) -> f32 {
        match self.shape {
            FadeShape::Linear => t,
            FadeShape::Quadratic => t * t,
        }
    }

    /// Ascending ramp, 0.0 to 1.0
    pub fn ramp_in(&self, n: usize) -> Vec<f32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.curve(0.0)],
            _ => {
                let last = (n - 1) as f32;
                (0..n).map(|i| self.curve(i as f32 / last)).collect()
            }
        }
    }

    /// Descending ramp, 1.0 to 0.0
    pub fn ramp_out(&self, n: usize) -> Vec<f32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.curve(1.0)],
            _ => {
                let last = (n - 1) as f32;
                (0..n).map(|i| self.curve(1.0 - i as f32 / last)).collect()
            }
        }
    }

    /// Fade both ends of `samples` in place.
    ///
    /// The ramp length is capped at a quarter of the slice so the two ramps
    /// never meet. Returns the ramp length actually used; 0 means untouched.
    pub fn apply(&self, samples: &mut [f32], fade_samples: usize) -> usize {
        let n = fade_samples.min(samples.len() / 4);
        if n == 0 {
            return 0;
        }

        let len = samples.len();
        for (sample, gain) in samples[..n].iter_mut().zip(self.ramp_in(n)) {
            *sample *= gain;
        }
        for (sample, gain) in samples[len - n..].iter_mut().zip(self.ramp_out(n)) {
            *sample *= gain;
        }
        n
    }

    /// Multiply the whole slice by an ascending ramp
    pub fn fade_in(&self, samples: &mut [f32]) {
        let ramp = self.ramp_in(samples.len());
        for (sample, gain) in samples.iter_mut().zip(ramp) {
            *sample *= gain;
        }
    }

    /// Multiply the whole slice by a descending ramp
    pub fn fade_out(&self, samples: &mut [f32]) {
        let ramp = self.ramp_out(samples.len());
        for (sample, gain) in samples.iter_mut().zip(ramp) {
            *sample *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fade_samples_conversion() {
        assert_eq!(FadeEnvelope::fade_samples(25.0, 16000), 400);
        assert_eq!(FadeEnvelope::fade_samples(10.0, 44100), 441);
        assert_eq!(FadeEnvelope::fade_samples(0.0, 44100), 0);
    }

    #[test]
    fn test_linear_ramps_hit_endpoints() {
        let envelope = FadeEnvelope::default();
        let up = envelope.ramp_in(5);
        assert_eq!(up, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let down = envelope.ramp_out(5);
        assert_eq!(down, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_quadratic_ramp_is_monotonic() {
        let ramp = FadeEnvelope::new(FadeShape::Quadratic).ramp_in(64);
        assert_eq!(ramp[0], 0.0);
        assert_eq!(ramp[63], 1.0);
        assert!(ramp.windows(2).all(|w| w[0] <= w[1]));
        assert_abs_diff_eq!(ramp[32], (32.0f32 / 63.0).powi(2));
    }

    #[test]
    fn test_apply_caps_at_quarter_length() {
        let mut samples = vec![1.0f32; 20];
        let used = FadeEnvelope::default().apply(&mut samples, 100);

        assert_eq!(used, 5);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[19], 0.0);
        assert!(samples[5..15].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_apply_noop_when_too_short() {
        let mut samples = vec![0.5f32; 3];
        assert_eq!(FadeEnvelope::default().apply(&mut samples, 10), 0);
        assert_eq!(samples, vec![0.5; 3]);

        let mut samples = vec![0.5f32; 40];
        assert_eq!(FadeEnvelope::default().apply(&mut samples, 0), 0);
        assert!(samples.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_single_sided_fades() {
        let mut rising = vec![1.0f32; 3];
        FadeEnvelope::default().fade_in(&mut rising);
        assert_eq!(rising, vec![0.0, 0.5, 1.0]);

        let mut falling = vec![1.0f32; 3];
        FadeEnvelope::default().fade_out(&mut falling);
        assert_eq!(falling, vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("Linear".parse::<FadeShape>().unwrap(), FadeShape::Linear);
        assert_eq!("quadratic".parse::<FadeShape>().unwrap(), FadeShape::Quadratic);
        assert!("cosine".parse::<FadeShape>().is_err());
    }
}
