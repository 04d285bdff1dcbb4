use log::{debug, info};
use std::io::BufWriter;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{buffer_error, HushmixError, IntoHushmixError, Result};

/// Supported audio container extensions
const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

/// Sample encoding used when writing WAV files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavEncoding {
    /// 32-bit IEEE float, keeps the full dynamic range of the buffer
    #[default]
    Float32,
    /// 16-bit PCM, samples are clamped to [-1.0, 1.0]
    Pcm16,
}

/// Planar multi-channel sample buffer.
///
/// All channels share one length and one sample rate. The constructors
/// enforce this, so code holding an `AudioBuffer` can index channels
/// freely without re-checking shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(buffer_error("sample rate must be positive"));
        }
        if channels.is_empty() {
            return Err(buffer_error("buffer must have at least one channel"));
        }
        let frames = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != frames)
        {
            return Err(buffer_error(format!(
                "channel {} has {} samples, expected {}",
                index,
                channel.len(),
                frames
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Build a single-channel buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Build a buffer of silence
    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    /// Deinterleave `[L0, R0, L1, R1, ...]` style data
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(buffer_error("buffer must have at least one channel"));
        }
        if samples.len() % channel_count != 0 {
            return Err(buffer_error(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Interleave channels into a single vector
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for frame in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(|c| c.as_mut_slice())
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Root mean square over every sample of every channel
    pub fn rms(&self) -> f32 {
        let count = self.frames() * self.channel_count();
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        (sum / count as f64).sqrt() as f32
    }

    /// Multiply every sample by `factor`
    pub fn scale(&mut self, factor: f32) {
        for channel in &mut self.channels {
            for sample in channel.iter_mut() {
                *sample *= factor;
            }
        }
    }

    /// Linear-interpolation resampling of every channel to `target_rate`.
    ///
    /// Returns a plain copy when the rates already match.
    pub fn resampled(&self, target_rate: u32) -> Result<Self> {
        if target_rate == self.sample_rate || self.is_empty() {
            return Self::new(self.channels.clone(), target_rate);
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let output_frames = (self.frames() as f64 * ratio) as usize;
        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} frames)",
            self.frames(),
            self.sample_rate,
            target_rate,
            output_frames
        );

        let channels = self
            .channels
            .iter()
            .map(|samples| {
                let mut output = vec![0.0f32; output_frames];
                for (i, sample) in output.iter_mut().enumerate() {
                    let source_index = i as f64 / ratio;
                    let index = source_index as usize;
                    let fraction = (source_index - index as f64) as f32;

                    if index + 1 < samples.len() {
                        *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
                    } else if index < samples.len() {
                        *sample = samples[index];
                    }
                }
                output
            })
            .collect();

        Self::new(channels, target_rate)
    }

    /// Duplicate a mono buffer across `channel_count` channels.
    ///
    /// Buffers that already have `channel_count` channels are copied as-is;
    /// anything else would need a downmix and is rejected.
    pub fn with_channels(&self, channel_count: usize) -> Result<Self> {
        if channel_count == self.channel_count() {
            return Ok(self.clone());
        }
        if self.channel_count() != 1 {
            return Err(buffer_error(format!(
                "cannot map {} channels onto {} channels",
                self.channel_count(),
                channel_count
            )));
        }
        Self::new(vec![self.channels[0].clone(); channel_count], self.sample_rate)
    }

    /// Copy of the first `frames` samples of every channel
    pub fn truncated(&self, frames: usize) -> Self {
        let frames = frames.min(self.frames());
        Self {
            channels: self.channels.iter().map(|c| c[..frames].to_vec()).collect(),
            sample_rate: self.sample_rate,
        }
    }
}

/// Reject paths whose extension is not a supported audio container
pub fn validate_audio_path(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(HushmixError::UnsupportedFormat {
            extension,
            supported: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}

/// Decode a WAV file into a planar buffer.
///
/// Any failure to open or decode the file is reported as one
/// `AudioDecode` error; no partially decoded buffer is returned.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    validate_audio_path(path)?;

    let decode_error = |message: String| HushmixError::AudioDecode {
        path: path.to_path_buf(),
        message,
    };

    let reader = hound::WavReader::open(path).map_err(|e| decode_error(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| decode_error(e.to_string()))?
        }
    };

    let buffer = AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)
        .map_err(|e| decode_error(e.to_string()))?;

    info!(
        "Loaded {:?}: {} channel(s), {}Hz, {:.2}s",
        path,
        buffer.channel_count(),
        buffer.sample_rate(),
        buffer.duration_secs()
    );
    Ok(buffer)
}

/// Encode a buffer as WAV.
///
/// The data is written to a temporary file next to `path` and moved into
/// place only once encoding has finished.
pub fn write_wav(buffer: &AudioBuffer, path: &Path, encoding: WavEncoding) -> Result<()> {
    validate_audio_path(path)?;

    let encode_error = |message: String| HushmixError::AudioEncode {
        path: path.to_path_buf(),
        message,
    };

    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| encode_error(format!("too many channels: {}", buffer.channel_count())))?;
    let spec = match encoding {
        WavEncoding::Float32 => hound::WavSpec {
            channels,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
        WavEncoding::Pcm16 => hound::WavSpec {
            channels,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(directory).with_path(directory.to_path_buf())?;

    {
        let mut writer = hound::WavWriter::new(BufWriter::new(temp.as_file_mut()), spec)
            .map_err(|e| encode_error(e.to_string()))?;
        for sample in buffer.to_interleaved() {
            let written = match encoding {
                WavEncoding::Float32 => writer.write_sample(sample),
                WavEncoding::Pcm16 => {
                    let clamped = sample.clamp(-1.0, 1.0);
                    writer.write_sample((clamped * i16::MAX as f32) as i16)
                }
            };
            written.map_err(|e| encode_error(e.to_string()))?;
        }
        writer.finalize().map_err(|e| encode_error(e.to_string()))?;
    }

    temp.persist(path)
        .map_err(|e| e.error)
        .with_path(path.to_path_buf())?;

    info!(
        "Wrote {:?}: {} channel(s), {}Hz, {:.2}s ({:?})",
        path,
        buffer.channel_count(),
        buffer.sample_rate(),
        buffer.duration_secs(),
        encoding
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_buffer_rejects_ragged_channels() {
        let result = AudioBuffer::new(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(matches!(result, Err(HushmixError::InvalidBuffer { .. })));
    }

    #[test]
    fn test_buffer_rejects_zero_rate_and_no_channels() {
        assert!(AudioBuffer::mono(vec![0.0; 4], 0).is_err());
        assert!(AudioBuffer::new(Vec::new(), 16000).is_err());
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 8000).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_peak_and_rms() {
        let buffer = AudioBuffer::new(vec![vec![0.5, -0.5], vec![0.5, -0.8]], 8000).unwrap();
        assert_abs_diff_eq!(buffer.peak(), 0.8);
        let expected = ((0.25 + 0.25 + 0.25 + 0.64) / 4.0f32).sqrt();
        assert_abs_diff_eq!(buffer.rms(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_resample_doubles_length() {
        let buffer = AudioBuffer::mono(vec![0.0, 1.0, 0.0, -1.0], 8000).unwrap();
        let resampled = buffer.resampled(16000).unwrap();
        assert_eq!(resampled.sample_rate(), 16000);
        assert_eq!(resampled.frames(), 8);
        assert_abs_diff_eq!(resampled.channel(0)[1], 0.5);
        assert_abs_diff_eq!(resampled.channel(0)[2], 1.0);
    }

    #[test]
    fn test_with_channels_duplicates_mono_only() {
        let mono = AudioBuffer::mono(vec![0.1, 0.2], 8000).unwrap();
        let stereo = mono.with_channels(2).unwrap();
        assert_eq!(stereo.channel(0), stereo.channel(1));

        let quad = AudioBuffer::silent(4, 2, 8000).unwrap();
        assert!(quad.with_channels(2).is_err());
    }

    #[test]
    fn test_validate_audio_path() {
        assert!(validate_audio_path(Path::new("song.WAV")).is_ok());
        assert!(matches!(
            validate_audio_path(Path::new("song.mp3")),
            Err(HushmixError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_wav_float_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.wav");
        let buffer = AudioBuffer::new(vec![vec![0.25, -0.5, 0.75], vec![0.0, 0.1, -0.1]], 22050).unwrap();

        write_wav(&buffer, &path, WavEncoding::Float32).unwrap();
        let loaded = read_wav(&path).unwrap();

        assert_eq!(loaded, buffer);
    }

    #[test]
    fn test_wav_pcm16_clamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clamped.wav");
        let buffer = AudioBuffer::mono(vec![1.5, -1.5, 0.5], 16000).unwrap();

        write_wav(&buffer, &path, WavEncoding::Pcm16).unwrap();
        let loaded = read_wav(&path).unwrap();

        assert_abs_diff_eq!(loaded.channel(0)[0], 32767.0 / 32768.0, epsilon = 1e-6);
        assert_abs_diff_eq!(loaded.channel(0)[1], -32767.0 / 32768.0, epsilon = 1e-6);
        assert_abs_diff_eq!(loaded.channel(0)[2], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_read_wav_reports_decode_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, b"not a wav file").unwrap();

        assert!(matches!(read_wav(&path), Err(HushmixError::AudioDecode { .. })));
    }
}
