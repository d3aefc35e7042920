//! Audio produced by the model and its cached WAV form.

use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;

use crate::{HuginnError, Result};

/// Raw model output: mono samples in [-1.0, 1.0] and their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl GeneratedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV container into mono `f32` samples.
    ///
    /// Multi-channel input is downmixed by averaging each frame.
    pub fn from_wav(data: &[u8]) -> Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(data))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok(Self::new(samples, spec.sample_rate))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Cached audio: 16-bit PCM mono WAV plus its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    wav: Bytes,
    sample_rate: u32,
    num_samples: usize,
}

impl AudioArtifact {
    /// Encode model output as a WAV artifact.
    ///
    /// Fails with [`HuginnError::EmptyAudio`] when there are no samples and
    /// with [`HuginnError::Audio`] on a zero sample rate.
    pub fn encode(audio: &GeneratedAudio) -> Result<Self> {
        if audio.samples.is_empty() {
            return Err(HuginnError::EmptyAudio);
        }
        if audio.sample_rate == 0 {
            return Err(HuginnError::Audio("sample rate must be non-zero".into()));
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buf = Vec::with_capacity(44 + audio.samples.len() * 2);
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)?;
            for &sample in &audio.samples {
                let clamped = sample.clamp(-1.0, 1.0);
                writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
            }
            writer.finalize()?;
        }

        Ok(Self {
            wav: Bytes::from(buf),
            sample_rate: audio.sample_rate,
            num_samples: audio.samples.len(),
        })
    }

    /// The WAV-encoded bytes. Cheap to clone.
    pub fn wav(&self) -> &Bytes {
        &self.wav
    }

    /// Size counted against the store's byte budget.
    pub fn size_bytes(&self) -> u64 {
        self.wav.len() as u64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.num_samples as f64 / f64::from(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize) -> GeneratedAudio {
        let samples = (0..len).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        GeneratedAudio::new(samples, 24_000)
    }

    #[test]
    fn encode_produces_pcm16_wav() {
        let artifact = AudioArtifact::encode(&tone(2_400)).unwrap();
        assert_eq!(artifact.sample_rate(), 24_000);
        assert_eq!(artifact.num_samples(), 2_400);
        assert_eq!(artifact.size_bytes(), 44 + 2_400 * 2);
        assert!((artifact.duration().as_secs_f64() - 0.1).abs() < 1e-9);
        assert_eq!(&artifact.wav()[..4], b"RIFF");
    }

    #[test]
    fn encoded_artifact_decodes_back() {
        let original = tone(480);
        let artifact = AudioArtifact::encode(&original).unwrap();
        let decoded = GeneratedAudio::from_wav(artifact.wav()).unwrap();
        assert_eq!(decoded.sample_rate, 24_000);
        assert_eq!(decoded.samples.len(), 480);
        for (a, b) in original.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn empty_audio_rejected() {
        let err = AudioArtifact::encode(&GeneratedAudio::new(vec![], 24_000)).unwrap_err();
        assert_eq!(err, HuginnError::EmptyAudio);
    }

    #[test]
    fn zero_sample_rate_rejected() {
        let err = AudioArtifact::encode(&GeneratedAudio::new(vec![0.1], 0)).unwrap_err();
        assert!(matches!(err, HuginnError::Audio(_)));
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let artifact = AudioArtifact::encode(&GeneratedAudio::new(vec![3.0, -3.0], 8_000)).unwrap();
        let decoded = GeneratedAudio::from_wav(artifact.wav()).unwrap();
        assert!(decoded.samples[0] > 0.99);
        assert!(decoded.samples[1] < -0.99);
    }

    #[test]
    fn stereo_input_is_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut buf = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
            for _ in 0..10 {
                writer.write_sample(0.5_f32).unwrap();
                writer.write_sample(-0.5_f32).unwrap();
            }
            writer.finalize().unwrap();
        }
        let decoded = GeneratedAudio::from_wav(&buf).unwrap();
        assert_eq!(decoded.samples.len(), 10);
        assert!(decoded.samples.iter().all(|s| s.abs() < 1e-6));
    }
}
