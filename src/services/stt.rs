//! Speech-to-text infrastructure.
//!
//! The session accumulates audio in an [`UtteranceBuffer`] while the user
//! speaks and ships the whole utterance to a [`SpeechToText`] backend when
//! they stop. The buffer keeps a short pre-speech tail while idle to
//! compensate for gate latency, so the first syllable is never clipped.

use crate::error::Result;
use async_trait::async_trait;

/// Result of transcribing one utterance.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
    pub confidence: Option<f32>,
}

/// Trait for transcription backends. Input is a complete WAV file.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcription>;
}

/// Accumulates one utterance of PCM16 mono audio.
#[derive(Debug)]
pub struct UtteranceBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    max_duration_secs: f32,
    pre_speech_secs: f32,
}

impl UtteranceBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
            max_duration_secs: 30.0,
            pre_speech_secs: 1.0,
        }
    }

    /// Cap the buffer duration; older audio is discarded. 0 disables.
    pub fn with_max_duration(mut self, secs: f32) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// How much audio to retain before speech starts.
    pub fn with_pre_speech_duration(mut self, secs: f32) -> Self {
        self.pre_speech_secs = secs;
        self
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn append(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);

        if self.max_duration_secs > 0.0 {
            let max_samples = self.duration_to_samples(self.max_duration_secs);
            if self.samples.len() > max_samples {
                let trim = self.samples.len() - max_samples;
                self.samples.drain(0..trim);
            }
        }
    }

    /// Keep only the pre-speech tail. Called while the user is not
    /// speaking so gate latency never clips the utterance start.
    pub fn trim_to_pre_speech(&mut self) {
        let keep = self.duration_to_samples(self.pre_speech_secs);
        if self.samples.len() > keep {
            let trim = self.samples.len() - keep;
            self.samples.drain(0..trim);
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        (self.samples.len() as f32 / self.channels as f32) / self.sample_rate as f32
    }

    /// Take the accumulated samples, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Take the accumulated audio encoded as a WAV file.
    pub fn take_as_wav(&mut self) -> Vec<u8> {
        let samples = self.take();
        encode_wav(&samples, self.sample_rate, self.channels)
    }

    fn duration_to_samples(&self, secs: f32) -> usize {
        (secs * self.sample_rate as f32) as usize * self.channels as usize
    }
}

/// Encode PCM16 samples as a WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * bits_per_sample as u32 / 8;
    let block_align = channels * bits_per_sample / 8;
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + samples.len() * 2);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&file_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_duration() {
        let mut buffer = UtteranceBuffer::new(16000, 1);
        buffer.append(&vec![0i16; 16000]);
        assert!((buffer.duration_secs() - 1.0).abs() < 0.001);
        assert_eq!(buffer.len(), 16000);
    }

    #[test]
    fn test_trim_to_pre_speech() {
        let mut buffer = UtteranceBuffer::new(16000, 1).with_pre_speech_duration(0.5);
        buffer.append(&vec![0i16; 32000]); // 2 seconds

        buffer.trim_to_pre_speech();
        assert!((buffer.duration_secs() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_max_duration_enforced() {
        let mut buffer = UtteranceBuffer::new(16000, 1).with_max_duration(1.0);
        buffer.append(&vec![0i16; 32000]); // 2 seconds
        assert!((buffer.duration_secs() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_max_duration_keeps_most_recent_audio() {
        let mut buffer = UtteranceBuffer::new(4, 1).with_max_duration(1.0);
        buffer.append(&[1, 2, 3, 4]);
        buffer.append(&[5, 6]);
        // Capacity is 4 samples; the oldest two are gone.
        assert_eq!(buffer.take(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut buffer = UtteranceBuffer::new(16000, 1);
        buffer.append(&[1, 2, 3]);
        assert_eq!(buffer.take(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_wav_encoding() {
        let samples = vec![0i16; 500];
        let wav = encode_wav(&samples, 16000, 1);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        // 44-byte header plus two bytes per sample.
        assert_eq!(wav.len(), 44 + 1000);

        let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(rate, 16000);
    }
}
