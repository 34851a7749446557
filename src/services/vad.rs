//! Voice activity gating.
//!
//! A [`SpeechDetector`] scores fixed-size PCM chunks with a speech
//! probability; the [`SpeechGate`] turns those scores into start/stop
//! events with debouncing, so a cough or a short pause does not flip the
//! session between listening and responding.

use crate::config::VadSettings;
use crate::error::{BlikkError, Result};
use tracing::{debug, warn};
use voice_activity_detector::VoiceActivityDetector;

/// Speech boundary events emitted by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    Started,
    Stopped,
}

/// Scores a chunk of PCM with a speech probability in `0.0..=1.0`.
pub trait SpeechDetector: Send {
    /// Number of samples the detector consumes per prediction.
    fn chunk_size(&self) -> usize;

    fn predict(&mut self, chunk: &[i16]) -> Result<f32>;
}

/// Detector backed by the silero model.
pub struct SileroDetector {
    vad: VoiceActivityDetector,
    chunk_size: usize,
}

impl SileroDetector {
    /// Load the model for the given sample rate. The model dictates the
    /// chunk size: 256 samples at 8 kHz, 512 at 16 kHz.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let chunk_size: usize = if sample_rate == 8000 { 256 } else { 512 };
        let vad = VoiceActivityDetector::builder()
            .sample_rate(i64::from(sample_rate))
            .chunk_size(chunk_size)
            .build()
            .map_err(|e| BlikkError::Vad(e.to_string()))?;
        Ok(Self { vad, chunk_size })
    }
}

impl SpeechDetector for SileroDetector {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn predict(&mut self, chunk: &[i16]) -> Result<f32> {
        Ok(self.vad.predict(chunk.iter().copied()))
    }
}

/// Debounced speech state machine over a [`SpeechDetector`].
pub struct SpeechGate {
    detector: Box<dyn SpeechDetector>,
    sample_rate: u32,
    threshold: f32,
    min_speech_ms: u32,
    min_silence_ms: u32,
    pending: Vec<i16>,
    speaking: bool,
    speech_samples: u32,
    silence_samples: u32,
}

impl SpeechGate {
    pub fn new(detector: Box<dyn SpeechDetector>, sample_rate: u32, settings: &VadSettings) -> Self {
        Self {
            detector,
            sample_rate,
            threshold: settings.threshold,
            min_speech_ms: settings.min_speech_ms,
            min_silence_ms: settings.min_silence_ms,
            pending: Vec::new(),
            speaking: false,
            speech_samples: 0,
            silence_samples: 0,
        }
    }

    /// Whether the gate currently considers the user to be speaking.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed PCM samples and collect any boundary events they trigger.
    ///
    /// Samples are buffered internally until a full detector chunk is
    /// available, so callers can feed frames of any size.
    pub fn process(&mut self, samples: &[i16]) -> Vec<SpeechEvent> {
        self.pending.extend_from_slice(samples);

        let chunk_size = self.detector.chunk_size();
        let mut events = Vec::new();

        while self.pending.len() >= chunk_size {
            let chunk: Vec<i16> = self.pending.drain(..chunk_size).collect();
            let probability = match self.detector.predict(&chunk) {
                Ok(p) => p,
                Err(e) => {
                    warn!("speech detector failed on a chunk: {}", e);
                    continue;
                }
            };

            if probability >= self.threshold {
                self.silence_samples = 0;
                self.speech_samples += chunk_size as u32;
                if !self.speaking && self.samples_to_ms(self.speech_samples) >= self.min_speech_ms {
                    self.speaking = true;
                    debug!("speech started (p={:.2})", probability);
                    events.push(SpeechEvent::Started);
                }
            } else {
                self.silence_samples += chunk_size as u32;
                if !self.speaking {
                    self.speech_samples = 0;
                } else if self.samples_to_ms(self.silence_samples) >= self.min_silence_ms {
                    self.speaking = false;
                    self.speech_samples = 0;
                    debug!("speech stopped");
                    events.push(SpeechEvent::Stopped);
                }
            }
        }

        events
    }

    fn samples_to_ms(&self, samples: u32) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        ((samples as u64 * 1000) / self.sample_rate as u64) as u32
    }
}
