//! Speech synthesis.

use crate::config::TtsSettings;
use crate::error::{BlikkError, Result};
use crate::openai::create_client;
use crate::rtc::AudioFrame;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Sample rate of raw PCM returned by the speech endpoint.
const PCM_SAMPLE_RATE: u32 = 24000;

/// Trait for synthesis backends: text in, PCM16 mono out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioFrame>;
}

/// Synthesis over OpenAI's speech API.
pub struct OpenaiTts {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenaiTts {
    pub fn new(settings: &TtsSettings) -> Self {
        Self {
            client: create_client(),
            model: parse_model(&settings.model),
            voice: parse_voice(&settings.voice),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenaiTts {
    async fn synthesize(&self, text: &str) -> Result<AudioFrame> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Pcm)
            .build()
            .map_err(|e| BlikkError::Synthesis(e.to_string()))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| BlikkError::OpenAI(format!("speech synthesis failed: {}", e)))?;

        let samples = pcm_bytes_to_samples(&response.bytes);
        debug!(
            "synthesized {} samples ({:.2}s) for {} chars of text",
            samples.len(),
            samples.len() as f32 / PCM_SAMPLE_RATE as f32,
            text.len()
        );
        Ok(AudioFrame::mono16(samples, PCM_SAMPLE_RATE))
    }
}

/// Convert little-endian PCM16 bytes to samples. A trailing odd byte is
/// dropped.
fn pcm_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn parse_model(name: &str) -> SpeechModel {
    match name {
        "tts-1-hd" => SpeechModel::Tts1Hd,
        "tts-1" => SpeechModel::Tts1,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_voice(name: &str) -> Voice {
    match name {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        other => {
            warn!("unknown voice '{}', falling back to alloy", other);
            Voice::Alloy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_conversion() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80];
        assert_eq!(pcm_bytes_to_samples(&bytes), vec![0, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_pcm_conversion_drops_trailing_byte() {
        let bytes = [0x01, 0x00, 0xab];
        assert_eq!(pcm_bytes_to_samples(&bytes), vec![1]);
    }

    #[test]
    fn test_voice_fallback() {
        assert!(matches!(parse_voice("alloy"), Voice::Alloy));
        assert!(matches!(parse_voice("does-not-exist"), Voice::Alloy));
        assert!(matches!(parse_voice("nova"), Voice::Nova));
    }
}
