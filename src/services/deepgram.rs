//! Deepgram speech-to-text client.
//!
//! Uses the prerecorded transcription endpoint: the session ships one
//! complete WAV-encoded utterance per request, which fits the gate-then-
//! transcribe flow and avoids holding a streaming connection open.

use super::stt::{SpeechToText, Transcription};
use crate::config::SttSettings;
use crate::error::{BlikkError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.deepgram.com/v1/listen";

/// Timeout for one transcription request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the Deepgram API key.
pub const API_KEY_ENV: &str = "DEEPGRAM_API_KEY";

/// Deepgram transcription service.
pub struct DeepgramStt {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
    endpoint: String,
}

impl DeepgramStt {
    /// Build a client from settings, reading the API key from the
    /// environment.
    pub fn new(settings: &SttSettings) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| BlikkError::Config(format!("{} is not set", API_KEY_ENV)))?;
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(settings: &SttSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: settings.model.clone(),
            language: settings.language.clone(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Override the API endpoint (useful for self-hosted deployments).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SpeechToText for DeepgramStt {
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcription> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("model", self.model.as_str()),
                ("language", self.language.as_str()),
                ("smart_format", "true"),
            ])
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(wav.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlikkError::Transcription(format!(
                "Deepgram returned {}: {}",
                status, body
            )));
        }

        let parsed: DeepgramResponse = response.json().await?;
        let transcription = parse_transcription(parsed)?;
        debug!("transcribed utterance: {:?}", transcription.text);
        Ok(transcription)
    }
}

fn parse_transcription(response: DeepgramResponse) -> Result<Transcription> {
    let alternative = response
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|c| c.alternatives.into_iter().next())
        .ok_or_else(|| {
            BlikkError::Transcription("Deepgram response contained no alternatives".to_string())
        })?;

    Ok(Transcription {
        text: alternative.transcript,
        language: response.results.language,
        confidence: Some(alternative.confidence),
    })
}

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(Debug, Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "what do you see on my screen",
                        "confidence": 0.98
                    }]
                }],
                "language": "en"
            }
        }"#;

        let response: DeepgramResponse = serde_json::from_str(json).unwrap();
        let transcription = parse_transcription(response).unwrap();
        assert_eq!(transcription.text, "what do you see on my screen");
        assert_eq!(transcription.language.as_deref(), Some("en"));
        assert!(transcription.confidence.unwrap() > 0.9);
    }

    #[test]
    fn test_parse_empty_response_is_an_error() {
        let json = r#"{"results": {"channels": []}}"#;
        let response: DeepgramResponse = serde_json::from_str(json).unwrap();
        assert!(parse_transcription(response).is_err());
    }
}
