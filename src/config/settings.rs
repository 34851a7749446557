//! Configuration settings for Blikk.

use crate::config::Prompts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub room: RoomSettings,
    pub worker: WorkerSettings,
    pub vad: VadSettings,
    pub stt: SttSettings,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub prompts: Prompts,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Hosted platform connection settings.
///
/// Credentials normally come from the environment (`LIVEKIT_URL`,
/// `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`) rather than the config file.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    /// Server URL, e.g. `wss://example.livekit.cloud`.
    pub url: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for join tokens.
    pub token_ttl_seconds: u64,
    /// How often to refresh the participant roster, in milliseconds.
    pub roster_poll_ms: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: 3600,
            roster_poll_ms: 1000,
        }
    }
}

impl std::fmt::Debug for RoomSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSettings")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("roster_poll_ms", &self.roster_poll_ms)
            .finish()
    }
}

impl RoomSettings {
    /// The HTTP base URL for room service calls, derived from the
    /// WebSocket URL.
    pub fn service_url(&self) -> String {
        if let Some(rest) = self.url.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = self.url.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            self.url.clone()
        }
    }

    /// Check that the connection settings are usable.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.url.is_empty() {
            return Err(crate::error::BlikkError::Config(
                "room.url is not set (or LIVEKIT_URL in the environment)".to_string(),
            ));
        }
        url::Url::parse(&self.url).map_err(|e| {
            crate::error::BlikkError::Config(format!("room.url is not a valid URL: {}", e))
        })?;
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(crate::error::BlikkError::Config(
                "room API credentials are not set (LIVEKIT_API_KEY / LIVEKIT_API_SECRET)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Identity the agent joins rooms under.
    pub agent_identity: String,
    /// How often to poll for new rooms to join, in milliseconds.
    pub dispatch_poll_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            agent_identity: "blikk-agent".to_string(),
            dispatch_poll_ms: 2000,
        }
    }
}

/// Voice activity gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadSettings {
    /// Speech probability threshold (0.0 to 1.0).
    pub threshold: f32,
    /// Minimum speech duration before the gate opens, in milliseconds.
    pub min_speech_ms: u32,
    /// Minimum silence duration before the gate closes, in milliseconds.
    pub min_silence_ms: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_speech_ms: 250,
            min_silence_ms: 300,
        }
    }
}

/// Speech-to-text settings. The API key comes from `DEEPGRAM_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttSettings {
    /// Transcription model.
    pub model: String,
    /// Transcription language.
    pub language: String,
    /// Sample rate of the room's audio, in Hz.
    pub sample_rate: u32,
    /// Audio retained before speech starts, in seconds.
    pub pre_speech_secs: f32,
    /// Hard cap on one utterance, in seconds.
    pub max_utterance_secs: f32,
    /// Utterances shorter than this are not transcribed, in seconds.
    pub min_utterance_secs: f32,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en".to_string(),
            sample_rate: 16000,
            pre_speech_secs: 1.0,
            max_utterance_secs: 30.0,
            min_utterance_secs: 0.1,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model with tool calling support.
    pub model: String,
    /// Maximum tool-calling rounds per user turn.
    pub max_tool_iterations: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tool_iterations: 15,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub model: String,
    pub voice: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file, then apply
    /// environment overrides for credentials.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply credential overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LIVEKIT_URL") {
            if !url.is_empty() {
                self.room.url = url;
            }
        }
        if let Ok(key) = std::env::var("LIVEKIT_API_KEY") {
            if !key.is_empty() {
                self.room.api_key = key;
            }
        }
        if let Ok(secret) = std::env::var("LIVEKIT_API_SECRET") {
            if !secret.is_empty() {
                self.room.api_secret = secret;
            }
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blikk")
            .join("config.toml")
    }
}
