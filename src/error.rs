//! Error types for Blikk.

use thiserror::Error;

/// Library-level error type for Blikk operations.
#[derive(Error, Debug)]
pub enum BlikkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Room error: {0}")]
    Room(String),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Access token error: {0}")]
    AccessToken(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Voice activity detection error: {0}")]
    Vad(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for Blikk operations.
pub type Result<T> = std::result::Result<T, BlikkError>;
