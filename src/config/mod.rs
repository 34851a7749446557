//! Configuration module for Blikk.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    GeneralSettings, LlmSettings, RoomSettings, Settings, SttSettings, TtsSettings, VadSettings,
    WorkerSettings,
};
