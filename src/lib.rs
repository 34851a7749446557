//! Blikk - Voice Assistant with Vision
//!
//! A worker that joins real-time rooms and runs a voice assistant able to
//! describe what it sees in the shared video feed.
//!
//! The name "Blikk" comes from the Norwegian word for "glance."
//!
//! # Overview
//!
//! Blikk allows you to:
//! - Run an agent worker that picks up active rooms and joins them
//! - Hold a spoken conversation (VAD, speech-to-text, LLM, text-to-speech)
//! - Watch the room's video track and answer "what do you see?" questions
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `rtc` - Room contract: connections, participants, tracks, frames
//! - `services` - Speech backends (VAD gate, STT, TTS)
//! - `agent` - Assistant definition, tool calling, the voice session
//! - `video` - Video track acquisition and frame caching
//! - `worker` - Job dispatch and per-room lifecycle
//! - `orchestrator` - Wires settings and services into a job handler
//!
//! # Example
//!
//! ```rust,no_run
//! use blikk::config::Settings;
//! use blikk::orchestrator::Orchestrator;
//! use blikk::worker::{Worker, WorkerOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let handler = Arc::new(Orchestrator::new(settings.clone())?);
//!     let worker = Worker::new(WorkerOptions::new(handler), &settings)?;
//!     worker.run().await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rtc;
pub mod services;
pub mod video;
pub mod worker;

pub use error::{BlikkError, Result};
